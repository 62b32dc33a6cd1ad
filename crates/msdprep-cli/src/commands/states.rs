use crate::cli::StatesArgs;
use crate::config::builder;
use crate::error::Result;
use msdprep::core::io::separation;
use msdprep::core::species::{BackboneStrategy, SpeciesCatalog};
use msdprep::engine::config::state_version_dir;
use msdprep::engine::error::EngineError;
use msdprep::engine::state_version::isolate::IsolateBackboneStateVersion;
use msdprep::engine::state_version::merge::MergeBackboneStateVersion;
use msdprep::engine::state_version::{StateListUpdate, StateVersion};
use tracing::info;

pub fn run(args: StatesArgs) -> Result<()> {
    let (base_dir, species_path) = builder::resolve_project(&args.project)?;
    let catalog = SpeciesCatalog::load(&species_path).map_err(EngineError::from)?;
    let dir = std::path::absolute(state_version_dir(&base_dir, &args.state_version))?;
    info!(
        "Regenerating state lists in {:?} with the {} strategy.",
        dir,
        catalog.strategy()
    );

    let updates = regenerate(&catalog, dir)?;
    for update in &updates {
        println!("{:<14} {}", format!("{:?}", update.outcome), update.path.display());
    }
    println!("✓ {} state-list file(s) checked.", updates.len());
    Ok(())
}

fn regenerate(
    catalog: &SpeciesCatalog,
    dir: std::path::PathBuf,
) -> std::result::Result<Vec<StateListUpdate>, EngineError> {
    let updates = match catalog.strategy() {
        BackboneStrategy::IsolateBackbone => {
            let separator = separation::separator_for(catalog.separation());
            IsolateBackboneStateVersion::new(dir, catalog, &*separator).create_state_file_lists()?
        }
        BackboneStrategy::MergeBackbone => {
            MergeBackboneStateVersion::new(dir, catalog).create_state_file_lists()?
        }
    };
    Ok(updates)
}

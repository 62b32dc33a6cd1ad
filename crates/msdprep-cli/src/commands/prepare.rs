use crate::cli::PrepareArgs;
use crate::config::builder;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use msdprep::{
    core::cluster::ClusterId,
    core::io::state_list::WriteOutcome,
    core::species::SpeciesCatalog,
    engine::{error::EngineError, progress::ProgressReporter},
    workflows,
};
use tracing::info;

pub fn run(args: PrepareArgs, cluster: ClusterId) -> Result<()> {
    info!("Merging configuration from file, environment and CLI arguments...");
    let config = builder::build_config(
        &args,
        |key| std::env::var(key).ok(),
        std::env::args().collect(),
    )?;

    info!("Loading species catalog from {:?}", &config.species_path);
    let catalog = SpeciesCatalog::load(&config.species_path).map_err(EngineError::from)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Preparing job '{}' for cluster '{}'...",
        config.job_options.job_name, cluster
    );
    let prepared = workflows::prepare::run(&config.job_options, &catalog, cluster, &reporter)?;

    let written = prepared
        .state_list_updates
        .iter()
        .filter(|u| u.outcome == WriteOutcome::Written)
        .count();
    info!(
        "{} of {} state-list files rewritten.",
        written,
        prepared.state_list_updates.len()
    );

    println!(
        "✓ Job directory with {} sub-job(s) written to: {}",
        prepared.sub_jobs.len(),
        prepared.job_dir.display()
    );
    if prepared.launched {
        println!("  Submitted all sub-jobs and queued the docking chain.");
    } else {
        println!(
            "  Submit with: cd {} && bash {} && bash {}",
            prepared.job_dir.display(),
            workflows::prepare::SUBMIT_ALL_SCRIPT,
            workflows::prepare::PREPARE_FOR_DOCKING_SCRIPT
        );
    }

    Ok(())
}

use super::{InterfaceJob, JobInputs, Symlink};
use crate::core::io::separation::StructureSeparator;
use crate::core::species::{BackboneStrategy, DesignSpecies, IsolateBackboneSpecies, SpeciesCatalog};
use crate::engine::config::JobOptions;
use crate::engine::error::EngineError;
use crate::engine::fitness::{self, SpeciesStates};
use crate::engine::state_version::isolate::IsolateBackboneStateVersion;
use crate::engine::state_version::{StateListUpdate, StateVersion};
use crate::engine::sweep::SubJob;
use std::path::Path;
use tracing::debug;

/// Job whose fitness function compares energies only within a backbone.
///
/// Construction regenerates the state-list files, so the lists linked into each
/// sub-job always reflect the current state version.
pub struct IsolateInterfaceJob<'a> {
    inputs: JobInputs,
    species: &'a SpeciesCatalog,
    state_version: IsolateBackboneStateVersion<'a>,
    state_list_updates: Vec<StateListUpdate>,
}

impl<'a> IsolateInterfaceJob<'a> {
    pub fn new(
        options: &JobOptions,
        species: &'a SpeciesCatalog,
        separator: &'a dyn StructureSeparator,
    ) -> Result<Self, EngineError> {
        if species.strategy() != BackboneStrategy::IsolateBackbone {
            return Err(EngineError::StrategyMismatch {
                catalog: species.strategy(),
                requested: BackboneStrategy::IsolateBackbone,
            });
        }
        let inputs = JobInputs::load(options, species)?;
        let mut state_version =
            IsolateBackboneStateVersion::new(options.state_version_dir(), species, separator);
        let state_list_updates = state_version.create_state_file_lists()?;
        debug!("{} state-list files touched.", state_list_updates.len());

        Ok(Self {
            inputs,
            species,
            state_version,
            state_list_updates,
        })
    }

    pub fn state_version(&self) -> &IsolateBackboneStateVersion<'a> {
        &self.state_version
    }

    pub fn state_list_updates(&self) -> &[StateListUpdate] {
        &self.state_list_updates
    }

    fn species_states(&self) -> Vec<SpeciesStates> {
        self.species
            .species()
            .iter()
            .map(|spec| SpeciesStates {
                species: spec.clone(),
                states: self
                    .state_version
                    .backbones_with_state_file(spec)
                    .into_iter()
                    .map(|bb| (bb.to_string(), self.state_version.state_file_name(spec, bb)))
                    .collect(),
            })
            .collect()
    }

    fn preamble(&self) -> Vec<String> {
        let backbones: Vec<&str> = self
            .state_version
            .positive_backbones()
            .iter()
            .chain(self.state_version.negative_backbones())
            .map(String::as_str)
            .collect();
        let complexes: Vec<(&str, &str)> = self
            .species
            .complexes()
            .into_iter()
            .filter_map(|c| self.species.separated_for(c).map(|s| (c, s)))
            .collect();
        fitness::backbone_preamble(&self.species_states(), &backbones, &complexes)
    }
}

impl InterfaceJob for IsolateInterfaceJob<'_> {
    fn inputs(&self) -> &JobInputs {
        &self.inputs
    }

    fn files_to_symlink(&self, _sub_job: &SubJob) -> Vec<Symlink> {
        let dir = self.state_version.dir();
        let mut links: Vec<Symlink> = self
            .state_version
            .structures()
            .iter()
            .map(|pdb| Symlink::same_name(dir.join(pdb)))
            .collect();
        for spec in self.species.species() {
            for bb in self.state_version.backbones_with_state_file(spec) {
                let file = self.state_version.state_file_name(spec, bb);
                links.push(Symlink::same_name(dir.join(file)));
            }
        }
        links.extend(
            self.inputs
                .definition_links(self.species.species().iter().map(String::as_str)),
        );
        links
    }

    fn fitness_lines(&self, sub_job: &SubJob) -> Vec<String> {
        self.inputs.render_fitness(sub_job, self.preamble())
    }

    fn states_to_save(&self) -> Vec<&str> {
        self.species
            .species()
            .iter()
            .map(String::as_str)
            .filter(|s| !self.species.is_separated(s))
            .collect()
    }

    fn complexes_to_postprocess(&self) -> Vec<&str> {
        self.states_to_save()
    }

    fn total_state_count(&self) -> usize {
        self.state_version.total_state_count()
    }

    fn state_version_dir(&self) -> &Path {
        self.state_version.dir()
    }
}

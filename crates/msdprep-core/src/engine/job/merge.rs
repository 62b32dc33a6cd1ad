use super::{InterfaceJob, JobInputs, Symlink};
use crate::core::species::{BackboneStrategy, DesignSpecies, MergeBackboneSpecies, SpeciesCatalog};
use crate::engine::config::JobOptions;
use crate::engine::error::EngineError;
use crate::engine::state_version::merge::MergeBackboneStateVersion;
use crate::engine::state_version::{StateListUpdate, StateVersion};
use crate::engine::sweep::SubJob;
use std::path::Path;

/// Job over a flat species-to-structure mapping. The user's fitness template is
/// taken as complete; only the sweep weights are substituted into it.
pub struct MergeInterfaceJob<'a> {
    inputs: JobInputs,
    species: &'a SpeciesCatalog,
    state_version: MergeBackboneStateVersion<'a>,
    state_list_updates: Vec<StateListUpdate>,
}

impl<'a> MergeInterfaceJob<'a> {
    pub fn new(options: &JobOptions, species: &'a SpeciesCatalog) -> Result<Self, EngineError> {
        if species.strategy() != BackboneStrategy::MergeBackbone {
            return Err(EngineError::StrategyMismatch {
                catalog: species.strategy(),
                requested: BackboneStrategy::MergeBackbone,
            });
        }
        let inputs = JobInputs::load(options, species)?;
        let mut state_version = MergeBackboneStateVersion::new(options.state_version_dir(), species);
        let state_list_updates = state_version.create_state_file_lists()?;

        Ok(Self {
            inputs,
            species,
            state_version,
            state_list_updates,
        })
    }

    pub fn state_version(&self) -> &MergeBackboneStateVersion<'a> {
        &self.state_version
    }

    pub fn state_list_updates(&self) -> &[StateListUpdate] {
        &self.state_list_updates
    }
}

impl InterfaceJob for MergeInterfaceJob<'_> {
    fn inputs(&self) -> &JobInputs {
        &self.inputs
    }

    fn files_to_symlink(&self, _sub_job: &SubJob) -> Vec<Symlink> {
        let dir = self.state_version.dir();
        let species = self.species.species();
        let mut links: Vec<Symlink> = self
            .state_version
            .structures()
            .iter()
            .map(|pdb| Symlink::same_name(dir.join(pdb)))
            .collect();
        links.extend(
            species
                .iter()
                .map(|spec| Symlink::same_name(dir.join(self.state_version.state_file_name(spec)))),
        );
        links.extend(self.inputs.definition_links(species.iter().map(String::as_str)));
        links
    }

    fn fitness_lines(&self, sub_job: &SubJob) -> Vec<String> {
        self.inputs.render_fitness(sub_job, Vec::new())
    }

    fn states_to_save(&self) -> Vec<&str> {
        self.species.species().iter().map(String::as_str).collect()
    }

    fn complexes_to_postprocess(&self) -> Vec<&str> {
        self.species
            .species()
            .iter()
            .map(String::as_str)
            .filter(|s| self.species.is_complex(s))
            .collect()
    }

    fn total_state_count(&self) -> usize {
        self.state_version.total_state_count()
    }

    fn state_version_dir(&self) -> &Path {
        self.state_version.dir()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::species::{SpeciesEntry, SpeciesRole, SpeciesSign};
    use crate::engine::job::tests::job_fixture;
    use crate::engine::state_version::isolate::tests::touch;
    use crate::engine::state_version::merge::STATES_FILE;
    use std::fs;
    use tempfile::tempdir;

    pub(crate) fn merge_catalog() -> SpeciesCatalog {
        let entry = |name: &str, role| SpeciesEntry {
            name: name.to_string(),
            role,
            sign: SpeciesSign::Positive,
            separated: None,
            mut_status: None,
        };
        SpeciesCatalog::new(
            BackboneStrategy::MergeBackbone,
            vec![
                entry("MH3_WTH4", SpeciesRole::Complex),
                entry("MH3", SpeciesRole::Monomer),
            ],
            None,
        )
        .unwrap()
    }

    fn merge_job_inputs(base: &Path) -> JobOptions {
        let options = job_fixture(base, &["MH3_WTH4", "MH3"], "flat");
        let sv = options.state_version_dir();
        touch(&sv, &["ab1.pdb", "ab2.pdb", "a1.pdb"]);
        fs::write(
            sv.join(STATES_FILE),
            "pdbs:\n  - {species: MH3_WTH4, pdb: ab1.pdb}\n  - {species: MH3_WTH4, pdb: ab2.pdb}\n  - {species: MH3, pdb: a1.pdb}\n",
        )
        .unwrap();
        options
    }

    #[test]
    fn links_include_per_species_state_lists() {
        let base = tempdir().unwrap();
        let options = merge_job_inputs(base.path());
        let catalog = merge_catalog();
        let job = MergeInterfaceJob::new(&options, &catalog).unwrap();

        let links = job.files_to_symlink(&job.sub_jobs()[0]);
        let names: Vec<&str> = links.iter().map(|l| l.link_name.as_str()).collect();
        assert_eq!(
            &names[..5],
            ["ab1.pdb", "ab2.pdb", "a1.pdb", "MH3_WTH4.states", "MH3.states"]
        );
        assert!(names.contains(&"MH3.2resfile"));
        assert!(links.iter().all(|l| l.source.is_file()));
        assert_eq!(job.total_state_count(), 3);
    }

    #[test]
    fn all_species_are_saved_but_only_complexes_docked() {
        let base = tempdir().unwrap();
        let options = merge_job_inputs(base.path());
        let catalog = merge_catalog();
        let job = MergeInterfaceJob::new(&options, &catalog).unwrap();

        assert_eq!(job.states_to_save(), vec!["MH3_WTH4", "MH3"]);
        assert_eq!(job.complexes_to_postprocess(), vec!["MH3_WTH4"]);
    }

    #[test]
    fn fitness_file_has_no_preamble() {
        let base = tempdir().unwrap();
        let options = merge_job_inputs(base.path());
        let catalog = merge_catalog();
        let job = MergeInterfaceJob::new(&options, &catalog).unwrap();

        let sub_job = &job.sub_jobs()[3];
        let lines = job.fitness_lines(sub_job);
        assert_eq!(lines[0], "# binding energy scan\n");
        assert_eq!(
            lines.last().unwrap(),
            "FITNESS best_MH3_MH4 + 3.000000 * best_dGbind + 2.000000 * entfunc\n"
        );
    }

    #[test]
    fn missing_flags_file_is_reported() {
        let base = tempdir().unwrap();
        let mut options = merge_job_inputs(base.path());
        options.flags_files.push(base.path().join("absent.flags"));
        let catalog = merge_catalog();
        assert!(matches!(
            MergeInterfaceJob::new(&options, &catalog),
            Err(EngineError::MissingFlagsFile(_))
        ));
    }
}

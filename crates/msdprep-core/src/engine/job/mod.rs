//! Interface design jobs: everything the job manager needs to know about one
//! sweep of multistate design runs.
//!
//! An [`InterfaceJob`] couples a species catalog, a design definition and a
//! state version, and answers per-sub-job questions: which files to link, what
//! the fitness file says, how large the genetic-algorithm population is. The
//! two implementations, [`isolate::IsolateInterfaceJob`] and
//! [`merge::MergeInterfaceJob`], differ in how states are grouped and in how
//! much fitness boilerplate they generate.

pub mod isolate;
pub mod merge;

use super::config::{JobOptions, PostProcessingOptions, SamplingConfig, SeedingConfig};
use super::definition::{DesignDefinition, ENTITY_RESFILE};
use super::error::EngineError;
use super::fitness;
use super::sweep::{SubJob, WeightScan};
use crate::core::species::DesignSpecies;
use std::path::{Path, PathBuf};
use tracing::info;

/// One symbolic link to create inside a sub-job directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symlink {
    pub source: PathBuf,
    pub link_name: String,
}

impl Symlink {
    pub fn new(source: PathBuf, link_name: impl Into<String>) -> Self {
        Self {
            source,
            link_name: link_name.into(),
        }
    }

    /// A link carrying the source's own file name.
    pub fn same_name(source: PathBuf) -> Self {
        let link_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { source, link_name }
    }
}

/// Inputs shared by both job strategies, loaded once at construction.
#[derive(Debug, Clone)]
pub struct JobInputs {
    job_name: String,
    sub_jobs: Vec<SubJob>,
    daf_template: String,
    preserve_daf: bool,
    flags_files: Vec<PathBuf>,
    sampling: SamplingConfig,
    seeding: SeedingConfig,
    ntop_results: u32,
    postprocessing: PostProcessingOptions,
    definition: DesignDefinition,
}

impl JobInputs {
    pub fn load(options: &JobOptions, species: &dyn DesignSpecies) -> Result<Self, EngineError> {
        let definition = DesignDefinition::load(&options.design_definition_dir(), species)?;

        let sub_jobs = WeightScan::load(&options.weights)?.expand(&options.job_name);
        if sub_jobs.is_empty() {
            return Err(EngineError::EmptySweep(options.job_name.clone()));
        }

        if let Some(missing) = options.flags_files.iter().find(|f| !f.is_file()) {
            return Err(EngineError::MissingFlagsFile(missing.clone()));
        }

        let daf_template = std::fs::read_to_string(&options.daf)
            .map_err(|e| EngineError::io(&options.daf, e))?;

        info!(
            "Job '{}': {} sub-jobs over {} species.",
            options.job_name,
            sub_jobs.len(),
            species.species().len()
        );
        Ok(Self {
            job_name: options.job_name.clone(),
            sub_jobs,
            daf_template,
            preserve_daf: options.preserve_daf,
            flags_files: options.flags_files.clone(),
            sampling: options.sampling.clone(),
            seeding: options.seeding.clone(),
            ntop_results: options.ntop_msd_results_to_dock,
            postprocessing: options.postprocessing.clone(),
            definition,
        })
    }

    pub fn definition(&self) -> &DesignDefinition {
        &self.definition
    }

    /// The user template with this sub-job's weights applied, after `preamble`.
    ///
    /// A preserved template is emitted verbatim.
    fn render_fitness(&self, sub_job: &SubJob, preamble: Vec<String>) -> Vec<String> {
        if self.preserve_daf {
            return self
                .daf_template
                .split_inclusive('\n')
                .map(str::to_string)
                .collect();
        }
        let mut lines = preamble;
        lines.extend(fitness::apply_weights(
            &self.daf_template,
            sub_job,
            self.definition.entfunc_name(),
        ));
        lines
    }

    /// Correspondence and secondary resfile links for `species`, followed by
    /// the entity resfile, the entity function and the flags files.
    fn definition_links<'s>(&self, species: impl IntoIterator<Item = &'s str>) -> Vec<Symlink> {
        let dir = self.definition.dir();
        let mut links = Vec::new();
        for spec in species {
            if let Some(corr) = self.definition.corr(spec) {
                links.push(Symlink::new(dir.join(corr), format!("{spec}.corr")));
            }
            if let Some(res) = self.definition.secondary_resfile(spec) {
                links.push(Symlink::new(dir.join(res), format!("{spec}.2resfile")));
            }
        }
        links.push(Symlink::same_name(dir.join(ENTITY_RESFILE)));
        if let Some(entfunc) = self.definition.entfunc() {
            links.push(Symlink::same_name(dir.join(entfunc)));
        }
        links.extend(self.flags_files.iter().cloned().map(Symlink::same_name));
        links
    }
}

/// What the job manager asks of a design job.
///
/// Implementors supply the strategy-specific parts; everything else is derived
/// from the shared [`JobInputs`].
pub trait InterfaceJob {
    fn inputs(&self) -> &JobInputs;

    /// Files linked into a sub-job directory. Every source must exist.
    fn files_to_symlink(&self, sub_job: &SubJob) -> Vec<Symlink>;

    /// Contents of `fitness.daf` for a sub-job.
    fn fitness_lines(&self, sub_job: &SubJob) -> Vec<String>;

    /// Species whose designed structures are copied out by the gather script.
    fn states_to_save(&self) -> Vec<&str>;

    /// Complexes grouped per result rank for docking.
    fn complexes_to_postprocess(&self) -> Vec<&str>;

    /// Number of states the design program evaluates per generation.
    fn total_state_count(&self) -> usize;

    /// Directory of the state version the job reads from.
    fn state_version_dir(&self) -> &Path;

    fn job_name(&self) -> &str {
        &self.inputs().job_name
    }

    fn sub_jobs(&self) -> &[SubJob] {
        &self.inputs().sub_jobs
    }

    /// A single round evaluates exactly the seeds; otherwise the population
    /// grows to hold every seed.
    fn population_size(&self) -> u32 {
        let inputs = self.inputs();
        let n_seeds = inputs.seeding.seeds().len() as u32;
        if inputs.sampling.single_round {
            return n_seeds.max(1);
        }
        inputs.sampling.pop_size.max(n_seeds)
    }

    fn generation_count(&self) -> u32 {
        let inputs = self.inputs();
        if inputs.sampling.single_round {
            return 1;
        }
        let generations = inputs.definition.n_entities() as f64 * inputs.sampling.ngen_scale;
        (generations.ceil() as u32).max(1)
    }

    fn is_seeded(&self, _sub_job: &SubJob) -> bool {
        self.inputs().seeding.is_seeded()
    }

    fn seeds(&self) -> &[String] {
        self.inputs().seeding.seeds()
    }

    fn fill_gen1_from_seeds(&self) -> bool {
        self.inputs().seeding.fill_gen1_from_seeds
    }

    fn flags_files(&self, _sub_job: &SubJob) -> &[PathBuf] {
        &self.inputs().flags_files
    }

    fn results_to_postprocess_count(&self) -> u32 {
        self.inputs().ntop_results
    }

    fn postprocessing(&self) -> &PostProcessingOptions {
        &self.inputs().postprocessing
    }
}

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Parameters '{0}' and '{1}' cannot be used together")]
    Conflict(&'static str, &'static str),
}

pub const DEFAULT_MSD_EXECUTABLE: &str = "mpi_msd.mpiserialization.linuxgccrelease";
pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_POP_SIZE: u32 = 100;
pub const DEFAULT_NGEN_SCALE: f64 = 15.0;
pub const DEFAULT_DOCKING_N_CPU: u32 = 45;

/// Locations of the external programs the generated scripts invoke.
#[derive(Debug, Clone, PartialEq)]
pub struct Toolchain {
    pub rosetta_dir: PathBuf,
    pub pyscripts_dir: PathBuf,
    pub python: String,
    pub msd_executable: String,
}

impl Toolchain {
    pub fn new(rosetta_dir: PathBuf, pyscripts_dir: PathBuf) -> Self {
        Self {
            rosetta_dir,
            pyscripts_dir,
            python: DEFAULT_PYTHON.to_string(),
            msd_executable: DEFAULT_MSD_EXECUTABLE.to_string(),
        }
    }

    pub fn msd_executable_path(&self) -> PathBuf {
        self.rosetta_dir
            .join("source")
            .join("bin")
            .join(&self.msd_executable)
    }

    /// Database directory with the trailing slash the design program expects.
    pub fn database_dir(&self) -> String {
        format!("{}/", self.rosetta_dir.join("database").display())
    }

    pub fn pyscript(&self, name: &str) -> PathBuf {
        self.pyscripts_dir.join(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Explicit process count; derived from the state count when `None`.
    pub num_cpu: Option<u32>,
    pub num_states_per_cpu: u32,
    /// Queue name; the cluster default applies when `None`.
    pub queue: Option<String>,
    pub launch: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            num_cpu: None,
            num_states_per_cpu: 1,
            queue: None,
            launch: false,
        }
    }
}

impl ExecutionOptions {
    /// `ceil(total_states / states_per_cpu)` unless pinned, never below one.
    pub fn process_count(&self, total_states: usize) -> u32 {
        match self.num_cpu {
            Some(n) => n,
            None => {
                let per_cpu = self.num_states_per_cpu.max(1) as usize;
                (total_states.div_ceil(per_cpu)).max(1) as u32
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessingOptions {
    pub docking_flags_files: Vec<PathBuf>,
    pub relax: bool,
    pub docking_n_cpu: u32,
}

impl Default for PostProcessingOptions {
    fn default() -> Self {
        Self {
            docking_flags_files: Vec::new(),
            relax: false,
            docking_n_cpu: DEFAULT_DOCKING_N_CPU,
        }
    }
}

impl PostProcessingOptions {
    /// Arguments forwarded to the docking run and view commands.
    pub fn to_command_line(&self) -> String {
        let mut args: Vec<String> = Vec::new();
        if !self.docking_flags_files.is_empty() {
            args.push("--docking_flags_files".to_string());
            args.extend(
                self.docking_flags_files
                    .iter()
                    .map(|p| shell_words::quote(&p.to_string_lossy()).into_owned()),
            );
        }
        if self.relax {
            args.push("--relax".to_string());
        }
        args.push("--docking_n_cpu".to_string());
        args.push(self.docking_n_cpu.to_string());
        args.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub pop_size: u32,
    pub ngen_scale: f64,
    pub single_round: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeedingConfig {
    pub seed_sequences: Vec<String>,
    pub fill_gen1_from_seeds: bool,
}

impl SeedingConfig {
    pub fn seeds(&self) -> &[String] {
        &self.seed_sequences
    }

    pub fn is_seeded(&self) -> bool {
        !self.seeds().is_empty() || self.fill_gen1_from_seeds
    }
}

/// Weight-scan sources; `None` selects the built-in default list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeightScanConfig {
    pub dg_weights_file: Option<PathBuf>,
    pub entity_weights_file: Option<PathBuf>,
}

/// Fully validated options for preparing one design job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOptions {
    pub base_dir: PathBuf,
    pub design_definition: String,
    pub state_version: String,
    pub job_name: String,
    /// Directory the job tree is created in.
    pub output_dir: PathBuf,
    pub daf: PathBuf,
    pub preserve_daf: bool,
    pub weights: WeightScanConfig,
    pub flags_files: Vec<PathBuf>,
    pub sampling: SamplingConfig,
    pub seeding: SeedingConfig,
    pub ntop_msd_results_to_dock: u32,
    pub execution: ExecutionOptions,
    pub postprocessing: PostProcessingOptions,
    pub toolchain: Toolchain,
    /// Recorded verbatim in `creation_command.txt`.
    pub creation_command: Vec<String>,
}

impl JobOptions {
    pub fn design_definition_dir(&self) -> PathBuf {
        self.base_dir
            .join("input_files")
            .join("design_definitions")
            .join(&self.design_definition)
    }

    pub fn state_version_dir(&self) -> PathBuf {
        state_version_dir(&self.base_dir, &self.state_version)
    }

    pub fn job_dir(&self) -> PathBuf {
        self.output_dir.join(&self.job_name)
    }
}

#[derive(Default)]
pub struct JobOptionsBuilder {
    base_dir: Option<PathBuf>,
    design_definition: Option<String>,
    state_version: Option<String>,
    job_name: Option<String>,
    output_dir: Option<PathBuf>,
    daf: Option<PathBuf>,
    preserve_daf: bool,
    weights: WeightScanConfig,
    flags_files: Vec<PathBuf>,
    pop_size: Option<u32>,
    ngen_scale: Option<f64>,
    single_round: bool,
    seeding: SeedingConfig,
    pdb_seed_pairs: Vec<String>,
    ntop_msd_results_to_dock: Option<u32>,
    execution: ExecutionOptions,
    postprocessing: PostProcessingOptions,
    toolchain: Option<Toolchain>,
    creation_command: Vec<String>,
}

impl JobOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_dir(mut self, path: PathBuf) -> Self {
        self.base_dir = Some(path);
        self
    }
    pub fn design_definition(mut self, name: impl Into<String>) -> Self {
        self.design_definition = Some(name.into());
        self
    }
    pub fn state_version(mut self, name: impl Into<String>) -> Self {
        self.state_version = Some(name.into());
        self
    }
    pub fn job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }
    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.output_dir = Some(path);
        self
    }
    pub fn daf(mut self, path: PathBuf) -> Self {
        self.daf = Some(path);
        self
    }
    pub fn preserve_daf(mut self, preserve: bool) -> Self {
        self.preserve_daf = preserve;
        self
    }
    pub fn dg_weights_file(mut self, path: Option<PathBuf>) -> Self {
        self.weights.dg_weights_file = path;
        self
    }
    pub fn entity_weights_file(mut self, path: Option<PathBuf>) -> Self {
        self.weights.entity_weights_file = path;
        self
    }
    pub fn flags_files(mut self, files: Vec<PathBuf>) -> Self {
        self.flags_files = files;
        self
    }
    pub fn pop_size(mut self, size: u32) -> Self {
        self.pop_size = Some(size);
        self
    }
    pub fn ngen_scale(mut self, scale: f64) -> Self {
        self.ngen_scale = Some(scale);
        self
    }
    pub fn single_round(mut self, single: bool) -> Self {
        self.single_round = single;
        self
    }
    pub fn seed_sequences(mut self, seeds: Vec<String>) -> Self {
        self.seeding.seed_sequences = seeds;
        self
    }
    pub fn pdb_seed_pairs(mut self, pairs: Vec<String>) -> Self {
        self.pdb_seed_pairs = pairs;
        self
    }
    pub fn fill_gen1_from_seeds(mut self, fill: bool) -> Self {
        self.seeding.fill_gen1_from_seeds = fill;
        self
    }
    pub fn ntop_msd_results_to_dock(mut self, n: u32) -> Self {
        self.ntop_msd_results_to_dock = Some(n);
        self
    }
    pub fn execution(mut self, execution: ExecutionOptions) -> Self {
        self.execution = execution;
        self
    }
    pub fn postprocessing(mut self, postprocessing: PostProcessingOptions) -> Self {
        self.postprocessing = postprocessing;
        self
    }
    pub fn toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = Some(toolchain);
        self
    }
    pub fn creation_command(mut self, args: Vec<String>) -> Self {
        self.creation_command = args;
        self
    }

    pub fn build(self) -> Result<JobOptions, ConfigError> {
        let base_dir = absolute(
            "base_dir",
            &self
                .base_dir
                .ok_or(ConfigError::MissingParameter("base_dir"))?,
        )?;
        let job_name = self
            .job_name
            .ok_or(ConfigError::MissingParameter("job_name"))?;
        if job_name.is_empty() || job_name.contains('/') {
            return Err(ConfigError::InvalidParameter {
                name: "job_name",
                reason: format!("'{job_name}' is not a valid directory name"),
            });
        }

        if !self.seeding.seed_sequences.is_empty() && !self.pdb_seed_pairs.is_empty() {
            return Err(ConfigError::Conflict("seed_sequences", "pdb_seed_pairs"));
        }
        // Turning structures into sequences needs residue parsing this crate
        // does not do, so seeds must arrive as sequences.
        if !self.pdb_seed_pairs.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "pdb_seed_pairs",
                reason: format!(
                    "{} structure file(s) given; derive their sequences and pass them as seed_sequences",
                    self.pdb_seed_pairs.len()
                ),
            });
        }
        if self.single_round && self.seeding.fill_gen1_from_seeds {
            return Err(ConfigError::Conflict("single_round", "fill_gen1_from_seeds"));
        }

        let sampling = SamplingConfig {
            pop_size: positive("pop_size", self.pop_size.unwrap_or(DEFAULT_POP_SIZE))?,
            ngen_scale: self.ngen_scale.unwrap_or(DEFAULT_NGEN_SCALE),
            single_round: self.single_round,
        };
        if !(sampling.ngen_scale.is_finite() && sampling.ngen_scale > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "ngen_scale",
                reason: format!("{} is not a positive number", sampling.ngen_scale),
            });
        }

        let execution = self.execution;
        positive("num_states_per_cpu", execution.num_states_per_cpu)?;
        if let Some(n) = execution.num_cpu {
            positive("num_cpu", n)?;
        }
        positive("docking_n_cpu", self.postprocessing.docking_n_cpu)?;

        let weights = WeightScanConfig {
            dg_weights_file: self
                .weights
                .dg_weights_file
                .map(|p| absolute("w_dGdiff_bonus_weights_file", &p))
                .transpose()?,
            entity_weights_file: self
                .weights
                .entity_weights_file
                .map(|p| absolute("entfunc_weights_file", &p))
                .transpose()?,
        };

        Ok(JobOptions {
            base_dir,
            design_definition: self
                .design_definition
                .ok_or(ConfigError::MissingParameter("design_definition"))?,
            state_version: self
                .state_version
                .ok_or(ConfigError::MissingParameter("state_version"))?,
            job_name,
            output_dir: absolute(
                "output_dir",
                &self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            )?,
            daf: absolute(
                "daf",
                &self.daf.ok_or(ConfigError::MissingParameter("daf"))?,
            )?,
            preserve_daf: self.preserve_daf,
            weights,
            flags_files: self
                .flags_files
                .iter()
                .map(|p| absolute("flags_files", p))
                .collect::<Result<_, _>>()?,
            sampling,
            seeding: self.seeding,
            ntop_msd_results_to_dock: positive(
                "ntop_msd_results_to_dock",
                self.ntop_msd_results_to_dock.unwrap_or(1),
            )?,
            execution,
            postprocessing: self.postprocessing,
            toolchain: self
                .toolchain
                .ok_or(ConfigError::MissingParameter("toolchain"))?,
            creation_command: self.creation_command,
        })
    }
}

/// `<base_dir>/input_files/state_versions/<name>`.
pub fn state_version_dir(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join("input_files").join("state_versions").join(name)
}

fn absolute(name: &'static str, path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|e| ConfigError::InvalidParameter {
        name,
        reason: format!("cannot resolve '{}': {e}", path.display()),
    })
}

fn positive(name: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidParameter {
            name,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> JobOptionsBuilder {
        JobOptionsBuilder::new()
            .base_dir(PathBuf::from("/data/msd"))
            .design_definition("dd1")
            .state_version("sv1")
            .job_name("testjob")
            .daf(PathBuf::from("/data/msd/fitness.daf"))
            .toolchain(Toolchain::new(
                PathBuf::from("/opt/rosetta/main"),
                PathBuf::from("/opt/pyscripts"),
            ))
    }

    #[test]
    fn build_applies_defaults() {
        let opts = minimal().build().unwrap();
        assert_eq!(opts.sampling.pop_size, DEFAULT_POP_SIZE);
        assert_eq!(opts.sampling.ngen_scale, DEFAULT_NGEN_SCALE);
        assert_eq!(opts.ntop_msd_results_to_dock, 1);
        assert_eq!(opts.execution, ExecutionOptions::default());
        assert_eq!(opts.postprocessing.docking_n_cpu, 45);
        assert_eq!(
            opts.design_definition_dir(),
            PathBuf::from("/data/msd/input_files/design_definitions/dd1")
        );
        assert_eq!(
            opts.state_version_dir(),
            PathBuf::from("/data/msd/input_files/state_versions/sv1")
        );
        assert!(opts.output_dir.is_absolute());
    }

    #[test]
    fn build_fails_without_required_parameters() {
        let result = JobOptionsBuilder::new()
            .base_dir(PathBuf::from("/data"))
            .job_name("j")
            .build();
        assert_eq!(
            result,
            Err(ConfigError::MissingParameter("design_definition"))
        );
        let result = minimal().daf(PathBuf::new());
        assert!(result.build().is_err());
    }

    #[test]
    fn conflicting_seed_options_are_rejected() {
        let result = minimal()
            .seed_sequences(vec!["AAA".into()])
            .pdb_seed_pairs(vec!["a.pdb".into(), "b.pdb".into()])
            .build();
        assert_eq!(
            result,
            Err(ConfigError::Conflict("seed_sequences", "pdb_seed_pairs"))
        );

        let result = minimal().single_round(true).fill_gen1_from_seeds(true).build();
        assert_eq!(
            result,
            Err(ConfigError::Conflict("single_round", "fill_gen1_from_seeds"))
        );

    }

    #[test]
    fn pdb_seed_pairs_are_rejected_instead_of_used_as_sequences() {
        let result = minimal()
            .pdb_seed_pairs(vec!["a.pdb".into(), "b.pdb".into()])
            .build();
        match result {
            Err(ConfigError::InvalidParameter { name, reason }) => {
                assert_eq!(name, "pdb_seed_pairs");
                assert!(reason.contains("seed_sequences"));
            }
            other => panic!("expected pdb_seed_pairs rejection, got {other:?}"),
        }
        let result = minimal().pdb_seed_pairs(vec!["a.pdb".into()]).build();
        assert!(matches!(result, Err(ConfigError::InvalidParameter { name: "pdb_seed_pairs", .. })));
    }

    #[test]
    fn zero_counts_are_rejected() {
        let result = minimal().pop_size(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidParameter { name: "pop_size", .. })));
        let result = minimal().ngen_scale(0.0).build();
        assert!(matches!(result, Err(ConfigError::InvalidParameter { name: "ngen_scale", .. })));
        let result = minimal()
            .execution(ExecutionOptions {
                num_states_per_cpu: 0,
                ..ExecutionOptions::default()
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn process_count_rounds_up_unless_pinned() {
        let mut exec = ExecutionOptions {
            num_states_per_cpu: 4,
            ..ExecutionOptions::default()
        };
        assert_eq!(exec.process_count(14), 4);
        assert_eq!(exec.process_count(16), 4);
        assert_eq!(exec.process_count(0), 1);
        exec.num_cpu = Some(7);
        assert_eq!(exec.process_count(14), 7);
    }

    #[test]
    fn postprocessing_command_line_lists_flags_relax_and_cpus() {
        let opts = PostProcessingOptions {
            docking_flags_files: vec![PathBuf::from("/f/dock.flags"), PathBuf::from("/f/my flags")],
            relax: true,
            docking_n_cpu: 12,
        };
        assert_eq!(
            opts.to_command_line(),
            "--docking_flags_files /f/dock.flags '/f/my flags' --relax --docking_n_cpu 12"
        );
        assert_eq!(
            PostProcessingOptions::default().to_command_line(),
            "--docking_n_cpu 45"
        );
    }

    #[test]
    fn seeding_flags_follow_sequences_and_fill() {
        let seeding = SeedingConfig {
            seed_sequences: vec!["LIVF".into()],
            fill_gen1_from_seeds: false,
        };
        assert_eq!(seeding.seeds(), ["LIVF".to_string()]);
        assert!(seeding.is_seeded());
        assert!(!SeedingConfig::default().is_seeded());
        let fill_only = SeedingConfig {
            seed_sequences: vec![],
            fill_gen1_from_seeds: true,
        };
        assert!(fill_only.is_seeded());
    }

    #[test]
    fn toolchain_paths_follow_rosetta_layout() {
        let tc = Toolchain::new(PathBuf::from("/opt/rosetta/main"), PathBuf::from("/opt/py"));
        assert_eq!(
            tc.msd_executable_path(),
            PathBuf::from("/opt/rosetta/main/source/bin/mpi_msd.mpiserialization.linuxgccrelease")
        );
        assert_eq!(tc.database_dir(), "/opt/rosetta/main/database/");
        assert_eq!(tc.pyscript("x.py"), PathBuf::from("/opt/py/x.py"));
    }
}

use clap::{Args, Parser, Subcommand};
use msdprep::core::cluster::ClusterId;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "msdprep - prepares multistate protein design jobs and their batch submission scripts.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Skip hostname detection and act as the named cluster
    /// (killdevil, longleaf, dogwood, wiggins, laptop, desktop).
    #[arg(long, global = true, value_name = "CLUSTER")]
    pub masquerade: Option<ClusterId>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lay out a complete design job: sub-job directories, fitness files and submission scripts.
    Prepare(PrepareArgs),
    /// Print the detected cluster and the batch scheduler it uses.
    Identify,
    /// Regenerate the state-list files of a state version without preparing a job.
    States(StatesArgs),
}

/// Location of the design project on disk.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root holding `input_files/`. Defaults to the current directory.
    #[arg(long = "base_dir", value_name = "PATH")]
    pub base_dir: Option<PathBuf>,

    /// Species catalog. Defaults to `<base_dir>/species.toml`.
    #[arg(long, value_name = "PATH")]
    pub species: Option<PathBuf>,
}

/// Arguments for the `prepare` subcommand.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    // --- Job Identity ---
    /// Design definition directory name under `input_files/design_definitions/`.
    #[arg(long = "des_def", required = true, value_name = "NAME")]
    pub des_def: String,

    /// State version directory name under `input_files/state_versions/`.
    #[arg(long = "state_version", required = true, value_name = "NAME")]
    pub state_version: String,

    /// Name of the job directory to create.
    #[arg(long = "job_name", required = true, value_name = "NAME")]
    pub job_name: String,

    /// Fitness template file.
    #[arg(long, required = true, value_name = "PATH")]
    pub daf: PathBuf,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Directory the job directory is created in. Defaults to the current directory.
    #[arg(long = "output_dir", value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    // --- Fitness Sweep ---
    /// One binding-energy weight per line; replaces the built-in sweep.
    #[arg(long = "w_dGdiff_bonus_weights_file", value_name = "PATH")]
    pub dg_weights_file: Option<PathBuf>,

    /// One entity-function weight per line.
    #[arg(long = "entfunc_weights_file", value_name = "PATH")]
    pub entfunc_weights_file: Option<PathBuf>,

    /// Copy the fitness template into every sub-job unchanged.
    #[arg(long = "preserve_DAF")]
    pub preserve_daf: bool,

    // --- Sampling ---
    /// Flags files passed to the design program.
    #[arg(long = "flags_files", value_name = "PATH", num_args(1..))]
    pub flags_files: Vec<PathBuf>,

    /// Genetic-algorithm population size.
    #[arg(long = "pop_size", value_name = "INT")]
    pub pop_size: Option<u32>,

    /// Generations per designable entity.
    #[arg(long = "ngen_scale", value_name = "FLOAT")]
    pub ngen_scale: Option<f64>,

    /// Run a single generation.
    #[arg(long = "single_round")]
    pub single_round: bool,

    /// Seed sequences for the first generation.
    #[arg(long = "seed_sequences", value_name = "SEQ", num_args(1..), conflicts_with = "pdb_seed_pairs")]
    pub seed_sequences: Vec<String>,

    /// Pairs of seed structures. Rejected at validation; pass their
    /// sequences with `--seed_sequences` instead.
    #[arg(long = "pdb_seed_pairs", value_name = "PDB", num_args(1..))]
    pub pdb_seed_pairs: Vec<String>,

    /// Fill the whole first generation from the seeds.
    #[arg(long = "fill_gen1_from_seeds", conflicts_with = "single_round")]
    pub fill_gen1_from_seeds: bool,

    // --- Execution ---
    /// Explicit process count per sub-job.
    #[arg(long = "num_cpu", value_name = "INT")]
    pub num_cpu: Option<u32>,

    /// States evaluated per process when the process count is derived.
    #[arg(long = "num_states_per_cpu", value_name = "INT")]
    pub num_states_per_cpu: Option<u32>,

    /// Batch queue or partition. `auto` picks one from the node count.
    #[arg(long, value_name = "NAME")]
    pub queue: Option<String>,

    /// Submit the job and its docking chain once the files are written.
    #[arg(long)]
    pub launch: bool,

    // --- Post-processing ---
    /// Top results per sub-job carried forward to docking.
    #[arg(long = "ntop_msd_results_to_dock", value_name = "INT")]
    pub ntop_msd_results_to_dock: Option<u32>,

    /// Flags files passed to the docking run.
    #[arg(long = "docking_flags_files", value_name = "PATH", num_args(1..))]
    pub docking_flags_files: Vec<PathBuf>,

    /// Relax the docked complexes.
    #[arg(long)]
    pub relax: bool,

    /// Processes requested for the docking run.
    #[arg(long = "docking_n_cpu", value_name = "INT")]
    pub docking_n_cpu: Option<u32>,

    // --- Toolchain ---
    /// Rosetta checkout holding `source/bin/` and `database/`.
    #[arg(long = "rosetta_dir", value_name = "PATH")]
    pub rosetta_dir: Option<PathBuf>,

    /// Directory of the docking helper scripts.
    #[arg(long = "pyscripts_dir", value_name = "PATH")]
    pub pyscripts_dir: Option<PathBuf>,

    /// Python interpreter used for the helper scripts.
    #[arg(long, value_name = "PROGRAM")]
    pub python: Option<String>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S execution.queue=debug
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `states` subcommand.
#[derive(Args, Debug)]
pub struct StatesArgs {
    /// State version directory name under `input_files/state_versions/`.
    #[arg(long = "state_version", required = true, value_name = "NAME")]
    pub state_version: String,

    #[command(flatten)]
    pub project: ProjectArgs,
}

use msdprep::engine::config as core_config;

pub const ROSETTA_DIR_ENV: &str = "MSDPREP_ROSETTA_DIR";
pub const PYSCRIPTS_DIR_ENV: &str = "MSDPREP_PYSCRIPTS_DIR";
pub const PYTHON_ENV: &str = "MSDPREP_PYTHON";

pub const SPECIES_FILE: &str = "species.toml";
pub const PYSCRIPTS_SUBDIR: &str = "pyscripts";

pub struct DefaultsConfig {
    pub python: String,
    pub msd_executable: String,
    pub num_states_per_cpu: u32,
    pub docking_n_cpu: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            python: core_config::DEFAULT_PYTHON.to_string(),
            msd_executable: core_config::DEFAULT_MSD_EXECUTABLE.to_string(),
            num_states_per_cpu: 1,
            docking_n_cpu: core_config::DEFAULT_DOCKING_N_CPU,
        }
    }
}

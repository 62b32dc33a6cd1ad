use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileToolchainConfig {
    pub rosetta_dir: Option<PathBuf>,
    pub pyscripts_dir: Option<PathBuf>,
    pub python: Option<String>,
    pub msd_executable: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileExecutionConfig {
    pub queue: Option<String>,
    pub num_states_per_cpu: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FilePostProcessingConfig {
    pub docking_n_cpu: Option<u32>,
    pub docking_flags_files: Option<Vec<PathBuf>>,
    pub relax: Option<bool>,
}

/// The on-disk `config.toml`; every section and key is optional.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub toolchain: Option<FileToolchainConfig>,
    pub execution: Option<FileExecutionConfig>,
    pub postprocessing: Option<FilePostProcessingConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

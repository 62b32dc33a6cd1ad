use thiserror::Error;

use super::config::ConfigError;
use super::definition::DefinitionError;
use super::state_version::StateVersionError;
use crate::core::cluster::ClusterId;
use crate::core::io::lists::ListError;
use crate::core::species::{BackboneStrategy, CatalogError};
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Species catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Design definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("State version error: {0}")]
    StateVersion(#[from] StateVersionError),

    #[error("Input list error: {0}")]
    List(#[from] ListError),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Job directory '{}' already exists; choose a different job name", .0.display())]
    JobDirectoryExists(PathBuf),

    #[error("Could not create sub-job directory '{}': it already exists", .0.display())]
    SubJobDirectoryExists(PathBuf),

    #[error("Could not locate file '{}' when creating symlinks for sub-job '{sub_job}' of job '{job}'", source_path.display())]
    MissingSymlinkSource {
        source_path: PathBuf,
        sub_job: String,
        job: String,
    },

    #[error("Requested flags file '{}' not found", .0.display())]
    MissingFlagsFile(PathBuf),

    #[error("The weight sweep for job '{0}' is empty")]
    EmptySweep(String),

    #[error("Cluster '{0}' has no batch scheduler; pass a cluster identity to render for")]
    UnsupportedCluster(ClusterId),

    #[error("Species catalog uses the {catalog} strategy but the job was built for {requested}")]
    StrategyMismatch {
        catalog: BackboneStrategy,
        requested: BackboneStrategy,
    },

    #[error("Launch script '{script}' failed: {status}")]
    Launch { script: String, status: String },
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into().to_string_lossy().to_string(),
            source,
        }
    }
}

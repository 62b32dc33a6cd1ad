//! Assignment of concrete structure files to species.
//!
//! A state version lives in `input_files/state_versions/<name>/` and is read by
//! one of two strategies: [`isolate::IsolateBackboneStateVersion`] tracks which
//! structures share a backbone, [`merge::MergeBackboneStateVersion`] reads a
//! flat species-to-structure mapping. Both generate per-species state-list files
//! next to their inputs.

pub mod isolate;
pub mod merge;

use crate::core::io::lists::SourceLine;
use crate::core::io::separation::SeparationError;
use crate::core::io::state_list::WriteOutcome;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateVersionError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("YAML parsing error for '{path}': {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("Expected '{expected}' at {at}")]
    MalformedLine { expected: &'static str, at: SourceLine },
    #[error("Invalid mut status '{status}' at {at}; valid mut statuses are: {valid}")]
    InvalidMutStatus {
        status: String,
        valid: String,
        at: SourceLine,
    },
    #[error("Backbone '{backbone}' was already given as a positive backbone, but appears again at {at}")]
    BackboneCollision { backbone: String, at: SourceLine },
    #[error("Negative backbone '{backbone}' was already given, but appears again at {at}")]
    DuplicateBackbone { backbone: String, at: SourceLine },
    #[error("Backbone '{backbone}' at {at} was not declared in a backbone list")]
    UnknownBackbone { backbone: String, at: SourceLine },
    #[error("Could not find structure '{}' which was given at {at}", file.display())]
    MissingStructure { file: PathBuf, at: SourceLine },
    #[error("Could not find structure '{}' which was listed in '{}'", file.display(), source_file.display())]
    MissingListedStructure { file: PathBuf, source_file: PathBuf },
    #[error("Species '{species}' listed in '{}' is not a declared species", path.display())]
    UnknownSpecies { species: String, path: PathBuf },
    #[error("Species '{0}' has no structures in the state version")]
    EmptySpecies(String),
    #[error("Failed to synthesize a separated structure: {0}")]
    Separation(#[from] SeparationError),
}

impl StateVersionError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StateVersionError::Io {
            path: path.to_string_lossy().to_string(),
            source,
        }
    }
}

/// Result of regenerating one state-list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateListUpdate {
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

/// Behaviour shared by both state-version strategies.
pub trait StateVersion {
    /// Directory holding the state version's inputs and generated lists.
    fn dir(&self) -> &Path;

    /// Reads the declarative inputs and resolves every structure file.
    ///
    /// Only the first call does any work.
    ///
    /// # Errors
    ///
    /// Returns an error naming the declaring file and line when an input is
    /// malformed or references a structure that does not exist.
    fn determine_structures(&mut self) -> Result<(), StateVersionError>;

    /// Every structure file name (relative to [`StateVersion::dir`]) used by the
    /// job. Empty until [`StateVersion::determine_structures`] has run.
    fn structures(&self) -> &[String];

    /// Writes the per-species state-list files, determining structures first.
    ///
    /// # Errors
    ///
    /// Returns an error if determination fails or a list cannot be written.
    fn create_state_file_lists(&mut self) -> Result<Vec<StateListUpdate>, StateVersionError>;

    /// Total number of states a single design run evaluates.
    fn total_state_count(&self) -> usize;
}

use super::{StateListUpdate, StateVersion, StateVersionError};
use crate::core::io::lists;
use crate::core::io::state_list;
use crate::core::species::DesignSpecies;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub const STATES_FILE: &str = "states.yaml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatesFile {
    pdbs: Vec<StateEntry>,
    /// List files of extra structures that are symlinked but not scored as states.
    #[serde(default)]
    pose_energy_vectors: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateEntry {
    species: String,
    pdb: String,
}

/// State version read from a flat `states.yaml` species-to-structure mapping.
pub struct MergeBackboneStateVersion<'a> {
    dir: PathBuf,
    species: &'a dyn DesignSpecies,
    structures_by_species: HashMap<String, Vec<String>>,
    structures: Vec<String>,
    state_count: usize,
    determined: bool,
}

impl<'a> MergeBackboneStateVersion<'a> {
    pub fn new(dir: PathBuf, species: &'a dyn DesignSpecies) -> Self {
        Self {
            dir,
            species,
            structures_by_species: HashMap::new(),
            structures: Vec::new(),
            state_count: 0,
            determined: false,
        }
    }

    pub fn state_file_name(&self, species: &str) -> String {
        format!("{species}.states")
    }

    pub fn structures_for(&self, species: &str) -> &[String] {
        self.structures_by_species
            .get(species)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn push_structure(&mut self, file: &str) {
        if !self.structures.iter().any(|s| s == file) {
            self.structures.push(file.to_string());
        }
    }

    fn read_pose_energy_vectors(&mut self, list: &str) -> Result<(), StateVersionError> {
        let path = self.dir.join(list);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StateVersionError::MissingListedStructure {
                file: path.clone(),
                source_file: self.dir.join(STATES_FILE),
            },
            _ => StateVersionError::io(&path, e),
        })?;
        for decl in lists::declarations(&content) {
            let file = decl.fields[0];
            if !self.dir.join(file).is_file() {
                return Err(StateVersionError::MissingStructure {
                    file: self.dir.join(file),
                    at: decl.source(&path),
                });
            }
            self.push_structure(file);
        }
        Ok(())
    }
}

impl StateVersion for MergeBackboneStateVersion<'_> {
    fn dir(&self) -> &Path {
        &self.dir
    }

    fn determine_structures(&mut self) -> Result<(), StateVersionError> {
        if self.determined {
            return Ok(());
        }
        let path = self.dir.join(STATES_FILE);
        let content =
            std::fs::read_to_string(&path).map_err(|e| StateVersionError::io(&path, e))?;
        let raw: StatesFile =
            serde_yaml::from_str(&content).map_err(|e| StateVersionError::Yaml {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;

        for entry in raw.pdbs {
            if !self.species.contains(&entry.species) {
                return Err(StateVersionError::UnknownSpecies {
                    species: entry.species,
                    path,
                });
            }
            if !self.dir.join(&entry.pdb).is_file() {
                return Err(StateVersionError::MissingListedStructure {
                    file: self.dir.join(&entry.pdb),
                    source_file: path,
                });
            }
            self.push_structure(&entry.pdb);
            self.structures_by_species
                .entry(entry.species)
                .or_default()
                .push(entry.pdb);
            self.state_count += 1;
        }
        for list in &raw.pose_energy_vectors {
            self.read_pose_energy_vectors(list)?;
        }
        if let Some(empty) = self
            .species
            .species()
            .iter()
            .find(|s| !self.structures_by_species.contains_key(*s))
        {
            return Err(StateVersionError::EmptySpecies(empty.clone()));
        }

        self.determined = true;
        info!(
            "State version '{}': {} states over {} structures.",
            self.dir.display(),
            self.state_count,
            self.structures.len()
        );
        Ok(())
    }

    fn structures(&self) -> &[String] {
        &self.structures
    }

    /// Writes `<species>.states` for every species whose list does not exist yet.
    /// Existing lists are never overwritten.
    fn create_state_file_lists(&mut self) -> Result<Vec<StateListUpdate>, StateVersionError> {
        self.determine_structures()?;
        let mut updates = Vec::new();
        for species in self.species.species() {
            let path = self.dir.join(self.state_file_name(species));
            let lines: Vec<String> = self
                .structures_for(species)
                .iter()
                .map(|s| state_list::state_line(s, species))
                .collect();
            let outcome = state_list::write_if_absent(&path, &lines)
                .map_err(|e| StateVersionError::io(&path, e))?;
            updates.push(StateListUpdate { path, outcome });
        }
        Ok(updates)
    }

    fn total_state_count(&self) -> usize {
        self.state_count
    }
}

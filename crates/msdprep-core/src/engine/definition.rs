use crate::core::io::lists::{self, SourceLine};
use crate::core::species::DesignSpecies;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const TEXT_DEFINITION_FILE: &str = "definition_files.txt";
pub const YAML_DEFINITION_FILE: &str = "definition_files.yaml";
pub const ENTITY_RESFILE: &str = "entity.resfile";
const ENTFUNC_HEADER: &str = "entfunc";

#[derive(Debug, Error)]
pub enum DefinitionError {
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
    #[error("No design definition file ({TEXT_DEFINITION_FILE} or {YAML_DEFINITION_FILE}) in '{0}'")]
    NoDefinitionFile(PathBuf),
    #[error("Unrecognized command '{header}' at {at}")]
    UnrecognizedCommand { header: String, at: SourceLine },
    #[error("Malformed entry at column {column} of {at}")]
    MalformedEntry { column: usize, at: SourceLine },
    #[error("Species '{species}' in '{path}' is not a declared species")]
    UnknownSpecies { species: String, path: PathBuf },
    #[error("Species '{species}' has no {missing} file in the design definition")]
    IncompleteSpecies {
        species: String,
        missing: &'static str,
    },
    #[error("File '{file}' referenced by the design definition in '{dir}' does not exist")]
    MissingFile { file: String, dir: PathBuf },
    #[error("First line of '{path}' must be the number of designable entities, found '{text}'")]
    InvalidEntityCount { path: PathBuf, text: String },
}

/// Per-species input files of one design definition.
///
/// Loaded once, immutable afterwards; every file named here was verified to
/// exist at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignDefinition {
    dir: PathBuf,
    corr: HashMap<String, String>,
    secondary_resfiles: HashMap<String, String>,
    entfunc: Option<String>,
    n_entities: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlDefinition {
    species: Vec<YamlSpecies>,
    #[serde(default)]
    entfunc: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlSpecies {
    name: String,
    corr: String,
    #[serde(rename = "2res")]
    secondary_resfile: String,
}

impl DesignDefinition {
    /// Loads whichever definition file the directory holds, preferring YAML.
    pub fn load(dir: &Path, species: &dyn DesignSpecies) -> Result<Self, DefinitionError> {
        if dir.join(YAML_DEFINITION_FILE).is_file() {
            Self::load_yaml(dir, species)
        } else if dir.join(TEXT_DEFINITION_FILE).is_file() {
            Self::load_text(dir, species)
        } else {
            Err(DefinitionError::NoDefinitionFile(dir.to_path_buf()))
        }
    }

    /// Parses the line-oriented format:
    /// `<species> corr= <file> 2res= <file>` or `entfunc <file>`.
    pub fn load_text(dir: &Path, species: &dyn DesignSpecies) -> Result<Self, DefinitionError> {
        let path = dir.join(TEXT_DEFINITION_FILE);
        let content = read(&path)?;

        let mut corr = HashMap::new();
        let mut secondary_resfiles = HashMap::new();
        let mut entfunc = None;

        for decl in lists::declarations(&content) {
            let header = decl.fields[0];
            if species.contains(header) {
                let mut i = 1;
                while i < decl.fields.len() {
                    if let Some(file) = decl.keyed(i, "corr=") {
                        corr.insert(header.to_string(), file.to_string());
                    } else if let Some(file) = decl.keyed(i, "2res=") {
                        secondary_resfiles.insert(header.to_string(), file.to_string());
                    } else {
                        return Err(DefinitionError::MalformedEntry {
                            column: i,
                            at: decl.source(&path),
                        });
                    }
                    i += 2;
                }
            } else if header == ENTFUNC_HEADER {
                match decl.fields.get(1) {
                    Some(file) => entfunc = Some(file.to_string()),
                    None => {
                        return Err(DefinitionError::MalformedEntry {
                            column: 1,
                            at: decl.source(&path),
                        });
                    }
                }
            } else {
                return Err(DefinitionError::UnrecognizedCommand {
                    header: header.to_string(),
                    at: decl.source(&path),
                });
            }
        }

        Self::finish(dir, species, corr, secondary_resfiles, entfunc)
    }

    /// Parses `species: [{name, corr, 2res}]` with an optional `entfunc`.
    pub fn load_yaml(dir: &Path, species: &dyn DesignSpecies) -> Result<Self, DefinitionError> {
        let path = dir.join(YAML_DEFINITION_FILE);
        let content = read(&path)?;
        let raw: YamlDefinition =
            serde_yaml::from_str(&content).map_err(|e| DefinitionError::Yaml {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;

        let mut corr = HashMap::new();
        let mut secondary_resfiles = HashMap::new();
        for entry in raw.species {
            if !species.contains(&entry.name) {
                return Err(DefinitionError::UnknownSpecies {
                    species: entry.name,
                    path,
                });
            }
            corr.insert(entry.name.clone(), entry.corr);
            secondary_resfiles.insert(entry.name, entry.secondary_resfile);
        }

        Self::finish(dir, species, corr, secondary_resfiles, raw.entfunc)
    }

    fn finish(
        dir: &Path,
        species: &dyn DesignSpecies,
        corr: HashMap<String, String>,
        secondary_resfiles: HashMap<String, String>,
        entfunc: Option<String>,
    ) -> Result<Self, DefinitionError> {
        for name in species.species() {
            let corr_file = corr.get(name).ok_or_else(|| DefinitionError::IncompleteSpecies {
                species: name.clone(),
                missing: "corr",
            })?;
            let secres_file =
                secondary_resfiles
                    .get(name)
                    .ok_or_else(|| DefinitionError::IncompleteSpecies {
                        species: name.clone(),
                        missing: "2res",
                    })?;
            require_file(dir, corr_file)?;
            require_file(dir, secres_file)?;
        }
        if let Some(file) = &entfunc {
            require_file(dir, file)?;
        }
        require_file(dir, ENTITY_RESFILE)?;
        let n_entities = read_entity_count(&dir.join(ENTITY_RESFILE))?;

        info!(
            "Loaded design definition '{}' ({} species, {} designable entities{}).",
            dir.display(),
            corr.len(),
            n_entities,
            if entfunc.is_some() { ", entity function" } else { "" }
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            corr,
            secondary_resfiles,
            entfunc,
            n_entities,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn corr(&self, species: &str) -> Option<&str> {
        self.corr.get(species).map(String::as_str)
    }

    pub fn secondary_resfile(&self, species: &str) -> Option<&str> {
        self.secondary_resfiles.get(species).map(String::as_str)
    }

    pub fn entfunc(&self) -> Option<&str> {
        self.entfunc.as_deref()
    }

    /// Base name of the entity function, as referenced from a fitness file.
    pub fn entfunc_name(&self) -> Option<&str> {
        self.entfunc
            .as_deref()
            .map(|f| f.rsplit('/').next().unwrap_or(f))
    }

    pub fn n_entities(&self) -> usize {
        self.n_entities
    }

    pub fn species_count(&self) -> usize {
        self.corr.len()
    }

    pub fn entity_resfile(&self) -> PathBuf {
        self.dir.join(ENTITY_RESFILE)
    }
}

fn read(path: &Path) -> Result<String, DefinitionError> {
    std::fs::read_to_string(path).map_err(|e| DefinitionError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn require_file(dir: &Path, file: &str) -> Result<(), DefinitionError> {
    if dir.join(file).is_file() {
        debug!("Found design definition input '{}'.", file);
        Ok(())
    } else {
        Err(DefinitionError::MissingFile {
            file: file.to_string(),
            dir: dir.to_path_buf(),
        })
    }
}

fn read_entity_count(path: &Path) -> Result<usize, DefinitionError> {
    let content = read(path)?;
    let first = content.lines().next().unwrap_or("").trim();
    first
        .parse()
        .map_err(|_| DefinitionError::InvalidEntityCount {
            path: path.to_path_buf(),
            text: first.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::species::{BackboneStrategy, SpeciesCatalog, SpeciesEntry, SpeciesRole, SpeciesSign};
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn catalog(names: &[&str]) -> SpeciesCatalog {
        let entries = names
            .iter()
            .map(|n| SpeciesEntry {
                name: n.to_string(),
                role: SpeciesRole::Monomer,
                sign: SpeciesSign::Positive,
                separated: None,
                mut_status: None,
            })
            .collect();
        SpeciesCatalog::new(BackboneStrategy::MergeBackbone, entries, None).unwrap()
    }

    fn definition_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(ENTITY_RESFILE), "3\nPIKAA ACDE\n").unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    const INPUTS: [(&str, &str); 5] = [
        ("a.corr", ""),
        ("a.2res", ""),
        ("b.corr", ""),
        ("b.2res", ""),
        ("ent.func", ""),
    ];

    #[test]
    fn text_definition_maps_every_species() {
        let dir = definition_dir(&INPUTS);
        fs::write(
            dir.path().join(TEXT_DEFINITION_FILE),
            "A corr= a.corr 2res= a.2res\n\nB 2res= b.2res corr= b.corr\nentfunc ent.func\n",
        )
        .unwrap();

        let def = DesignDefinition::load(dir.path(), &catalog(&["A", "B"])).unwrap();
        assert_eq!(def.species_count(), 2);
        assert_eq!(def.corr("A"), Some("a.corr"));
        assert_eq!(def.corr("B"), Some("b.corr"));
        assert_eq!(def.secondary_resfile("B"), Some("b.2res"));
        assert_eq!(def.entfunc(), Some("ent.func"));
        assert_eq!(def.n_entities(), 3);
    }

    #[test]
    fn yaml_definition_has_the_same_shape() {
        let dir = definition_dir(&INPUTS);
        fs::write(
            dir.path().join(TEXT_DEFINITION_FILE),
            "A corr= a.corr 2res= a.2res\nB corr= b.corr 2res= b.2res\nentfunc ent.func\n",
        )
        .unwrap();
        let from_text = DesignDefinition::load_text(dir.path(), &catalog(&["A", "B"])).unwrap();

        fs::write(
            dir.path().join(YAML_DEFINITION_FILE),
            "species:\n  - name: A\n    corr: a.corr\n    2res: a.2res\n  - name: B\n    corr: b.corr\n    2res: b.2res\nentfunc: ent.func\n",
        )
        .unwrap();
        let from_yaml = DesignDefinition::load(dir.path(), &catalog(&["A", "B"])).unwrap();
        assert_eq!(from_text, from_yaml);
    }

    #[test]
    fn unrecognized_header_names_file_and_line() {
        let dir = definition_dir(&INPUTS);
        fs::write(
            dir.path().join(TEXT_DEFINITION_FILE),
            "A corr= a.corr 2res= a.2res\nC corr= c.corr\n",
        )
        .unwrap();
        match DesignDefinition::load(dir.path(), &catalog(&["A"])) {
            Err(DefinitionError::UnrecognizedCommand { header, at }) => {
                assert_eq!(header, "C");
                assert_eq!(at.number, 2);
                assert_eq!(at.text, "C corr= c.corr");
                assert!(at.path.ends_with(TEXT_DEFINITION_FILE));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn malformed_key_reports_column() {
        let dir = definition_dir(&INPUTS);
        fs::write(
            dir.path().join(TEXT_DEFINITION_FILE),
            "A corr= a.corr res= a.2res\n",
        )
        .unwrap();
        let result = DesignDefinition::load(dir.path(), &catalog(&["A"]));
        assert!(matches!(
            result,
            Err(DefinitionError::MalformedEntry { column: 3, .. })
        ));
    }

    #[test]
    fn missing_referenced_file_fails_at_load() {
        let dir = definition_dir(&[("a.corr", "")]);
        fs::write(
            dir.path().join(TEXT_DEFINITION_FILE),
            "A corr= a.corr 2res= a.2res\n",
        )
        .unwrap();
        let result = DesignDefinition::load(dir.path(), &catalog(&["A"]));
        assert!(matches!(result, Err(DefinitionError::MissingFile { file, .. }) if file == "a.2res"));
    }

    #[test]
    fn declared_species_without_files_is_incomplete() {
        let dir = definition_dir(&INPUTS);
        fs::write(
            dir.path().join(TEXT_DEFINITION_FILE),
            "A corr= a.corr 2res= a.2res\n",
        )
        .unwrap();
        let result = DesignDefinition::load(dir.path(), &catalog(&["A", "B"]));
        assert!(matches!(
            result,
            Err(DefinitionError::IncompleteSpecies { missing: "corr", .. })
        ));
    }

    #[test]
    fn yaml_rejects_undeclared_species() {
        let dir = definition_dir(&INPUTS);
        fs::write(
            dir.path().join(YAML_DEFINITION_FILE),
            "species:\n  - name: Z\n    corr: a.corr\n    2res: a.2res\n",
        )
        .unwrap();
        let result = DesignDefinition::load(dir.path(), &catalog(&["A"]));
        assert!(matches!(result, Err(DefinitionError::UnknownSpecies { species, .. }) if species == "Z"));
    }

    #[test]
    fn entfunc_name_strips_directories() {
        let dir = definition_dir(&[("a.corr", ""), ("a.2res", "")]);
        fs::create_dir(dir.path().join("funcs")).unwrap();
        fs::write(dir.path().join("funcs/ent.func"), "").unwrap();
        fs::write(
            dir.path().join(TEXT_DEFINITION_FILE),
            "A corr= a.corr 2res= a.2res\nentfunc funcs/ent.func\n",
        )
        .unwrap();
        let def = DesignDefinition::load(dir.path(), &catalog(&["A"])).unwrap();
        assert_eq!(def.entfunc_name(), Some("ent.func"));
    }

    #[test]
    fn missing_definition_file_is_reported() {
        let dir = definition_dir(&[]);
        let result = DesignDefinition::load(dir.path(), &catalog(&["A"]));
        assert!(matches!(result, Err(DefinitionError::NoDefinitionFile(_))));
    }
}

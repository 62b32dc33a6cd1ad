use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// How structures are assigned to species within a state version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackboneStrategy {
    /// Energies are only compared between structures sharing a backbone.
    IsolateBackbone,
    /// A single species-to-structure mapping, no backbone bookkeeping.
    MergeBackbone,
}

impl fmt::Display for BackboneStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackboneStrategy::IsolateBackbone => write!(f, "isolate-backbone"),
            BackboneStrategy::MergeBackbone => write!(f, "merge-backbone"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesRole {
    Complex,
    Separated,
    Monomer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesSign {
    #[default]
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesEntry {
    pub name: String,
    pub role: SpeciesRole,
    #[serde(default)]
    pub sign: SpeciesSign,
    #[serde(default)]
    pub separated: Option<String>,
    #[serde(default, rename = "mut-status")]
    pub mut_status: Option<String>,
}

/// Parameters for synthesizing a separated structure from its complex.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeparationSettings {
    pub chains: Vec<String>,
    pub offset: [f64; 3],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    strategy: BackboneStrategy,
    #[serde(default)]
    species: Vec<SpeciesEntry>,
    #[serde(default)]
    separation: Option<SeparationSettings>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Species catalog declares no species")]
    Empty,
    #[error("Species '{0}' is declared more than once")]
    DuplicateSpecies(String),
    #[error("Complex '{complex}' names separated partner '{separated}', which is not a declared separated species")]
    InvalidSeparatedPartner { complex: String, separated: String },
    #[error("Complex '{0}' must name its separated partner under the isolate-backbone strategy")]
    MissingSeparatedPartner(String),
}

/// The declared set of species plus their membership test.
pub trait DesignSpecies {
    /// All species in declaration order.
    fn species(&self) -> &[String];

    fn contains(&self, name: &str) -> bool {
        self.species().iter().any(|s| s == name)
    }
}

/// Classification needed by the isolate-backbone strategy.
pub trait IsolateBackboneSpecies: DesignSpecies {
    fn is_positive(&self, name: &str) -> bool;
    fn is_negative(&self, name: &str) -> bool {
        !self.is_positive(name)
    }
    fn is_separated(&self, name: &str) -> bool;
    /// The separated species paired with a complex, if any.
    fn separated_for(&self, complex: &str) -> Option<&str>;
    /// Tag tying a negative species to the negative structures it is scored on.
    fn mut_status(&self, name: &str) -> Option<&str>;
    /// Every tag that may appear in the negative list files.
    fn valid_mut_statuses(&self) -> BTreeSet<String>;

    fn complexes(&self) -> Vec<&str> {
        self.species()
            .iter()
            .filter(|s| self.separated_for(s).is_some())
            .map(String::as_str)
            .collect()
    }
}

/// Classification needed by the merge-backbone strategy.
pub trait MergeBackboneSpecies: DesignSpecies {
    fn is_complex(&self, name: &str) -> bool;
    fn is_monomer(&self, name: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct SpeciesCatalog {
    strategy: BackboneStrategy,
    names: Vec<String>,
    entries: HashMap<String, SpeciesEntry>,
    separation: Option<SeparationSettings>,
}

impl SpeciesCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: CatalogFile = toml::from_str(&content).map_err(|e| CatalogError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::new(file.strategy, file.species, file.separation)
    }

    pub fn new(
        strategy: BackboneStrategy,
        species: Vec<SpeciesEntry>,
        separation: Option<SeparationSettings>,
    ) -> Result<Self, CatalogError> {
        if species.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut names = Vec::with_capacity(species.len());
        let mut entries = HashMap::with_capacity(species.len());
        for entry in species {
            if entries.contains_key(&entry.name) {
                return Err(CatalogError::DuplicateSpecies(entry.name));
            }
            names.push(entry.name.clone());
            entries.insert(entry.name.clone(), entry);
        }

        for name in &names {
            let entry = &entries[name];
            if entry.role != SpeciesRole::Complex {
                continue;
            }
            match &entry.separated {
                Some(sep) => {
                    let valid = entries
                        .get(sep)
                        .is_some_and(|e| e.role == SpeciesRole::Separated);
                    if !valid {
                        return Err(CatalogError::InvalidSeparatedPartner {
                            complex: name.clone(),
                            separated: sep.clone(),
                        });
                    }
                }
                None if strategy == BackboneStrategy::IsolateBackbone => {
                    return Err(CatalogError::MissingSeparatedPartner(name.clone()));
                }
                None => {}
            }
        }

        Ok(Self {
            strategy,
            names,
            entries,
            separation,
        })
    }

    pub fn strategy(&self) -> BackboneStrategy {
        self.strategy
    }

    pub fn separation(&self) -> Option<&SeparationSettings> {
        self.separation.as_ref()
    }

    pub fn entry(&self, name: &str) -> Option<&SpeciesEntry> {
        self.entries.get(name)
    }

    fn role_is(&self, name: &str, role: SpeciesRole) -> bool {
        self.entries.get(name).is_some_and(|e| e.role == role)
    }
}

impl DesignSpecies for SpeciesCatalog {
    fn species(&self) -> &[String] {
        &self.names
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl IsolateBackboneSpecies for SpeciesCatalog {
    fn is_positive(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|e| e.sign == SpeciesSign::Positive)
    }

    fn is_negative(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|e| e.sign == SpeciesSign::Negative)
    }

    fn is_separated(&self, name: &str) -> bool {
        self.role_is(name, SpeciesRole::Separated)
    }

    fn separated_for(&self, complex: &str) -> Option<&str> {
        self.entries
            .get(complex)
            .filter(|e| e.role == SpeciesRole::Complex)
            .and_then(|e| e.separated.as_deref())
    }

    fn mut_status(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(|e| e.mut_status.as_deref())
    }

    fn valid_mut_statuses(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .filter_map(|e| e.mut_status.clone())
            .collect()
    }
}

impl MergeBackboneSpecies for SpeciesCatalog {
    fn is_complex(&self, name: &str) -> bool {
        self.role_is(name, SpeciesRole::Complex)
    }

    fn is_monomer(&self, name: &str) -> bool {
        self.role_is(name, SpeciesRole::Monomer)
    }
}

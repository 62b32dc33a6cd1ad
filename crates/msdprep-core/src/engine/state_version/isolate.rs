use super::{StateListUpdate, StateVersion, StateVersionError};
use crate::core::io::lists::{self, Declaration, SourceLine};
use crate::core::io::separation::StructureSeparator;
use crate::core::io::state_list::{self, WriteOutcome};
use crate::core::species::IsolateBackboneSpecies;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const POSITIVE_BACKBONES_FILE: &str = "pos_backbones.list";
pub const NEGATIVE_BACKBONES_FILE: &str = "neg_backbones.list";
pub const NEGATIVE_COMPLEXES_FILE: &str = "neg_complexes.list";

const SEPARATED_SUFFIX: &str = "_sep.pdb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StructureKind {
    Complex,
    Separated,
}

#[derive(Debug, Clone)]
struct StructureRecord {
    backbone: String,
    file: String,
    kind: StructureKind,
    /// `None` for structures usable by every species on the backbone.
    mut_status: Option<String>,
}

/// State version whose structures are grouped by shared backbone, so energies
/// are only ever compared between structures on the same backbone.
pub struct IsolateBackboneStateVersion<'a> {
    dir: PathBuf,
    species: &'a dyn IsolateBackboneSpecies,
    separator: &'a dyn StructureSeparator,
    positive_backbones: Vec<String>,
    negative_backbones: Vec<String>,
    records: Vec<StructureRecord>,
    structures: Vec<String>,
    determined: bool,
}

impl<'a> IsolateBackboneStateVersion<'a> {
    pub fn new(
        dir: PathBuf,
        species: &'a dyn IsolateBackboneSpecies,
        separator: &'a dyn StructureSeparator,
    ) -> Self {
        Self {
            dir,
            species,
            separator,
            positive_backbones: Vec::new(),
            negative_backbones: Vec::new(),
            records: Vec::new(),
            structures: Vec::new(),
            determined: false,
        }
    }

    pub fn positive_backbones(&self) -> &[String] {
        &self.positive_backbones
    }

    pub fn negative_backbones(&self) -> &[String] {
        &self.negative_backbones
    }

    pub fn state_file_name(&self, species: &str, backbone: &str) -> String {
        format!("{species}_for_{backbone}.states")
    }

    /// Backbones a species may have state lists for: every positive backbone,
    /// plus the negative ones for negative species.
    pub fn candidate_backbones(&self, species: &str) -> Vec<&str> {
        let mut backbones: Vec<&str> = self.positive_backbones.iter().map(String::as_str).collect();
        if !self.species.is_positive(species) {
            backbones.extend(self.negative_backbones.iter().map(String::as_str));
        }
        backbones
    }

    /// Backbones for which a state-list file for `species` exists on disk.
    pub fn backbones_with_state_file(&self, species: &str) -> Vec<&str> {
        self.candidate_backbones(species)
            .into_iter()
            .filter(|bb| self.dir.join(self.state_file_name(species, bb)).is_file())
            .collect()
    }

    /// Structures a species is scored on for one backbone.
    pub fn structures_for(&self, species: &str, backbone: &str) -> Vec<&str> {
        let wanted_kind = if self.species.is_separated(species) {
            StructureKind::Separated
        } else {
            StructureKind::Complex
        };
        let own_status = self.species.mut_status(species);
        let accepts_negative = self.species.is_separated(species) || self.species.is_negative(species);

        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| r.backbone == backbone && r.kind == wanted_kind)
            .filter(|r| match &r.mut_status {
                None => true,
                Some(status) => accepts_negative && own_status == Some(status.as_str()),
            })
            .map(|r| r.file.as_str())
            .filter(|f| seen.insert(*f))
            .collect()
    }

    fn state_file_lines(&self, species: &str, backbone: &str) -> Vec<String> {
        self.structures_for(species, backbone)
            .into_iter()
            .map(|s| state_list::state_line(s, species))
            .collect()
    }

    fn add_record(
        &mut self,
        backbone: &str,
        file: &str,
        kind: StructureKind,
        mut_status: Option<&str>,
    ) {
        if !self.structures.iter().any(|s| s == file) {
            self.structures.push(file.to_string());
        }
        self.records.push(StructureRecord {
            backbone: backbone.to_string(),
            file: file.to_string(),
            kind,
            mut_status: mut_status.map(str::to_string),
        });
    }

    fn read_list(&self, name: &str) -> Result<(PathBuf, String), StateVersionError> {
        let path = self.dir.join(name);
        let content =
            std::fs::read_to_string(&path).map_err(|e| StateVersionError::io(&path, e))?;
        Ok((path, content))
    }

    /// Verifies the pair exists, synthesizing `X_sep.pdb` from `X.pdb` if needed.
    fn check_pair(
        &self,
        complex: &str,
        separated: &str,
        at: &SourceLine,
    ) -> Result<(), StateVersionError> {
        let complex_path = self.dir.join(complex);
        if !complex_path.is_file() {
            return Err(StateVersionError::MissingStructure {
                file: complex_path,
                at: at.clone(),
            });
        }
        let separated_path = self.dir.join(separated);
        if separated_path.is_file() {
            return Ok(());
        }
        if is_derived_separated_name(complex, separated) {
            debug!("Separated structure '{}' is absent; synthesizing it.", separated);
            self.separator.separate(&complex_path, &separated_path)?;
            return Ok(());
        }
        Err(StateVersionError::MissingStructure {
            file: separated_path,
            at: at.clone(),
        })
    }

    fn checked_mut_status<'d>(
        &self,
        decl: &Declaration<'d>,
        path: &Path,
    ) -> Result<&'d str, StateVersionError> {
        let status = decl.fields[0];
        let valid = self.species.valid_mut_statuses();
        if valid.contains(status) {
            Ok(status)
        } else {
            Err(StateVersionError::InvalidMutStatus {
                status: status.to_string(),
                valid: valid.into_iter().collect::<Vec<_>>().join(", "),
                at: decl.source(path),
            })
        }
    }

    fn read_positive_backbones(&mut self) -> Result<(), StateVersionError> {
        let (path, content) = self.read_list(POSITIVE_BACKBONES_FILE)?;
        for decl in lists::declarations(&content) {
            let at = decl.source(&path);
            let (Some(complex), Some(separated)) =
                (decl.keyed(1, "complex="), decl.keyed(3, "separated="))
            else {
                return Err(StateVersionError::MalformedLine {
                    expected: "<backbone> complex= <pdb> separated= <pdb>",
                    at,
                });
            };
            let backbone = decl.fields[0];
            self.check_pair(complex, separated, &at)?;

            if !self.positive_backbones.iter().any(|b| b == backbone) {
                self.positive_backbones.push(backbone.to_string());
            }
            self.add_record(backbone, complex, StructureKind::Complex, None);
            self.add_record(backbone, separated, StructureKind::Separated, None);
        }
        Ok(())
    }

    fn read_negative_backbones(&mut self) -> Result<(), StateVersionError> {
        if !self.dir.join(NEGATIVE_BACKBONES_FILE).is_file() {
            debug!("No {} in '{}'.", NEGATIVE_BACKBONES_FILE, self.dir.display());
            return Ok(());
        }
        let (path, content) = self.read_list(NEGATIVE_BACKBONES_FILE)?;
        for decl in lists::declarations(&content) {
            let at = decl.source(&path);
            let (Some(backbone), Some(complex), Some(separated)) = (
                decl.fields.get(1).copied(),
                decl.keyed(2, "complex="),
                decl.keyed(4, "separated="),
            ) else {
                return Err(StateVersionError::MalformedLine {
                    expected: "<mut_status> <backbone> complex= <pdb> separated= <pdb>",
                    at,
                });
            };
            let status = self.checked_mut_status(&decl, &path)?;
            if self.positive_backbones.iter().any(|b| b == backbone) {
                return Err(StateVersionError::BackboneCollision {
                    backbone: backbone.to_string(),
                    at,
                });
            }
            if self.negative_backbones.iter().any(|b| b == backbone) {
                return Err(StateVersionError::DuplicateBackbone {
                    backbone: backbone.to_string(),
                    at,
                });
            }
            self.check_pair(complex, separated, &at)?;

            self.negative_backbones.push(backbone.to_string());
            self.add_record(backbone, complex, StructureKind::Complex, Some(status));
            self.add_record(backbone, separated, StructureKind::Separated, Some(status));
        }
        Ok(())
    }

    fn read_negative_complexes(&mut self) -> Result<(), StateVersionError> {
        let (path, content) = self.read_list(NEGATIVE_COMPLEXES_FILE)?;
        for decl in lists::declarations(&content) {
            let at = decl.source(&path);
            let (Some(backbone), Some(complex)) =
                (decl.fields.get(1).copied(), decl.fields.get(2).copied())
            else {
                return Err(StateVersionError::MalformedLine {
                    expected: "<mut_status> <backbone> <pdb>",
                    at,
                });
            };
            let status = self.checked_mut_status(&decl, &path)?;
            let known = self.positive_backbones.iter().any(|b| b == backbone)
                || self.negative_backbones.iter().any(|b| b == backbone);
            if !known {
                return Err(StateVersionError::UnknownBackbone {
                    backbone: backbone.to_string(),
                    at,
                });
            }
            let complex_path = self.dir.join(complex);
            if !complex_path.is_file() {
                return Err(StateVersionError::MissingStructure {
                    file: complex_path,
                    at,
                });
            }
            self.add_record(backbone, complex, StructureKind::Complex, Some(status));
        }
        Ok(())
    }
}

fn is_derived_separated_name(complex: &str, separated: &str) -> bool {
    match (
        complex.strip_suffix(".pdb"),
        separated.strip_suffix(SEPARATED_SUFFIX),
    ) {
        (Some(stem), Some(sep_stem)) => !stem.is_empty() && stem == sep_stem,
        _ => false,
    }
}

impl StateVersion for IsolateBackboneStateVersion<'_> {
    fn dir(&self) -> &Path {
        &self.dir
    }

    fn determine_structures(&mut self) -> Result<(), StateVersionError> {
        if self.determined {
            return Ok(());
        }
        self.read_positive_backbones()?;
        self.read_negative_backbones()?;
        self.read_negative_complexes()?;
        self.determined = true;
        info!(
            "State version '{}': {} positive and {} negative backbones, {} structures.",
            self.dir.display(),
            self.positive_backbones.len(),
            self.negative_backbones.len(),
            self.structures.len()
        );
        Ok(())
    }

    fn structures(&self) -> &[String] {
        &self.structures
    }

    fn create_state_file_lists(&mut self) -> Result<Vec<StateListUpdate>, StateVersionError> {
        self.determine_structures()?;
        let mut updates = Vec::new();
        for species in self.species.species() {
            for backbone in self.candidate_backbones(species) {
                let path = self.dir.join(self.state_file_name(species, backbone));
                let lines = self.state_file_lines(species, backbone);
                let outcome = state_list::write_if_changed(&path, &lines)
                    .map_err(|e| StateVersionError::io(&path, e))?;
                if outcome != WriteOutcome::SkippedEmpty {
                    updates.push(StateListUpdate { path, outcome });
                }
            }
        }
        Ok(updates)
    }

    fn total_state_count(&self) -> usize {
        self.species
            .species()
            .iter()
            .map(|species| {
                self.candidate_backbones(species)
                    .into_iter()
                    .map(|bb| self.structures_for(species, bb).len())
                    .sum::<usize>()
            })
            .sum()
    }
}

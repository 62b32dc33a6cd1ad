use crate::core::species::SeparationSettings;
use nalgebra::Vector3;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SeparationError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid coordinate in columns {columns} on line {line} of '{path}' (value: '{value}')")]
    InvalidCoordinate {
        path: String,
        line: usize,
        columns: &'static str,
        value: String,
    },
    #[error("No structure separation is configured; cannot synthesize '{0}'")]
    NotConfigured(String),
}

/// Produces the "separated" counterpart of a bound complex structure.
pub trait StructureSeparator {
    /// Reads the complex at `complex` and writes its separated form to `separated`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be accessed or the complex is malformed.
    fn separate(&self, complex: &Path, separated: &Path) -> Result<(), SeparationError>;
}

/// Pulls an interface apart by rigidly translating whole chains.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainTranslation {
    chains: Vec<char>,
    offset: Vector3<f64>,
}

const X_COLUMNS: (usize, usize) = (30, 38);
const Y_COLUMNS: (usize, usize) = (38, 46);
const Z_COLUMNS: (usize, usize) = (46, 54);
const CHAIN_COLUMN: usize = 21;

impl ChainTranslation {
    pub fn new(chains: impl IntoIterator<Item = char>, offset: Vector3<f64>) -> Self {
        Self {
            chains: chains.into_iter().collect(),
            offset,
        }
    }

    pub fn from_settings(settings: &SeparationSettings) -> Self {
        Self::new(
            settings.chains.iter().filter_map(|c| c.chars().next()),
            Vector3::from(settings.offset),
        )
    }

    fn translate_line(
        &self,
        line: &str,
        number: usize,
        path: &Path,
    ) -> Result<String, SeparationError> {
        let is_atom = line.starts_with("ATOM  ") || line.starts_with("HETATM");
        let chain = line.chars().nth(CHAIN_COLUMN);
        if !is_atom
            || !line.is_ascii()
            || line.len() < Z_COLUMNS.1
            || !chain.is_some_and(|c| self.chains.contains(&c))
        {
            return Ok(line.to_string());
        }

        let read = |(start, end): (usize, usize), columns: &'static str| {
            let raw = line.get(start..end).unwrap_or("");
            raw.trim()
                .parse::<f64>()
                .map_err(|_| SeparationError::InvalidCoordinate {
                    path: path.to_string_lossy().to_string(),
                    line: number,
                    columns,
                    value: raw.to_string(),
                })
        };
        let position = Vector3::new(
            read(X_COLUMNS, "31-38")?,
            read(Y_COLUMNS, "39-46")?,
            read(Z_COLUMNS, "47-54")?,
        ) + self.offset;

        Ok(format!(
            "{}{:8.3}{:8.3}{:8.3}{}",
            &line[..X_COLUMNS.0],
            position.x,
            position.y,
            position.z,
            &line[Z_COLUMNS.1..]
        ))
    }
}

impl StructureSeparator for ChainTranslation {
    fn separate(&self, complex: &Path, separated: &Path) -> Result<(), SeparationError> {
        let content = std::fs::read_to_string(complex).map_err(|e| SeparationError::Io {
            path: complex.to_string_lossy().to_string(),
            source: e,
        })?;
        let mut out = String::with_capacity(content.len());
        for (i, line) in content.lines().enumerate() {
            out.push_str(&self.translate_line(line, i + 1, complex)?);
            out.push('\n');
        }
        std::fs::write(separated, out).map_err(|e| SeparationError::Io {
            path: separated.to_string_lossy().to_string(),
            source: e,
        })?;
        info!(
            "Synthesized separated structure '{}' from '{}'.",
            separated.display(),
            complex.display()
        );
        Ok(())
    }
}

/// Stand-in used when no separation is configured; every request fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSeparation;

impl StructureSeparator for NoSeparation {
    fn separate(&self, _complex: &Path, separated: &Path) -> Result<(), SeparationError> {
        Err(SeparationError::NotConfigured(
            separated.to_string_lossy().to_string(),
        ))
    }
}

/// The separator a species catalog's `[separation]` table asks for.
pub fn separator_for(settings: Option<&SeparationSettings>) -> Box<dyn StructureSeparator> {
    match settings {
        Some(settings) => Box::new(ChainTranslation::from_settings(settings)),
        None => Box::new(NoSeparation),
    }
}

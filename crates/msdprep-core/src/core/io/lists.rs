use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A line of a declarative input file, kept verbatim for error reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub path: PathBuf,
    pub number: usize,
    pub text: String,
}

impl fmt::Display for SourceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: \"{}\"",
            self.path.display(),
            self.number,
            self.text
        )
    }
}

/// A significant (non-blank, non-comment) line split into whitespace fields.
#[derive(Debug, Clone)]
pub struct Declaration<'a> {
    pub number: usize,
    pub text: &'a str,
    pub fields: Vec<&'a str>,
}

impl<'a> Declaration<'a> {
    pub fn source(&self, path: &Path) -> SourceLine {
        SourceLine {
            path: path.to_path_buf(),
            number: self.number,
            text: self.text.to_string(),
        }
    }

    /// Value following `key` when the field at `index` is exactly `key`.
    pub fn keyed(&self, index: usize, key: &str) -> Option<&'a str> {
        match (self.fields.get(index), self.fields.get(index + 1)) {
            (Some(k), Some(v)) if *k == key => Some(v),
            _ => None,
        }
    }
}

/// Iterates the declarations of a list file, skipping blank and `#` lines.
/// Line numbers are 1-based.
pub fn declarations(content: &str) -> impl Iterator<Item = Declaration<'_>> {
    content.lines().enumerate().filter_map(|(i, raw)| {
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            return None;
        }
        Some(Declaration {
            number: i + 1,
            text,
            fields: text.split_whitespace().collect(),
        })
    })
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Expected a number at {0}")]
    InvalidNumber(SourceLine),
}

pub fn read_to_string(path: &Path) -> Result<String, ListError> {
    std::fs::read_to_string(path).map_err(|e| ListError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Reads a weight-scan file: one number per non-empty line.
pub fn read_weights(path: &Path) -> Result<Vec<f64>, ListError> {
    let content = read_to_string(path)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.trim().parse::<f64>().map_err(|_| {
                ListError::InvalidNumber(SourceLine {
                    path: path.to_path_buf(),
                    number: i + 1,
                    text: line.trim().to_string(),
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn declarations_skip_comments_and_blank_lines() {
        let content = "# header\n\nbb1 complex= a.pdb separated= a_sep.pdb\n   \n  bb2 x\n";
        let decls: Vec<_> = declarations(content).collect();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].number, 3);
        assert_eq!(decls[0].keyed(1, "complex="), Some("a.pdb"));
        assert_eq!(decls[0].keyed(3, "separated="), Some("a_sep.pdb"));
        assert_eq!(decls[0].keyed(1, "separated="), None);
        assert_eq!(decls[1].number, 5);
        assert_eq!(decls[1].text, "bb2 x");
        assert_eq!(decls[1].keyed(1, "x"), None);
    }

    #[test]
    fn read_weights_ignores_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("w.txt");
        fs::write(&path, "1.0\n\n2.5\n").unwrap();
        assert_eq!(read_weights(&path).unwrap(), vec![1.0, 2.5]);
    }

    #[test]
    fn read_weights_names_bad_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("w.txt");
        fs::write(&path, "1.0\nten\n").unwrap();
        match read_weights(&path) {
            Err(ListError::InvalidNumber(line)) => {
                assert_eq!(line.number, 2);
                assert_eq!(line.text, "ten");
                assert_eq!(line.path, path);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

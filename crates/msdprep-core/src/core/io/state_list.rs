use std::io;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Existing content already matched byte-for-byte.
    Unchanged,
    /// Nothing to write; any existing file is left alone.
    SkippedEmpty,
    AlreadyPresent,
}

/// One state-list line: `<structure> <species>.corr <species>.2resfile`.
pub fn state_line(structure: &str, species: &str) -> String {
    format!("{structure} {species}.corr {species}.2resfile\n")
}

/// Writes `lines` only if the result differs from the current file content.
///
/// Empty `lines` never touch the disk, even if a stale file exists.
pub fn write_if_changed(path: &Path, lines: &[String]) -> io::Result<WriteOutcome> {
    if lines.is_empty() {
        return Ok(WriteOutcome::SkippedEmpty);
    }
    let content = lines.concat();
    let existing = match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };
    if existing.as_deref() == Some(content.as_bytes()) {
        debug!("State list '{}' is up to date.", path.display());
        return Ok(WriteOutcome::Unchanged);
    }
    std::fs::write(path, content)?;
    info!("Wrote state list '{}'.", path.display());
    Ok(WriteOutcome::Written)
}

/// Writes `lines` only when no file exists at `path`.
pub fn write_if_absent(path: &Path, lines: &[String]) -> io::Result<WriteOutcome> {
    if path.exists() {
        debug!("State list '{}' already exists; keeping it.", path.display());
        return Ok(WriteOutcome::AlreadyPresent);
    }
    std::fs::write(path, lines.concat())?;
    info!("Wrote state list '{}'.", path.display());
    Ok(WriteOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn second_identical_write_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("A_for_bb1.states");
        let lines = vec![state_line("x.pdb", "A"), state_line("y.pdb", "A")];

        assert_eq!(write_if_changed(&path, &lines).unwrap(), WriteOutcome::Written);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "x.pdb A.corr A.2resfile\ny.pdb A.corr A.2resfile\n"
        );
        assert_eq!(write_if_changed(&path, &lines).unwrap(), WriteOutcome::Unchanged);

        let changed = vec![state_line("z.pdb", "A")];
        assert_eq!(write_if_changed(&path, &changed).unwrap(), WriteOutcome::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "z.pdb A.corr A.2resfile\n");
    }

    #[test]
    fn empty_content_is_never_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("B_for_bb1.states");
        assert_eq!(write_if_changed(&path, &[]).unwrap(), WriteOutcome::SkippedEmpty);
        assert!(!path.exists());
    }

    #[test]
    fn write_if_absent_never_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("A.states");
        fs::write(&path, "old\n").unwrap();
        let lines = vec![state_line("x.pdb", "A")];
        assert_eq!(write_if_absent(&path, &lines).unwrap(), WriteOutcome::AlreadyPresent);
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\n");

        fs::remove_file(&path).unwrap();
        assert_eq!(write_if_absent(&path, &lines).unwrap(), WriteOutcome::Written);
    }
}

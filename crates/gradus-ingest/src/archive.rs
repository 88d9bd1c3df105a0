//! Zip archive enumeration and entry reading.
//!
//! Archives are read entirely in memory; there is no network round-trip and
//! no ref to resolve. A container that cannot be opened is a single
//! immediate failure for the whole input — there is no lower-fidelity
//! recovery for a broken central directory.

use std::io::{Cursor, Read};

use gradus_core::{CandidateFile, GradusError, Result};

/// In-memory archive backend.
#[derive(Debug)]
pub struct ArchiveSource {
    name: String,
    bytes: Vec<u8>,
}

impl ArchiveSource {
    /// Wrap archive bytes, validating that the container opens.
    ///
    /// # Errors
    ///
    /// Returns [`GradusError::InvalidArchive`] when the bytes are not a
    /// readable zip container.
    pub fn new(name: String, bytes: Vec<u8>) -> Result<Self> {
        zip::ZipArchive::new(Cursor::new(bytes.as_slice()))
            .map_err(|e| GradusError::InvalidArchive(format!("'{name}' is not a valid zip archive: {e}")))?;
        Ok(Self { name, bytes })
    }

    /// Project name derived from the archive file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enumerate every file entry in the archive, in central-directory
    /// order. Directories are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GradusError::InvalidArchive`] if an entry header cannot be
    /// read.
    pub fn list(&self) -> Result<Vec<CandidateFile>> {
        let mut container = self.open()?;
        let mut entries = Vec::new();
        for index in 0..container.len() {
            let entry = container.by_index(index).map_err(|e| {
                GradusError::InvalidArchive(format!("unreadable entry {index}: {e}"))
            })?;
            if entry.is_dir() {
                continue;
            }
            entries.push(CandidateFile {
                path: entry.name().to_string(),
                handle: None,
            });
        }
        Ok(entries)
    }

    /// Read one entry's raw bytes by path.
    ///
    /// # Errors
    ///
    /// Returns [`GradusError::InvalidArchive`] for a missing or unreadable
    /// entry; the fetcher absorbs these per file.
    pub fn read_entry(&self, path: &str) -> Result<Vec<u8>> {
        let mut container = self.open()?;
        let mut entry = container
            .by_name(path)
            .map_err(|e| GradusError::InvalidArchive(format!("missing entry '{path}': {e}")))?;
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| GradusError::InvalidArchive(format!("unreadable entry '{path}': {e}")))?;
        Ok(bytes)
    }

    fn open(&self) -> Result<zip::ZipArchive<Cursor<&[u8]>>> {
        zip::ZipArchive::new(Cursor::new(self.bytes.as_slice())).map_err(|e| {
            GradusError::InvalidArchive(format!("'{}' is not a valid zip archive: {e}", self.name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn sample_archive() -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut buffer);
        writer
            .add_directory("src/", SimpleFileOptions::default())
            .unwrap();
        writer
            .start_file("src/train.py", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"def train(): pass\n").unwrap();
        writer
            .start_file("README.md", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"# Project\n").unwrap();
        writer.finish().unwrap();
        buffer.into_inner()
    }

    #[test]
    fn lists_files_but_not_directories() {
        let source = ArchiveSource::new("proj".into(), sample_archive()).unwrap();
        let entries = source.list().unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["src/train.py", "README.md"]);
    }

    #[test]
    fn reads_entry_content() {
        let source = ArchiveSource::new("proj".into(), sample_archive()).unwrap();
        let bytes = source.read_entry("README.md").unwrap();
        assert_eq!(bytes, b"# Project\n");
    }

    #[test]
    fn missing_entry_is_an_error() {
        let source = ArchiveSource::new("proj".into(), sample_archive()).unwrap();
        assert!(source.read_entry("nope.py").is_err());
    }

    #[test]
    fn malformed_container_fails_at_construction() {
        let err = ArchiveSource::new("broken.zip".into(), b"not a zip at all".to_vec()).unwrap_err();
        assert!(matches!(err, GradusError::InvalidArchive(_)));
        assert!(err.to_string().contains("broken.zip"));
    }
}

//! Content sources: where the documents being summarized come from
//!
//! The learning core treats documents as opaque text. These sources only
//! exist to give the session something to summarize.

pub mod medical_record;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub use medical_record::MedicalRecordGenerator;

/// Produces documents to summarize
pub trait DocumentSource {
    fn generate_document(&mut self) -> Result<String>;
}

/// Serves the contents of a text file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl DocumentSource for FileSource {
    fn generate_document(&mut self) -> Result<String> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read document {}", self.path.display()))?;
        if text.trim().is_empty() {
            anyhow::bail!("Document {} is empty", self.path.display());
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "Patient is stable.\n").unwrap();

        let mut source = FileSource::new(&path);
        assert_eq!(source.generate_document().unwrap(), "Patient is stable.\n");
    }

    #[test]
    fn test_file_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut missing = FileSource::new(dir.path().join("missing.txt"));
        assert!(missing.generate_document().is_err());

        let blank = dir.path().join("blank.txt");
        std::fs::write(&blank, "  \n").unwrap();
        assert!(FileSource::new(&blank).generate_document().is_err());
    }
}

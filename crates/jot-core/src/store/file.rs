//! App-private file store

use std::fs;
use std::path::PathBuf;

use super::TextStore;
use crate::error::Result;

/// Stores the serialized collection in a single app-private file
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store backed by the given file path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path the store reads and writes
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl TextStore for FileStore {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "Note file not found, treating as empty");
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn write(&self, data: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, data)?;
        tracing::debug!(path = %self.path.display(), bytes = data.len(), "Notes saved to file");
        Ok(())
    }
}

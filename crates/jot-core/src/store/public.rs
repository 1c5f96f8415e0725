//! Shared documents-directory store

use std::path::{Path, PathBuf};

use directories::UserDirs;

use super::{FileStore, TextStore};
use crate::error::{Error, Result};

/// Stores the serialized collection in the user's public documents directory
///
/// Same read/write shape as [`FileStore`]; the file just lands somewhere
/// other apps (and the user) can see it.
pub struct PublicStore {
    inner: FileStore,
}

impl PublicStore {
    /// Store backed by `file_name` inside the user's documents directory
    pub fn in_documents(file_name: &str) -> Result<Self> {
        let dirs = UserDirs::new()
            .ok_or_else(|| Error::Storage("No home directory available".to_string()))?;
        let documents = dirs
            .document_dir()
            .map_or_else(|| dirs.home_dir().join("Documents"), Path::to_path_buf);
        Ok(Self::at(documents.join(file_name)))
    }

    /// Store backed by an explicit public path
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: FileStore::new(path),
        }
    }

    /// Path the store reads and writes
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }
}

impl TextStore for PublicStore {
    fn read(&self) -> Result<Option<String>> {
        self.inner.read()
    }

    fn write(&self, data: &str) -> Result<()> {
        self.inner.write(data)
    }
}

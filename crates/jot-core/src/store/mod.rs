//! Byte-store capability for the JSON-blob backends
//!
//! A [`TextStore`] gets one serialized collection in and out of some
//! location; the backends neither know nor care which. Variants here differ
//! only in where the bytes land.

mod file;
mod prefs;
mod public;

use std::sync::Mutex;

use crate::error::Result;

pub use file::FileStore;
pub use prefs::PrefsStore;
pub use public::PublicStore;

/// Read/write primitive consumed by the JSON-blob backends
pub trait TextStore: Send + Sync {
    /// Current stored text, or `None` if nothing was ever written
    fn read(&self) -> Result<Option<String>>;

    /// Replace the stored text wholesale
    fn write(&self, data: &str) -> Result<()>;
}

/// In-process store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Option<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with pre-existing content
    #[must_use]
    pub fn with_content(data: impl Into<String>) -> Self {
        Self {
            data: Mutex::new(Some(data.into())),
        }
    }
}

impl TextStore for MemoryStore {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.data.lock().expect("store lock poisoned").clone())
    }

    fn write(&self, data: &str) -> Result<()> {
        *self.data.lock().expect("store lock poisoned") = Some(data.to_string());
        Ok(())
    }
}

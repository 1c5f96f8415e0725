//! Key-value preferences store
//!
//! One JSON object file holding named string values, with the serialized
//! collection stored under a single key. The preferences analogue of the
//! plain file store: same bytes, different addressing.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use super::TextStore;
use crate::error::Result;

/// Stores the serialized collection as one value in a preferences file
pub struct PrefsStore {
    path: PathBuf,
    key: String,
}

impl PrefsStore {
    /// Store backed by the given preferences file, under the given key
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    fn load_map(&self) -> BTreeMap<String, String> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Preferences file unreadable, starting fresh: {error}"
                );
                BTreeMap::new()
            }
        }
    }
}

impl TextStore for PrefsStore {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.load_map().remove(&self.key))
    }

    fn write(&self, data: &str) -> Result<()> {
        let mut map = self.load_map();
        map.insert(self.key.clone(), data.to_string());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(&map)?)?;
        Ok(())
    }
}

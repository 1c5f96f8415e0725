//! Note model

use serde::{Deserialize, Serialize};

fn default_title() -> String {
    "Untitled Note".to_string()
}

fn default_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A note in the system
///
/// Notes are immutable values; an "edit" produces a new `Note` with the same
/// `id`. Persisted records written by older versions may lack a title or a
/// timestamp, so both fields are lenient on read: a missing title becomes
/// `"Untitled Note"` and a missing timestamp becomes the current time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier, monotonically assigned within a collection
    pub id: i64,
    /// Short title line
    #[serde(default = "default_title")]
    pub title: String,
    /// Body text
    pub text: String,
    /// Last-modified timestamp (Unix ms)
    #[serde(default = "default_timestamp")]
    pub timestamp: i64,
}

impl Note {
    /// Create a new note with the given id, title, and text, stamped now
    #[must_use]
    pub fn new(id: i64, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Copy of this note with new title/text and a refreshed timestamp
    #[must_use]
    pub fn edited(&self, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(self.id, title, text)
    }
}

/// Sort order for the list screen, by note timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Oldest first
    Ascending,
    /// Newest first
    #[default]
    Descending,
}

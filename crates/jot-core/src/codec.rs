//! JSON codec for note collections
//!
//! Encodes the whole collection as one JSON array. Decoding is lenient about
//! a missing `title` (defaults to "Untitled Note") and a missing `timestamp`
//! (defaults to now) so older persisted files keep loading; `id` and `text`
//! are required and anything non-JSON is a hard parse error.

use crate::error::Result;
use crate::models::Note;

/// Serialize a note collection to its persisted JSON form
pub fn notes_to_json(notes: &[Note]) -> Result<String> {
    Ok(serde_json::to_string(notes)?)
}

/// Parse a persisted JSON collection back into notes
pub fn notes_from_json(json: &str) -> Result<Vec<Note>> {
    Ok(serde_json::from_str(json)?)
}

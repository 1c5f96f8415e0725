//! Note persistence contract and backend variants
//!
//! Every backend implements the same [`NoteRepository`] contract: a
//! latest-value stream of the full collection plus add/update/delete. The
//! stream only ever carries snapshots that were durably written; a failed
//! persist leaves the published collection untouched and surfaces as a
//! recoverable error.

mod encrypted;
mod json;
mod sqlite;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Result;
use crate::models::Note;

pub use encrypted::EncryptedNoteRepository;
pub use json::JsonNoteRepository;
pub use sqlite::SqliteNoteRepository;

/// Uniform persistence contract across all backends
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Latest-value stream of the full collection, ordered by insertion
    ///
    /// New subscribers immediately see the current snapshot; every
    /// successful mutation replaces it wholesale.
    fn observe(&self) -> watch::Receiver<Vec<Note>>;

    /// Append a new note with the next free id
    async fn add_note(&self, title: &str, text: &str) -> Result<()>;

    /// Replace the note with this id, refreshing its timestamp; no-op if absent
    async fn update_note(&self, id: i64, title: &str, text: &str) -> Result<()>;

    /// Remove the note with this id; no-op if absent
    async fn delete_note(&self, id: i64) -> Result<()>;
}

/// Next id for a collection-managed backend: max existing + 1, or 1 when empty
pub(crate) fn next_note_id(notes: &[Note]) -> i64 {
    notes.iter().map(|note| note.id).max().map_or(1, |max| max + 1)
}

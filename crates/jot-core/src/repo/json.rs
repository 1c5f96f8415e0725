//! JSON-blob backend over any byte store

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use super::{next_note_id, NoteRepository};
use crate::codec;
use crate::error::Result;
use crate::models::Note;
use crate::store::TextStore;

/// Plain backend: whole collection as one JSON blob in a [`TextStore`]
///
/// Loads eagerly at construction and re-serializes everything on every
/// mutation. Fine for personal-notes collection sizes, deliberately not
/// built for more. The mutation lock serializes read-modify-write so
/// overlapping mutations never work from a stale snapshot.
pub struct JsonNoteRepository<S> {
    store: S,
    notes_tx: watch::Sender<Vec<Note>>,
    write_lock: Mutex<()>,
}

impl<S: TextStore> JsonNoteRepository<S> {
    /// Load the current collection from the store and start publishing it
    ///
    /// A missing store is an empty collection; an unparsable one is logged
    /// and also treated as empty rather than propagated.
    pub fn new(store: S) -> Self {
        let notes = match store.read() {
            Ok(Some(json)) => codec::notes_from_json(&json).unwrap_or_else(|error| {
                tracing::warn!("Persisted notes unreadable, starting empty: {error}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(error) => {
                tracing::warn!("Note store unavailable, starting empty: {error}");
                Vec::new()
            }
        };
        tracing::debug!(count = notes.len(), "Loaded note collection");
        let (notes_tx, _) = watch::channel(notes);
        Self {
            store,
            notes_tx,
            write_lock: Mutex::new(()),
        }
    }

    /// Persist the new collection, then publish it; never publishes on failure
    fn commit(&self, notes: Vec<Note>) -> Result<()> {
        let json = codec::notes_to_json(&notes)?;
        self.store.write(&json)?;
        self.notes_tx.send_replace(notes);
        Ok(())
    }
}

#[async_trait]
impl<S: TextStore> NoteRepository for JsonNoteRepository<S> {
    fn observe(&self) -> watch::Receiver<Vec<Note>> {
        self.notes_tx.subscribe()
    }

    async fn add_note(&self, title: &str, text: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut notes = self.notes_tx.borrow().clone();
        let id = next_note_id(&notes);
        notes.push(Note::new(id, title, text));
        self.commit(notes)
    }

    async fn update_note(&self, id: i64, title: &str, text: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut notes = self.notes_tx.borrow().clone();
        // Unknown id is a no-op, not an error
        let Some(position) = notes.iter().position(|note| note.id == id) else {
            return Ok(());
        };
        notes[position] = notes[position].edited(title, text);
        self.commit(notes)
    }

    async fn delete_note(&self, id: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut notes = self.notes_tx.borrow().clone();
        let before = notes.len();
        notes.retain(|note| note.id != id);
        if notes.len() == before {
            return Ok(());
        }
        self.commit(notes)
    }
}

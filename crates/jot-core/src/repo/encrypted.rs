//! Encrypted JSON-blob backend
//!
//! Same shape as the plain JSON backend, but every note's title and text go
//! through the key manager before serialization. Fields are encrypted
//! independently, each under its own nonce, so one corrupted field degrades
//! to the sentinel text while the rest of the record survives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use super::{next_note_id, NoteRepository};
use crate::error::Result;
use crate::keys::{KeyManager, DECRYPTION_ERROR};
use crate::models::Note;
use crate::store::TextStore;

/// Persisted form of one note, per-field ciphered
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptedRecord {
    id: i64,
    title_cipher: String,
    text_cipher: String,
    timestamp: i64,
}

/// Encrypted backend over any byte store
pub struct EncryptedNoteRepository<S> {
    store: S,
    keys: KeyManager,
    notes_tx: watch::Sender<Vec<Note>>,
    write_lock: Mutex<()>,
}

impl<S: TextStore> EncryptedNoteRepository<S> {
    /// Ensure the key exists, load and decrypt the collection, start publishing
    pub fn new(store: S, keys: KeyManager) -> Result<Self> {
        keys.generate_key_if_absent()?;
        let notes = Self::load(&store, &keys);
        tracing::debug!(count = notes.len(), "Loaded encrypted note collection");
        let (notes_tx, _) = watch::channel(notes);
        Ok(Self {
            store,
            keys,
            notes_tx,
            write_lock: Mutex::new(()),
        })
    }

    fn load(store: &S, keys: &KeyManager) -> Vec<Note> {
        let records: Vec<EncryptedRecord> = match store.read() {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|error| {
                tracing::warn!("Encrypted notes unreadable, starting empty: {error}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(error) => {
                tracing::warn!("Encrypted note store unavailable, starting empty: {error}");
                Vec::new()
            }
        };

        records
            .into_iter()
            .map(|record| Note {
                id: record.id,
                title: decrypt_field(keys, &record.title_cipher, record.id, "title"),
                text: decrypt_field(keys, &record.text_cipher, record.id, "text"),
                timestamp: record.timestamp,
            })
            .collect()
    }

    fn commit(&self, notes: Vec<Note>) -> Result<()> {
        let records = notes
            .iter()
            .map(|note| {
                Ok(EncryptedRecord {
                    id: note.id,
                    title_cipher: self.keys.encrypt(&note.title)?,
                    text_cipher: self.keys.encrypt(&note.text)?,
                    timestamp: note.timestamp,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.store.write(&serde_json::to_string(&records)?)?;
        self.notes_tx.send_replace(notes);
        Ok(())
    }
}

/// Decrypt one field, degrading to the sentinel on failure
fn decrypt_field(keys: &KeyManager, cipher: &str, id: i64, field: &str) -> String {
    keys.decrypt(cipher).unwrap_or_else(|error| {
        tracing::warn!(id, field, "Field failed to decrypt: {error}");
        DECRYPTION_ERROR.to_string()
    })
}

#[async_trait]
impl<S: TextStore> NoteRepository for EncryptedNoteRepository<S> {
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
        // Unknown id is a no-op; skipping commit also avoids re-ciphering
        // the whole collection for nothing
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

//! Structured-record backend over SQLite
//!
//! Unlike the JSON-blob backends this one keeps each note as its own row,
//! so mutations are true partial updates and the store assigns ids itself.
//! The published snapshot is re-queried after every change.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::sync::{watch, Mutex};

use super::NoteRepository;
use crate::error::Result;
use crate::models::Note;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    text TEXT NOT NULL,
    timestamp INTEGER NOT NULL
)";

/// `SQLite` implementation of the persistence contract
pub struct SqliteNoteRepository {
    conn: Mutex<Connection>,
    notes_tx: watch::Sender<Vec<Note>>,
}

impl SqliteNoteRepository {
    /// Open (creating if needed) a database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, [])?;
        let notes = Self::query_all(&conn)?;
        tracing::debug!(count = notes.len(), "Loaded note table");
        let (notes_tx, _) = watch::channel(notes);
        Ok(Self {
            conn: Mutex::new(conn),
            notes_tx,
        })
    }

    /// Full collection in insertion (id) order
    fn query_all(conn: &Connection) -> Result<Vec<Note>> {
        let mut stmt = conn.prepare("SELECT id, title, text, timestamp FROM notes ORDER BY id")?;
        let notes = stmt
            .query_map([], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    text: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    fn publish(&self, conn: &Connection) -> Result<()> {
        self.notes_tx.send_replace(Self::query_all(conn)?);
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for SqliteNoteRepository {
    fn observe(&self) -> watch::Receiver<Vec<Note>> {
        self.notes_tx.subscribe()
    }

    async fn add_note(&self, title: &str, text: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let now = chrono::Utc::now().timestamp_millis();
        conn.execute(
            "INSERT INTO notes (title, text, timestamp) VALUES (?, ?, ?)",
            params![title, text, now],
        )?;
        self.publish(&conn)
    }

    async fn update_note(&self, id: i64, title: &str, text: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let now = chrono::Utc::now().timestamp_millis();
        let rows = conn.execute(
            "UPDATE notes SET title = ?, text = ?, timestamp = ? WHERE id = ?",
            params![title, text, now, id],
        )?;
        // Unknown id is a no-op, not an error
        if rows == 0 {
            return Ok(());
        }
        self.publish(&conn)
    }

    async fn delete_note(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let rows = conn.execute("DELETE FROM notes WHERE id = ?", params![id])?;
        if rows == 0 {
            return Ok(());
        }
        self.publish(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_store_assigns_sequential_ids() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        repo.add_note("a", "a").await.unwrap();
        repo.add_note("b", "b").await.unwrap();
        let notes = repo.observe().borrow().clone();
        assert_eq!(notes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_autoincrement_does_not_reuse_deleted_max_id() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        repo.add_note("a", "a").await.unwrap();
        repo.add_note("b", "b").await.unwrap();
        repo.delete_note(2).await.unwrap();
        repo.add_note("c", "c").await.unwrap();
        let notes = repo.observe().borrow().clone();
        assert_eq!(notes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_update_refreshes_timestamp() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        repo.add_note("a", "a").await.unwrap();
        let before = repo.observe().borrow()[0].timestamp;
        repo.update_note(1, "edited", "edited").await.unwrap();
        let note = repo.observe().borrow()[0].clone();
        assert_eq!(note.title, "edited");
        assert!(note.timestamp >= before);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_id_are_noops() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        repo.add_note("a", "a").await.unwrap();
        let mut rx = repo.observe();
        rx.borrow_and_update();
        repo.update_note(99, "x", "y").await.unwrap();
        repo.delete_note(99).await.unwrap();
        // No-ops publish nothing
        assert!(!rx.has_changed().unwrap());
        assert_eq!(rx.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_reopen_loads_persisted_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.db");
        {
            let repo = SqliteNoteRepository::open(&path).unwrap();
            repo.add_note("persisted", "body").await.unwrap();
        }
        let repo = SqliteNoteRepository::open(&path).unwrap();
        let notes = repo.observe().borrow().clone();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "persisted");
    }

    #[tokio::test]
    async fn test_mutation_notifies_subscribers() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        let mut rx = repo.observe();
        rx.borrow_and_update();
        repo.add_note("a", "a").await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
    }
}

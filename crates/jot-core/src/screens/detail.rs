//! Detail screen: edit or delete one existing note

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::Note;
use crate::repo::NoteRepository;

/// User intents on an open note
#[derive(Debug, Clone)]
pub enum DetailIntent {
    ChangeTitle(String),
    ChangeText(String),
    UpdateNote { id: i64, title: String, text: String },
    DeleteNote { id: i64 },
}

/// Detail screen state machine
///
/// `Deleted` is terminal; a successful update returns to `Editing` with the
/// saved values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Editing { id: i64, title: String, text: String },
    Saving,
    Error(String),
    Deleted,
}

/// Handle to a running detail reducer
pub struct DetailScreen {
    intents: mpsc::UnboundedSender<DetailIntent>,
    state: watch::Receiver<DetailState>,
    task: JoinHandle<()>,
}

impl DetailScreen {
    /// Spawn the reducer, seeded with the note being opened
    #[must_use]
    pub fn spawn(repo: Arc<dyn NoteRepository>, note: &Note) -> Self {
        let (intents, intents_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(DetailState::Editing {
            id: note.id,
            title: note.title.clone(),
            text: note.text.clone(),
        });
        let task = tokio::spawn(run(repo, intents_rx, state_tx));
        Self {
            intents,
            state,
            task,
        }
    }

    /// Enqueue an intent; never blocks
    pub fn process_intent(&self, intent: DetailIntent) {
        let _ = self.intents.send(intent);
    }

    /// Latest-value state cell
    #[must_use]
    pub fn state(&self) -> watch::Receiver<DetailState> {
        self.state.clone()
    }
}

impl Drop for DetailScreen {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    repo: Arc<dyn NoteRepository>,
    mut intents: mpsc::UnboundedReceiver<DetailIntent>,
    state_tx: watch::Sender<DetailState>,
) {
    while let Some(intent) = intents.recv().await {
        // A deleted note accepts no further intents
        if *state_tx.borrow() == DetailState::Deleted {
            continue;
        }
        match intent {
            DetailIntent::ChangeTitle(title) => {
                let current = state_tx.borrow().clone();
                if let DetailState::Editing { id, text, .. } = current {
                    state_tx.send_replace(DetailState::Editing { id, title, text });
                }
            }
            DetailIntent::ChangeText(text) => {
                let current = state_tx.borrow().clone();
                if let DetailState::Editing { id, title, .. } = current {
                    state_tx.send_replace(DetailState::Editing { id, title, text });
                }
            }
            DetailIntent::UpdateNote { id, title, text } => {
                state_tx.send_replace(DetailState::Saving);
                match repo.update_note(id, &title, &text).await {
                    Ok(()) => {
                        state_tx.send_replace(DetailState::Editing { id, title, text });
                    }
                    Err(error) => {
                        tracing::error!(id, "Failed to update note: {error}");
                        state_tx
                            .send_replace(DetailState::Error(format!("Error saving note: {error}")));
                    }
                }
            }
            DetailIntent::DeleteNote { id } => {
                match repo.delete_note(id).await {
                    Ok(()) => {
                        state_tx.send_replace(DetailState::Deleted);
                    }
                    Err(error) => {
                        tracing::error!(id, "Failed to delete note: {error}");
                        state_tx.send_replace(DetailState::Error(format!(
                            "Error deleting note: {error}"
                        )));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::JsonNoteRepository;
    use crate::store::MemoryStore;

    async fn seeded() -> (Arc<JsonNoteRepository<MemoryStore>>, Note) {
        let repo = Arc::new(JsonNoteRepository::new(MemoryStore::new()));
        repo.add_note("Original", "original body").await.unwrap();
        let note = repo.observe().borrow()[0].clone();
        (repo, note)
    }

    #[tokio::test]
    async fn test_spawn_seeds_editing_from_note() {
        let (repo, note) = seeded().await;
        let screen = DetailScreen::spawn(repo, &note);
        assert_eq!(
            *screen.state().borrow(),
            DetailState::Editing {
                id: 1,
                title: "Original".to_string(),
                text: "original body".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_update_persists_and_returns_to_editing() {
        let (repo, note) = seeded().await;
        let screen = DetailScreen::spawn(Arc::clone(&repo) as Arc<dyn NoteRepository>, &note);
        screen.process_intent(DetailIntent::UpdateNote {
            id: note.id,
            title: "Edited".to_string(),
            text: "edited body".to_string(),
        });

        let mut state = screen.state();
        let state = state
            .wait_for(|s| {
                *s == DetailState::Editing {
                    id: 1,
                    title: "Edited".to_string(),
                    text: "edited body".to_string(),
                }
            })
            .await
            .unwrap()
            .clone();
        assert!(matches!(state, DetailState::Editing { .. }));

        let notes = repo.observe().borrow().clone();
        assert_eq!(notes[0].title, "Edited");
        assert_eq!(notes[0].text, "edited body");
    }

    #[tokio::test]
    async fn test_delete_reaches_deleted_and_removes_note() {
        let (repo, note) = seeded().await;
        let screen = DetailScreen::spawn(Arc::clone(&repo) as Arc<dyn NoteRepository>, &note);
        screen.process_intent(DetailIntent::DeleteNote { id: note.id });

        let mut state = screen.state();
        state
            .wait_for(|s| *s == DetailState::Deleted)
            .await
            .unwrap();
        assert!(repo.observe().borrow().iter().all(|n| n.id != note.id));
    }

    #[tokio::test]
    async fn test_deleted_is_terminal() {
        let (repo, note) = seeded().await;
        let screen = DetailScreen::spawn(Arc::clone(&repo) as Arc<dyn NoteRepository>, &note);
        screen.process_intent(DetailIntent::DeleteNote { id: note.id });
        let mut state = screen.state();
        state
            .wait_for(|s| *s == DetailState::Deleted)
            .await
            .unwrap();

        screen.process_intent(DetailIntent::ChangeTitle("ghost".to_string()));
        tokio::task::yield_now().await;
        assert_eq!(*screen.state().borrow(), DetailState::Deleted);
    }

    #[tokio::test]
    async fn test_field_edits_update_draft() {
        let (repo, note) = seeded().await;
        let screen = DetailScreen::spawn(repo, &note);
        screen.process_intent(DetailIntent::ChangeTitle("New Title".to_string()));
        screen.process_intent(DetailIntent::ChangeText("new body".to_string()));

        let mut state = screen.state();
        state
            .wait_for(|s| {
                *s == DetailState::Editing {
                    id: 1,
                    title: "New Title".to_string(),
                    text: "new body".to_string(),
                }
            })
            .await
            .unwrap();
    }

    /// Repository whose mutations always fail
    struct FailingRepo {
        _tx: watch::Sender<Vec<Note>>,
        rx: watch::Receiver<Vec<Note>>,
    }

    impl FailingRepo {
        fn new() -> Self {
            let (tx, rx) = watch::channel(Vec::new());
            Self { _tx: tx, rx }
        }
    }

    #[async_trait::async_trait]
    impl NoteRepository for FailingRepo {
        fn observe(&self) -> watch::Receiver<Vec<Note>> {
            self.rx.clone()
        }

        async fn add_note(&self, _title: &str, _text: &str) -> crate::error::Result<()> {
            Err(crate::error::Error::Storage("store offline".to_string()))
        }

        async fn update_note(
            &self,
            _id: i64,
            _title: &str,
            _text: &str,
        ) -> crate::error::Result<()> {
            Err(crate::error::Error::Storage("store offline".to_string()))
        }

        async fn delete_note(&self, _id: i64) -> crate::error::Result<()> {
            Err(crate::error::Error::Storage("store offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_update_becomes_error_state() {
        let note = Note::new(1, "t", "x");
        let screen = DetailScreen::spawn(Arc::new(FailingRepo::new()), &note);
        screen.process_intent(DetailIntent::UpdateNote {
            id: 1,
            title: "t".to_string(),
            text: "x".to_string(),
        });

        let mut state = screen.state();
        let state = state
            .wait_for(|s| matches!(s, DetailState::Error(_)))
            .await
            .unwrap()
            .clone();
        let DetailState::Error(message) = state else {
            unreachable!()
        };
        assert!(message.starts_with("Error saving note:"));
    }

    #[tokio::test]
    async fn test_failed_delete_becomes_error_state() {
        let note = Note::new(1, "t", "x");
        let screen = DetailScreen::spawn(Arc::new(FailingRepo::new()), &note);
        screen.process_intent(DetailIntent::DeleteNote { id: 1 });

        let mut state = screen.state();
        let state = state
            .wait_for(|s| matches!(s, DetailState::Error(_)))
            .await
            .unwrap()
            .clone();
        let DetailState::Error(message) = state else {
            unreachable!()
        };
        assert!(message.starts_with("Error deleting note:"));
    }
}

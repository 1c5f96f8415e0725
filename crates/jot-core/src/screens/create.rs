//! Create screen: compose and save a new note

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::repo::NoteRepository;

/// User intents while composing a note
#[derive(Debug, Clone)]
pub enum CreateIntent {
    ChangeTitle(String),
    ChangeText(String),
    SaveNote,
}

/// Create screen state machine
///
/// `Saved` and `Error` are terminal; a new screen instance starts a fresh
/// `Editing` draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateState {
    Editing { title: String, text: String },
    Saving,
    Saved,
    Error(String),
}

impl Default for CreateState {
    fn default() -> Self {
        Self::Editing {
            title: String::new(),
            text: String::new(),
        }
    }
}

/// Handle to a running create reducer
pub struct CreateScreen {
    intents: mpsc::UnboundedSender<CreateIntent>,
    state: watch::Receiver<CreateState>,
    task: JoinHandle<()>,
}

impl CreateScreen {
    /// Spawn the reducer over the given repository
    #[must_use]
    pub fn spawn(repo: Arc<dyn NoteRepository>) -> Self {
        let (intents, intents_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(CreateState::default());
        let task = tokio::spawn(run(repo, intents_rx, state_tx));
        Self {
            intents,
            state,
            task,
        }
    }

    /// Enqueue an intent; never blocks
    pub fn process_intent(&self, intent: CreateIntent) {
        let _ = self.intents.send(intent);
    }

    /// Latest-value state cell
    #[must_use]
    pub fn state(&self) -> watch::Receiver<CreateState> {
        self.state.clone()
    }
}

impl Drop for CreateScreen {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    repo: Arc<dyn NoteRepository>,
    mut intents: mpsc::UnboundedReceiver<CreateIntent>,
    state_tx: watch::Sender<CreateState>,
) {
    while let Some(intent) = intents.recv().await {
        // Only an active draft reacts to intents
        let CreateState::Editing { title, text } = state_tx.borrow().clone() else {
            continue;
        };
        match intent {
            CreateIntent::ChangeTitle(title) => {
                state_tx.send_replace(CreateState::Editing { title, text });
            }
            CreateIntent::ChangeText(text) => {
                state_tx.send_replace(CreateState::Editing { title, text });
            }
            CreateIntent::SaveNote => {
                if title.trim().is_empty() || text.trim().is_empty() {
                    state_tx.send_replace(CreateState::Error(
                        "Title and text cannot be empty".to_string(),
                    ));
                    continue;
                }
                state_tx.send_replace(CreateState::Saving);
                match repo.add_note(&title, &text).await {
                    Ok(()) => {
                        state_tx.send_replace(CreateState::Saved);
                    }
                    Err(error) => {
                        tracing::error!("Failed to save note: {error}");
                        state_tx
                            .send_replace(CreateState::Error("Failed to save note".to_string()));
                    }
                }
            }
        }
    }
}

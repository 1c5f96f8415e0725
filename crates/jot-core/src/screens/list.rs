//! List screen: search, sort, and collection-wide mutations

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::{Note, SortOrder};
use crate::repo::NoteRepository;

/// User intents on the note list
#[derive(Debug, Clone)]
pub enum ListIntent {
    AddNote { title: String, text: String },
    DeleteNote { id: i64 },
    UpdateNote { id: i64, title: String, text: String },
    SearchNotes { query: String },
    ChangeSortOrder(SortOrder),
}

/// Derived view state for the note list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListViewState {
    /// Notes after filter + sort
    pub notes: Vec<Note>,
    pub search_query: String,
    pub sort_order: SortOrder,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for ListViewState {
    fn default() -> Self {
        Self {
            notes: Vec::new(),
            search_query: String::new(),
            sort_order: SortOrder::default(),
            is_loading: true,
            error: None,
        }
    }
}

/// Handle to a running list reducer
pub struct ListScreen {
    intents: mpsc::UnboundedSender<ListIntent>,
    state: watch::Receiver<ListViewState>,
    task: JoinHandle<()>,
}

impl ListScreen {
    /// Spawn the reducer over the given repository
    #[must_use]
    pub fn spawn(repo: Arc<dyn NoteRepository>) -> Self {
        let (intents, intents_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ListViewState::default());
        let task = tokio::spawn(run(repo, intents_rx, state_tx));
        Self {
            intents,
            state,
            task,
        }
    }

    /// Enqueue an intent; never blocks
    pub fn process_intent(&self, intent: ListIntent) {
        // A dropped reducer task just means the screen is gone
        let _ = self.intents.send(intent);
    }

    /// Latest-value view state cell
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ListViewState> {
        self.state.clone()
    }
}

impl Drop for ListScreen {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    repo: Arc<dyn NoteRepository>,
    mut intents: mpsc::UnboundedReceiver<ListIntent>,
    state_tx: watch::Sender<ListViewState>,
) {
    let mut notes_rx = repo.observe();
    let mut stream_alive = true;

    // The watch already holds the initially loaded collection; surface it
    // as the first emission so subscribers leave the loading state.
    let mut all_notes = notes_rx.borrow_and_update().clone();
    publish(&state_tx, &all_notes, None);

    loop {
        tokio::select! {
            changed = notes_rx.changed(), if stream_alive => match changed {
                Ok(()) => {
                    all_notes = notes_rx.borrow_and_update().clone();
                    publish(&state_tx, &all_notes, None);
                }
                Err(_) => {
                    // Repository gone; keep the last good list visible
                    stream_alive = false;
                    tracing::warn!("Note stream closed");
                    publish(&state_tx, &all_notes, Some("Notes are no longer available".to_string()));
                }
            },
            intent = intents.recv() => {
                let Some(intent) = intent else { break };
                match intent {
                    ListIntent::AddNote { title, text } => {
                        if let Err(error) = repo.add_note(&title, &text).await {
                            tracing::error!("Failed to add note: {error}");
                            publish(&state_tx, &all_notes, Some("Failed to add note".to_string()));
                        }
                    }
                    ListIntent::DeleteNote { id } => {
                        if let Err(error) = repo.delete_note(id).await {
                            tracing::error!(id, "Failed to delete note: {error}");
                            publish(&state_tx, &all_notes, Some("Failed to delete note".to_string()));
                        }
                    }
                    ListIntent::UpdateNote { id, title, text } => {
                        if let Err(error) = repo.update_note(id, &title, &text).await {
                            tracing::error!(id, "Failed to update note: {error}");
                            publish(&state_tx, &all_notes, Some("Failed to update note".to_string()));
                        }
                    }
                    // Field update and re-derivation go out as one version so
                    // watchers never see a query or order paired with stale notes
                    ListIntent::SearchNotes { query } => {
                        state_tx.send_modify(|state| {
                            state.search_query = query;
                            refresh(state, &all_notes, None);
                        });
                    }
                    ListIntent::ChangeSortOrder(order) => {
                        state_tx.send_modify(|state| {
                            state.sort_order = order;
                            refresh(state, &all_notes, None);
                        });
                    }
                }
            }
        }
    }
}

/// Recombine the durable collection with the local UI fields
fn publish(state_tx: &watch::Sender<ListViewState>, all_notes: &[Note], error: Option<String>) {
    state_tx.send_modify(|state| refresh(state, all_notes, error));
}

fn refresh(state: &mut ListViewState, all_notes: &[Note], error: Option<String>) {
    state.notes = filter_and_sort(all_notes, &state.search_query, state.sort_order);
    state.is_loading = false;
    state.error = error;
}

/// Case-insensitive title filter, then timestamp sort
fn filter_and_sort(notes: &[Note], query: &str, order: SortOrder) -> Vec<Note> {
    let query = query.to_lowercase();
    let mut filtered: Vec<Note> = notes
        .iter()
        .filter(|note| note.title.to_lowercase().contains(&query))
        .cloned()
        .collect();
    filtered.sort_by(|a, b| match order {
        SortOrder::Ascending => a.timestamp.cmp(&b.timestamp),
        SortOrder::Descending => b.timestamp.cmp(&a.timestamp),
    });
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::JsonNoteRepository;
    use crate::store::MemoryStore;

    fn note(id: i64, title: &str, timestamp: i64) -> Note {
        Note {
            id,
            title: title.to_string(),
            text: format!("{title} body"),
            timestamp,
        }
    }

    #[test]
    fn test_filter_matches_case_insensitively() {
        let notes = vec![note(1, "Title 1", 10), note(2, "Title 2", 20), note(3, "Other", 30)];
        let filtered = filter_and_sort(&notes, "title", SortOrder::Ascending);
        assert_eq!(filtered.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_sort_orders_by_timestamp() {
        let notes = vec![note(1, "Title 1", 10), note(2, "Title 2", 20)];
        let ascending = filter_and_sort(&notes, "Title", SortOrder::Ascending);
        assert_eq!(ascending.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2]);
        let descending = filter_and_sort(&notes, "Title", SortOrder::Descending);
        assert_eq!(descending.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let notes = vec![note(1, "Title 1", 10), note(2, "Other", 20)];
        assert_eq!(filter_and_sort(&notes, "", SortOrder::Ascending).len(), 2);
    }

    async fn seeded_repo() -> Arc<dyn NoteRepository> {
        let repo = JsonNoteRepository::new(MemoryStore::new());
        repo.add_note("Title 1", "first").await.unwrap();
        repo.add_note("Title 2", "second").await.unwrap();
        repo.add_note("Other", "third").await.unwrap();
        Arc::new(repo)
    }

    #[tokio::test]
    async fn test_initial_emission_clears_loading() {
        let screen = ListScreen::spawn(seeded_repo().await);
        let mut state = screen.state();
        let state = state.wait_for(|s| !s.is_loading).await.unwrap().clone();
        assert_eq!(state.notes.len(), 3);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_search_derives_filtered_sorted_notes() {
        let screen = ListScreen::spawn(seeded_repo().await);
        screen.process_intent(ListIntent::SearchNotes {
            query: "Title".to_string(),
        });
        let mut state = screen.state();
        let state = state
            .wait_for(|s| s.search_query == "Title" && !s.is_loading)
            .await
            .unwrap()
            .clone();
        let titles: Vec<_> = state.notes.iter().map(|n| n.title.clone()).collect();
        // Default order is descending by timestamp
        assert_eq!(titles, vec!["Title 2", "Title 1"]);
    }

    #[tokio::test]
    async fn test_change_sort_order_reorders() {
        let screen = ListScreen::spawn(seeded_repo().await);
        screen.process_intent(ListIntent::SearchNotes {
            query: "Title".to_string(),
        });
        screen.process_intent(ListIntent::ChangeSortOrder(SortOrder::Ascending));
        let mut state = screen.state();
        let state = state
            .wait_for(|s| s.sort_order == SortOrder::Ascending && s.search_query == "Title")
            .await
            .unwrap()
            .clone();
        let titles: Vec<_> = state.notes.iter().map(|n| n.title.clone()).collect();
        assert_eq!(titles, vec!["Title 1", "Title 2"]);
    }

    #[tokio::test]
    async fn test_observed_states_pair_query_with_derived_notes() {
        let screen = ListScreen::spawn(seeded_repo().await);
        let mut state = screen.state();
        let all = state
            .wait_for(|s| !s.is_loading)
            .await
            .unwrap()
            .notes
            .clone();

        screen.process_intent(ListIntent::SearchNotes {
            query: "Title".to_string(),
        });
        loop {
            state.changed().await.unwrap();
            let seen = state.borrow_and_update().clone();
            // Whatever version a watcher lands on, the notes must already
            // match that version's own query and order
            assert_eq!(
                seen.notes,
                filter_and_sort(&all, &seen.search_query, seen.sort_order)
            );
            if seen.search_query == "Title" {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_add_note_intent_flows_through_repository() {
        let repo = seeded_repo().await;
        let screen = ListScreen::spawn(Arc::clone(&repo));
        screen.process_intent(ListIntent::AddNote {
            title: "Fourth".to_string(),
            text: "fourth body".to_string(),
        });
        let mut state = screen.state();
        let state = state.wait_for(|s| s.notes.len() == 4).await.unwrap().clone();
        assert!(state.notes.iter().any(|n| n.title == "Fourth"));
    }

    #[tokio::test]
    async fn test_delete_note_intent_removes_from_derived_state() {
        let repo = seeded_repo().await;
        let screen = ListScreen::spawn(Arc::clone(&repo));
        screen.process_intent(ListIntent::DeleteNote { id: 3 });
        let mut state = screen.state();
        let state = state.wait_for(|s| s.notes.len() == 2).await.unwrap().clone();
        assert!(state.notes.iter().all(|n| n.id != 3));
    }

    /// Repository whose writes always fail; the stream closes when `_tx` drops
    struct BrokenRepo {
        _tx: Option<watch::Sender<Vec<Note>>>,
        rx: watch::Receiver<Vec<Note>>,
    }

    impl BrokenRepo {
        /// Stream already closed at construction
        fn closed(notes: Vec<Note>) -> Self {
            let (tx, rx) = watch::channel(notes);
            drop(tx);
            Self { _tx: None, rx }
        }

        /// Stream stays open, only mutations fail
        fn failing_writes(notes: Vec<Note>) -> Self {
            let (tx, rx) = watch::channel(notes);
            Self { _tx: Some(tx), rx }
        }
    }

    #[async_trait::async_trait]
    impl NoteRepository for BrokenRepo {
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
    async fn test_closed_stream_keeps_last_good_list_with_error() {
        let seeded = vec![note(1, "Title 1", 10)];
        let screen = ListScreen::spawn(Arc::new(BrokenRepo::closed(seeded)));
        let mut state = screen.state();
        let state = state.wait_for(|s| s.error.is_some()).await.unwrap().clone();
        assert_eq!(state.notes.len(), 1);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_failed_mutation_becomes_error_state() {
        let screen = ListScreen::spawn(Arc::new(BrokenRepo::failing_writes(Vec::new())));
        screen.process_intent(ListIntent::AddNote {
            title: "t".to_string(),
            text: "x".to_string(),
        });
        let mut state = screen.state();
        let state = state
            .wait_for(|s| s.error.as_deref() == Some("Failed to add note"))
            .await
            .unwrap()
            .clone();
        assert!(state.notes.is_empty());
    }
}

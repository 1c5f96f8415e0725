//! Jot CLI - Pocket notes from the command line
//!
//! Thin terminal shell over the same intent reducers the graphical screens
//! use, so validation and error handling behave identically everywhere.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use jot_core::config::{build_repository, BackendKind, Config};
use jot_core::keys::{KeyManager, KeyStore, KeyringKeyStore};
use jot_core::screens::{
    CreateIntent, CreateScreen, CreateState, DetailIntent, DetailScreen, DetailState, ListIntent,
    ListScreen,
};
use jot_core::{Note, SortOrder};
use serde::Serialize;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "jot")]
#[command(about = "Pocket notes with pluggable, encrypted storage backends")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage backend (overrides config and JOT_BACKEND)
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Data directory (overrides config and JOT_DATA_DIR)
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Optional path to a JSON config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title
        title: String,
        /// Note body
        text: String,
    },
    /// List notes
    List {
        /// Filter by title (case-insensitive contains)
        #[arg(short, long)]
        search: Option<String>,
        /// Sort by timestamp
        #[arg(long, value_enum, default_value_t = SortArg::Desc)]
        sort: SortArg,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note
    Edit {
        /// Note ID
        id: i64,
        /// New title
        title: String,
        /// New body
        text: String,
    },
    /// Delete an existing note
    Delete {
        /// Note ID
        id: i64,
    },
    /// Generate the encryption key for the encrypted backend
    InitKey,
    /// Report whether the encryption key exists
    KeyStatus,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] jot_core::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    SaveRejected(String),
    #[error("Note not found for id: {0}")]
    NoteNotFound(i64),
    #[error("Screen closed before reaching a final state")]
    ScreenClosed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum BackendArg {
    File,
    Prefs,
    Public,
    Encrypted,
    Database,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::File => Self::File,
            BackendArg::Prefs => Self::Prefs,
            BackendArg::Public => Self::Public,
            BackendArg::Encrypted => Self::Encrypted,
            BackendArg::Database => Self::Database,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Asc => Self::Ascending,
            SortArg::Desc => Self::Descending,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jot=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let key_store: Arc<dyn KeyStore> = Arc::new(KeyringKeyStore::default());

    match cli.command {
        Commands::Add { title, text } => run_add(&config, key_store, title, text).await,
        Commands::List { search, sort, json } => {
            run_list(&config, key_store, search, sort.into(), json).await
        }
        Commands::Edit { id, title, text } => {
            run_edit(&config, key_store, id, title, text).await
        }
        Commands::Delete { id } => run_delete(&config, key_store, id).await,
        Commands::InitKey => run_init_key(&config, &key_store),
        Commands::KeyStatus => run_key_status(&config, key_store),
    }
}

async fn run_add(
    config: &Config,
    key_store: Arc<dyn KeyStore>,
    title: String,
    text: String,
) -> Result<(), CliError> {
    let repo = build_repository(config, key_store)?;
    let screen = CreateScreen::spawn(repo);
    screen.process_intent(CreateIntent::ChangeTitle(title));
    screen.process_intent(CreateIntent::ChangeText(text));
    screen.process_intent(CreateIntent::SaveNote);

    let mut state = screen.state();
    let state = state
        .wait_for(|s| matches!(s, CreateState::Saved | CreateState::Error(_)))
        .await
        .map_err(|_| CliError::ScreenClosed)?
        .clone();
    match state {
        CreateState::Error(message) => Err(CliError::SaveRejected(message)),
        _ => {
            println!("Note saved");
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct NoteListItem {
    id: i64,
    title: String,
    text: String,
    timestamp: i64,
}

async fn run_list(
    config: &Config,
    key_store: Arc<dyn KeyStore>,
    search: Option<String>,
    sort: SortOrder,
    json: bool,
) -> Result<(), CliError> {
    let repo = build_repository(config, key_store)?;
    let screen = ListScreen::spawn(repo);
    if let Some(query) = search.clone() {
        screen.process_intent(ListIntent::SearchNotes { query });
    }
    screen.process_intent(ListIntent::ChangeSortOrder(sort));

    let mut state = screen.state();
    let state = state
        .wait_for(|s| {
            !s.is_loading
                && s.sort_order == sort
                && s.search_query == search.clone().unwrap_or_default()
        })
        .await
        .map_err(|_| CliError::ScreenClosed)?
        .clone();

    if json {
        let items: Vec<NoteListItem> = state
            .notes
            .iter()
            .map(|note| NoteListItem {
                id: note.id,
                title: note.title.clone(),
                text: note.text.clone(),
                timestamp: note.timestamp,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if state.notes.is_empty() {
        println!("No notes found");
    } else {
        for note in &state.notes {
            println!("{:>4}  {}  {}", note.id, note.title, note.text);
        }
    }
    Ok(())
}

async fn run_edit(
    config: &Config,
    key_store: Arc<dyn KeyStore>,
    id: i64,
    title: String,
    text: String,
) -> Result<(), CliError> {
    let repo = build_repository(config, key_store)?;
    let note = find_note(&repo, id)?;
    let screen = DetailScreen::spawn(repo, &note);
    screen.process_intent(DetailIntent::UpdateNote {
        id,
        title: title.clone(),
        text: text.clone(),
    });

    // The seeded Editing state must not satisfy the wait; only the state
    // carrying the requested values proves the update went through.
    let mut state = screen.state();
    let state = state
        .wait_for(|s| edit_applied(s, &title, &text))
        .await
        .map_err(|_| CliError::ScreenClosed)?
        .clone();
    match state {
        DetailState::Error(message) => Err(CliError::SaveRejected(message)),
        _ => {
            println!("Note {id} updated");
            Ok(())
        }
    }
}

/// Final-state predicate for an edit: the new values are in place, or it failed
fn edit_applied(state: &DetailState, title: &str, text: &str) -> bool {
    match state {
        DetailState::Editing {
            title: current_title,
            text: current_text,
            ..
        } => current_title == title && current_text == text,
        DetailState::Error(_) => true,
        DetailState::Saving | DetailState::Deleted => false,
    }
}

async fn run_delete(
    config: &Config,
    key_store: Arc<dyn KeyStore>,
    id: i64,
) -> Result<(), CliError> {
    let repo = build_repository(config, key_store)?;
    let note = find_note(&repo, id)?;
    let screen = DetailScreen::spawn(repo, &note);
    screen.process_intent(DetailIntent::DeleteNote { id });

    let mut state = screen.state();
    let state = state
        .wait_for(|s| matches!(s, DetailState::Deleted | DetailState::Error(_)))
        .await
        .map_err(|_| CliError::ScreenClosed)?
        .clone();
    match state {
        DetailState::Error(message) => Err(CliError::SaveRejected(message)),
        _ => {
            println!("Note {id} deleted");
            Ok(())
        }
    }
}

fn run_init_key(config: &Config, key_store: &Arc<dyn KeyStore>) -> Result<(), CliError> {
    let keys = KeyManager::new(Arc::clone(key_store), &config.key_alias);
    keys.generate_key_if_absent()?;
    println!("Encryption key ready under alias '{}'", config.key_alias);
    Ok(())
}

fn run_key_status(config: &Config, key_store: Arc<dyn KeyStore>) -> Result<(), CliError> {
    let keys = KeyManager::new(key_store, &config.key_alias);
    if keys.is_key_generated() {
        println!("Key '{}' is present", config.key_alias);
    } else {
        println!("Key '{}' has not been generated", config.key_alias);
    }
    Ok(())
}

fn find_note(
    repo: &Arc<dyn jot_core::repo::NoteRepository>,
    id: i64,
) -> Result<Note, CliError> {
    repo.observe()
        .borrow()
        .iter()
        .find(|note| note.id == id)
        .cloned()
        .ok_or(CliError::NoteNotFound(id))
}

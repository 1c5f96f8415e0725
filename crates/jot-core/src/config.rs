//! Backend selection and repository construction
//!
//! One config struct, one constructor. The active backend is an explicit
//! value the caller owns; nothing here touches global state beyond reading
//! the two override environment variables at load time.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::{KeyManager, KeyStore};
use crate::repo::{
    EncryptedNoteRepository, JsonNoteRepository, NoteRepository, SqliteNoteRepository,
};
use crate::store::{FileStore, PrefsStore, PublicStore};

pub const BACKEND_ENV: &str = "JOT_BACKEND";
pub const DATA_DIR_ENV: &str = "JOT_DATA_DIR";

/// The available persistence backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Plain JSON file in the data directory
    #[default]
    File,
    /// JSON value inside a shared key-value preferences file
    Prefs,
    /// Plain JSON file in the user's public documents directory
    Public,
    /// Per-field AES-GCM encrypted JSON file
    Encrypted,
    /// SQLite database with store-assigned ids
    Database,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "prefs" => Ok(Self::Prefs),
            "public" => Ok(Self::Public),
            "encrypted" => Ok(Self::Encrypted),
            "database" => Ok(Self::Database),
            other => Err(Error::InvalidInput(format!("unknown backend '{other}'"))),
        }
    }
}

/// Runtime configuration, loadable from a JSON file with env overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_key_alias")]
    pub key_alias: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            data_dir: default_data_dir(),
            key_alias: default_key_alias(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "jot")
        .map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf())
}

fn default_key_alias() -> String {
    "notes".to_string()
}

impl Config {
    /// Load from an optional JSON file, then apply `JOT_BACKEND` and
    /// `JOT_DATA_DIR` from the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            _ => Self::default(),
        };
        config.apply_overrides(
            std::env::var(BACKEND_ENV).ok().as_deref(),
            std::env::var(DATA_DIR_ENV).ok().as_deref(),
        )?;
        Ok(config)
    }

    /// Apply explicit override values, typically from env or CLI flags
    pub fn apply_overrides(
        &mut self,
        backend: Option<&str>,
        data_dir: Option<&str>,
    ) -> Result<()> {
        if let Some(backend) = backend {
            self.backend = backend.parse()?;
        }
        if let Some(data_dir) = data_dir {
            self.data_dir = PathBuf::from(data_dir);
        }
        Ok(())
    }
}

/// Construct the one active repository for this configuration
pub fn build_repository(
    config: &Config,
    key_store: Arc<dyn KeyStore>,
) -> Result<Arc<dyn NoteRepository>> {
    tracing::info!(backend = ?config.backend, "Building note repository");
    let repo: Arc<dyn NoteRepository> = match config.backend {
        BackendKind::File => Arc::new(JsonNoteRepository::new(FileStore::new(
            config.data_dir.join("notes.json"),
        ))),
        BackendKind::Prefs => Arc::new(JsonNoteRepository::new(PrefsStore::new(
            config.data_dir.join("prefs.json"),
            "notes",
        ))),
        BackendKind::Public => Arc::new(JsonNoteRepository::new(PublicStore::in_documents(
            "notes.json",
        )?)),
        BackendKind::Encrypted => Arc::new(EncryptedNoteRepository::new(
            FileStore::new(config.data_dir.join("notes.enc.json")),
            KeyManager::new(key_store, &config.key_alias),
        )?),
        BackendKind::Database => {
            Arc::new(SqliteNoteRepository::open(config.data_dir.join("notes.db"))?)
        }
    };
    Ok(repo)
}

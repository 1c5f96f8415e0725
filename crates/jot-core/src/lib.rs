//! jot-core - Core library for Jot
//!
//! This crate contains the note model, the pluggable persistence backends,
//! key management for the encrypted backend, and the intent-driven screen
//! reducers shared by all Jot interfaces.

pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod models;
pub mod repo;
pub mod screens;
pub mod store;

pub use error::{Error, Result};
pub use models::{Note, SortOrder};

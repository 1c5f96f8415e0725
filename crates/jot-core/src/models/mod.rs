//! Domain models for Jot

mod note;

pub use note::{Note, SortOrder};

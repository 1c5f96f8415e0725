//! Intent-driven screen reducers
//!
//! Each screen owns an unbounded, ordered intent queue and a latest-value
//! state cell, reduced by a single task: intents go in submission order, the
//! current view state is always readable via `watch`. Repository failures
//! become error states, never task deaths. Dropping a screen handle aborts
//! its reducer; writes already dispatched to the repository complete on
//! their own.

mod create;
mod detail;
mod list;

pub use create::{CreateIntent, CreateScreen, CreateState};
pub use detail::{DetailIntent, DetailScreen, DetailState};
pub use list::{ListIntent, ListScreen, ListViewState};

//! LevelUp core data models.
//!
//! This crate defines the learner progress structures shared by the
//! storage and progress engine crates.

#![warn(missing_docs)]

// Core identities
mod id;

// Attempts and aggregate state
mod level;
mod progress;

// Re-exports
pub use id::*;

pub use level::{evaluate, Evaluation, LevelAttempt, LevelRecord, PASS_THRESHOLD};
pub use progress::{AggregateProgress, ProgressState, ProgressSummary, MAX_HEARTS};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

//! Progress Engine
//!
//! Level evaluation, learner state, local persistence, heart regeneration
//! and best-effort remote sync.

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod engine;
pub mod http;
pub mod persistence;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, RegenScope, RewardPolicy};
pub use engine::ProgressEngine;
pub use http::{HttpConfig, HttpProgressService};
pub use persistence::{AUTH_TOKEN_KEY, PROGRESS_KEY_PREFIX, REGEN_KEY};
pub use sync::{
    ProgressSubmission, RemoteLevelId, RemoteProgressService, SyncDispatcher, SyncError, SyncJob,
    SyncOutcome, SyncReport, SyncWorker,
};

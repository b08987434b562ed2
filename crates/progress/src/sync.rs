//! Best-effort mirroring of completed attempts to the remote service.
//!
//! The engine never waits on the network. It snapshots what a sync needs
//! into a [`SyncJob`] and hands it to a [`SyncDispatcher`]; a [`SyncWorker`]
//! running on the tokio runtime drains the queue one job at a time:
//!
//! ```text
//! complete_level → SyncJob → channel → SyncWorker → resolve level → submit
//! ```
//!
//! There is no retry and no read-back. A job that fails is logged and lost,
//! so the remote copy may lag behind the local one.

use async_trait::async_trait;
use levelup_core::{LevelId, LevelRecord, SyncJobId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors from the remote progress service.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response
    #[error("remote returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Response that does not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// The remote system's identifier for a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteLevelId {
    /// Numeric primary key
    Int(i64),
    /// Opaque key such as a UUID
    Text(String),
}

impl std::fmt::Display for RemoteLevelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteLevelId::Int(id) => write!(f, "{}", id),
            RemoteLevelId::Text(id) => f.write_str(id),
        }
    }
}

/// Body of a progress submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSubmission {
    /// Remote level identifier
    pub level_id: RemoteLevelId,
    /// Correct answers
    pub score: u32,
    /// Questions asked
    pub total: u32,
    /// XP awarded locally
    pub xp_earned: u32,
    /// Whether the attempt passed
    pub passed: bool,
    /// Seconds spent
    pub time_spent: u32,
}

/// Remote progress service.
#[async_trait]
pub trait RemoteProgressService: Send + Sync {
    /// Look up the remote id of a level ordinal. `None` if no level matches.
    async fn resolve_level(&self, level_id: LevelId, token: &str) -> Result<Option<RemoteLevelId>, SyncError>;

    /// Record an attempt remotely.
    async fn submit_progress(&self, token: &str, submission: &ProgressSubmission) -> Result<(), SyncError>;
}

/// Everything needed to sync one attempt, captured at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    /// Correlation id for logs
    pub id: SyncJobId,
    /// Local level ordinal
    pub level_id: LevelId,
    /// Correct answers
    pub score: u32,
    /// Questions asked
    pub total: u32,
    /// XP awarded locally
    pub xp_earned: u32,
    /// Whether the attempt passed
    pub passed: bool,
    /// Seconds spent
    pub time_spent: u32,
    /// Bearer credential as it was when the attempt was committed
    pub token: Option<String>,
}

impl SyncJob {
    /// Snapshot a committed record.
    pub fn from_record(record: &LevelRecord, time_spent: u32, token: Option<String>) -> Self {
        Self {
            id: SyncJobId::new(),
            level_id: record.level_id,
            score: record.score,
            total: record.total,
            xp_earned: record.xp_earned,
            passed: record.is_completed,
            time_spent,
            token,
        }
    }

    fn submission(&self, level_id: RemoteLevelId) -> ProgressSubmission {
        ProgressSubmission {
            level_id,
            score: self.score,
            total: self.total,
            xp_earned: self.xp_earned,
            passed: self.passed,
            time_spent: self.time_spent,
        }
    }
}

/// What happened to one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote accepted the submission
    Submitted,
    /// No credential was stored when the attempt was committed
    MissingCredential,
    /// The remote service knows no level with this ordinal
    UnresolvedLevel,
}

/// Tally of a worker's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Jobs accepted remotely
    pub submitted: usize,
    /// Jobs skipped for a missing credential or unknown level
    pub skipped: usize,
    /// Jobs lost to an error
    pub failed: usize,
}

/// Sending half handed to the engine.
#[derive(Debug, Clone)]
pub struct SyncDispatcher {
    tx: mpsc::UnboundedSender<SyncJob>,
}

impl SyncDispatcher {
    /// Queue a job. Returns false if the worker is gone.
    pub fn dispatch(&self, job: SyncJob) -> bool {
        let id = job.id;
        match self.tx.send(job) {
            Ok(()) => {
                debug!("Queued {}", id);
                true
            }
            Err(_) => {
                warn!("Sync worker stopped, dropping {}", id);
                false
            }
        }
    }
}

/// Receiving half: runs the jobs against a remote service.
pub struct SyncWorker<R: RemoteProgressService> {
    service: R,
    rx: mpsc::UnboundedReceiver<SyncJob>,
}

/// Create a connected dispatcher/worker pair.
pub fn channel<R: RemoteProgressService>(service: R) -> (SyncDispatcher, SyncWorker<R>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SyncDispatcher { tx }, SyncWorker { service, rx })
}

/// Create a pair and start the worker on the current runtime.
///
/// The returned handle resolves once every dispatcher has been dropped and
/// the queue is drained.
pub fn spawn_worker<R: RemoteProgressService + 'static>(service: R) -> (SyncDispatcher, JoinHandle<SyncReport>) {
    let (dispatcher, worker) = channel(service);
    (dispatcher, tokio::spawn(worker.run()))
}

impl<R: RemoteProgressService> SyncWorker<R> {
    /// Process jobs until all dispatchers are dropped.
    pub async fn run(mut self) -> SyncReport {
        let mut report = SyncReport::default();

        while let Some(job) = self.rx.recv().await {
            match self.process(&job).await {
                Ok(SyncOutcome::Submitted) => {
                    info!("Synced level {} ({})", job.level_id, job.id);
                    report.submitted += 1;
                }
                Ok(SyncOutcome::MissingCredential) => {
                    warn!("No auth token, skipping sync of level {} ({})", job.level_id, job.id);
                    report.skipped += 1;
                }
                Ok(SyncOutcome::UnresolvedLevel) => {
                    warn!("Remote has no level {}, skipping sync ({})", job.level_id, job.id);
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to sync level {} ({}): {}", job.level_id, job.id, e);
                    report.failed += 1;
                }
            }
        }

        debug!("Sync worker stopped: {:?}", report);
        report
    }

    /// Resolve the remote level id, then submit.
    pub async fn process(&self, job: &SyncJob) -> Result<SyncOutcome, SyncError> {
        let Some(token) = job.token.as_deref() else {
            return Ok(SyncOutcome::MissingCredential);
        };

        let Some(remote_id) = self.service.resolve_level(job.level_id, token).await? else {
            return Ok(SyncOutcome::UnresolvedLevel);
        };

        debug!("Level {} resolved to remote {}", job.level_id, remote_id);
        self.service.submit_progress(token, &job.submission(remote_id)).await?;
        Ok(SyncOutcome::Submitted)
    }
}

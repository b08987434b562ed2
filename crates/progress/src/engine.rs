//! The progress engine.

use std::sync::Arc;
use levelup_core::{
    evaluate, AggregateProgress, LevelAttempt, LevelId, LevelRecord, ProgressState,
    ProgressSummary, Time, UserId,
};
use levelup_storage::KeyValueStore;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, RegenScope, RewardPolicy};
use crate::persistence::{self, REGEN_KEY};
use crate::sync::{SyncDispatcher, SyncJob};

/// Owns one learner's progress for a session.
///
/// Every mutation commits to memory, then to the local store, and finally
/// queues a remote sync without waiting for it:
/// ```text
/// evaluate → mutate state → save locally → dispatch sync job
/// ```
/// Mutations take `&mut self`; share the engine behind a mutex if several
/// tasks need to write.
pub struct ProgressEngine<S: KeyValueStore> {
    store: Arc<S>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    sync: Option<SyncDispatcher>,
    user: Option<UserId>,
    state: ProgressState,
    /// Last regeneration as seen by this engine, used when the store cannot say
    last_regen: Option<Time>,
}

impl<S: KeyValueStore> ProgressEngine<S> {
    /// Create an unbound engine with default state.
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            config: EngineConfig::default(),
            clock: Arc::new(SystemClock),
            sync: None,
            user: None,
            state: ProgressState::default(),
            last_regen: None,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enable remote sync through `dispatcher`.
    pub fn with_sync(mut self, dispatcher: SyncDispatcher) -> Self {
        self.sync = Some(dispatcher);
        self
    }

    /// Currently bound user, if any.
    pub fn bound_user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    // === User binding ===

    /// Bind to `user`, replacing in-memory state with theirs.
    pub fn bind_user(&mut self, user: UserId) {
        self.state = persistence::load_state(&*self.store, &user);
        info!(
            "Bound progress engine to {} (xp={}, frontier={})",
            user, self.state.progress.total_xp, self.state.progress.highest_unlocked_level
        );
        self.user = Some(user);
        if self.config.regen_scope == RegenScope::PerUser {
            self.last_regen = None;
        }
    }

    /// Drop the bound user. State falls back to defaults and is no longer persisted.
    pub fn unbind_user(&mut self) {
        if let Some(user) = self.user.take() {
            info!("Unbound progress engine from {}", user);
        }
        self.state = ProgressState::default();
        if self.config.regen_scope == RegenScope::PerUser {
            self.last_regen = None;
        }
    }

    // === Mutations ===

    /// Record an attempt at `level_id`.
    pub fn complete_level(&mut self, level_id: LevelId, score: u32, total: u32, xp_award: u32) -> LevelRecord {
        self.complete_level_with(LevelAttempt::new(level_id, score, total, xp_award))
    }

    /// Record an attempt, including how long it took.
    pub fn complete_level_with(&mut self, attempt: LevelAttempt) -> LevelRecord {
        let record = self.commit_attempt(&attempt);
        self.persist();
        self.dispatch_sync(&record, attempt.time_spent);
        record
    }

    /// Apply an attempt to in-memory state only.
    fn commit_attempt(&mut self, attempt: &LevelAttempt) -> LevelRecord {
        let evaluation = evaluate(attempt.score, attempt.total);
        let level_id = attempt.level_id;
        let progress = &mut self.state.progress;

        let rewarded = match self.config.reward_policy {
            RewardPolicy::EveryPass => true,
            RewardPolicy::FirstPassOnly => !progress.has_completed(level_id),
        };

        let mut record = LevelRecord::from_attempt(attempt, evaluation, self.clock.now());

        if evaluation.passed {
            if rewarded {
                progress.record_pass(level_id, attempt.xp_award);
            } else {
                record.xp_earned = 0;
                progress.record_repeat_pass(level_id);
            }
        } else {
            progress.record_fail();
        }

        debug!(
            "Level {} scored {}% (passed={}): xp={} streak={} hearts={} frontier={}",
            level_id,
            evaluation.percentage,
            evaluation.passed,
            progress.total_xp,
            progress.current_streak,
            progress.hearts,
            progress.highest_unlocked_level
        );

        self.state.records.insert(level_id, record.clone());
        record
    }

    /// Give back one heart if the regeneration interval has elapsed.
    ///
    /// Returns whether hearts changed. The regeneration clock restarts
    /// whenever the interval has elapsed, even if hearts were already full.
    pub fn regenerate_hearts(&mut self) -> bool {
        let now = self.clock.now();
        let key = self.regen_key();

        let stored = key.as_deref().and_then(|k| persistence::read_timestamp(&*self.store, k));
        // A failed timestamp write leaves the store behind memory
        let last = match (stored, self.last_regen) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let due = match last {
            None => true,
            Some(at) => now - at > self.config.regen_interval,
        };
        if !due {
            return false;
        }

        let changed = self.state.progress.regain_heart();
        self.last_regen = Some(now);
        if let Some(k) = key.as_deref() {
            persistence::write_timestamp(&*self.store, k, now);
        }

        if changed {
            debug!("Regenerated a heart ({}/{})", self.state.progress.hearts, self.state.progress.max_hearts);
            self.persist();
        }
        changed
    }

    /// Wipe all progress for the bound user.
    pub fn reset_progress(&mut self) {
        self.state = ProgressState::default();
        info!("Reset progress for {}", self.user_label());
        self.persist();
    }

    // === Queries ===

    /// Latest attempt at `level_id`.
    pub fn level_progress(&self, level_id: LevelId) -> Option<LevelRecord> {
        self.state.records.get(&level_id).cloned()
    }

    /// Copy of the aggregate counters.
    pub fn user_progress(&self) -> AggregateProgress {
        self.state.progress.clone()
    }

    /// Whether `level_id` is at or below the unlock frontier.
    pub fn is_level_unlocked(&self, level_id: LevelId) -> bool {
        self.state.progress.is_unlocked(level_id)
    }

    /// Whether the latest attempt at `level_id` passed.
    pub fn is_level_completed(&self, level_id: LevelId) -> bool {
        self.state
            .records
            .get(&level_id)
            .map(|r| r.is_completed)
            .unwrap_or(false)
    }

    /// Percentage of the latest attempt at `level_id`, 0 if never attempted.
    pub fn level_completion_percentage(&self, level_id: LevelId) -> u32 {
        self.state
            .records
            .get(&level_id)
            .map(|r| r.percentage)
            .unwrap_or(0)
    }

    /// Aggregate counters plus per-level tallies.
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            progress: self.user_progress(),
            attempted_levels: self.state.records.len(),
            passing_levels: self.state.records.values().filter(|r| r.is_completed).count(),
        }
    }

    // === Internals ===

    fn persist(&self) {
        match &self.user {
            Some(user) => {
                persistence::save_state(&*self.store, user, &self.state);
            }
            None => debug!("No user bound, progress kept in memory only"),
        }
    }

    fn dispatch_sync(&self, record: &LevelRecord, time_spent: u32) {
        let Some(dispatcher) = &self.sync else {
            debug!("Remote sync not configured, level {} stays local", record.level_id);
            return;
        };
        let token = persistence::read_auth_token(&*self.store);
        dispatcher.dispatch(SyncJob::from_record(record, time_spent, token));
    }

    fn regen_key(&self) -> Option<String> {
        match self.config.regen_scope {
            RegenScope::Global => Some(REGEN_KEY.to_string()),
            RegenScope::PerUser => self.user.as_ref().map(persistence::user_regen_key),
        }
    }

    fn user_label(&self) -> String {
        self.user
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unbound>".to_string())
    }
}

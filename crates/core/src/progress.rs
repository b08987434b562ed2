//! Aggregate learner progress.

use std::collections::{BTreeMap, BTreeSet};
use serde::{Deserialize, Serialize};
use crate::id::LevelId;
use crate::level::LevelRecord;

/// Upper bound on hearts.
pub const MAX_HEARTS: u32 = 5;

/// Aggregate state for one learner.
///
/// `highest_unlocked_level` and `total_xp` never decrease and `hearts`
/// stays within `[0, MAX_HEARTS]`; the mutators below are the only way the
/// engine changes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateProgress {
    /// Lifetime XP
    pub total_xp: u64,

    /// Levels that have passed at least once
    pub completed_level_ids: BTreeSet<LevelId>,

    /// Successful completions counted by the engine
    pub current_streak: u32,

    /// Remaining lives
    pub hearts: u32,

    /// Fixed at [`MAX_HEARTS`]
    pub max_hearts: u32,

    /// Unlock frontier: a level is playable iff it is at or below this
    pub highest_unlocked_level: LevelId,
}

impl Default for AggregateProgress {
    fn default() -> Self {
        Self {
            total_xp: 0,
            completed_level_ids: BTreeSet::new(),
            current_streak: 0,
            hearts: MAX_HEARTS,
            max_hearts: MAX_HEARTS,
            highest_unlocked_level: LevelId::FIRST,
        }
    }
}

impl AggregateProgress {
    /// Apply the rewards of a passed attempt.
    pub fn record_pass(&mut self, level_id: LevelId, xp_award: u32) {
        self.total_xp = self.total_xp.saturating_add(u64::from(xp_award));
        self.completed_level_ids.insert(level_id);
        if level_id >= self.highest_unlocked_level {
            self.highest_unlocked_level = level_id.next();
        }
        self.current_streak = self.current_streak.saturating_add(1);
    }

    /// Apply a pass that earns no rewards: only the frontier may move.
    pub fn record_repeat_pass(&mut self, level_id: LevelId) {
        self.completed_level_ids.insert(level_id);
        if level_id >= self.highest_unlocked_level {
            self.highest_unlocked_level = level_id.next();
        }
    }

    /// Apply the penalty of a failed attempt.
    pub fn record_fail(&mut self) {
        self.hearts = self.hearts.saturating_sub(1);
    }

    /// Add one heart, up to the cap. Returns whether hearts changed.
    pub fn regain_heart(&mut self) -> bool {
        if self.hearts >= self.max_hearts {
            return false;
        }
        self.hearts += 1;
        true
    }

    /// Whether `level_id` is playable.
    pub fn is_unlocked(&self, level_id: LevelId) -> bool {
        level_id <= self.highest_unlocked_level
    }

    /// Whether `level_id` has ever passed.
    pub fn has_completed(&self, level_id: LevelId) -> bool {
        self.completed_level_ids.contains(&level_id)
    }

    /// Repair values a hand-edited or stale document may carry.
    pub fn normalize(&mut self) {
        self.max_hearts = MAX_HEARTS;
        self.hearts = self.hearts.min(self.max_hearts);
        if self.highest_unlocked_level < LevelId::FIRST {
            self.highest_unlocked_level = LevelId::FIRST;
        }
    }
}

/// Everything persisted for one learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Latest attempt per level
    #[serde(default)]
    pub records: BTreeMap<LevelId, LevelRecord>,

    /// Aggregate counters
    #[serde(default)]
    pub progress: AggregateProgress,
}

impl ProgressState {
    /// Parse a persisted document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut state: Self = serde_json::from_str(json)?;
        state.progress.normalize();
        Ok(state)
    }

    /// Serialize for the local store.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Read-only overview of a learner's standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    /// Copy of the aggregate counters
    pub progress: AggregateProgress,

    /// Levels with a recorded attempt
    pub attempted_levels: usize,

    /// Levels whose latest attempt passed
    pub passing_levels: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{evaluate, LevelAttempt};

    #[test]
    fn test_defaults() {
        let progress = AggregateProgress::default();
        assert_eq!(progress.total_xp, 0);
        assert!(progress.completed_level_ids.is_empty());
        assert_eq!(progress.current_streak, 0);
        assert_eq!(progress.hearts, 5);
        assert_eq!(progress.highest_unlocked_level, LevelId(1));
    }

    #[test]
    fn test_pass_advances_frontier_by_one() {
        let mut progress = AggregateProgress {
            highest_unlocked_level: LevelId(3),
            ..Default::default()
        };
        progress.record_pass(LevelId(3), 20);
        assert_eq!(progress.highest_unlocked_level, LevelId(4));

        // Passing a lower level leaves the frontier alone
        progress.record_pass(LevelId(1), 20);
        assert_eq!(progress.highest_unlocked_level, LevelId(4));
        assert_eq!(progress.total_xp, 40);
        assert_eq!(progress.current_streak, 2);
    }

    #[test]
    fn test_fail_never_goes_below_zero() {
        let mut progress = AggregateProgress { hearts: 0, ..Default::default() };
        progress.record_fail();
        progress.record_fail();
        assert_eq!(progress.hearts, 0);
    }

    #[test]
    fn test_regain_heart_capped() {
        let mut progress = AggregateProgress { hearts: 4, ..Default::default() };
        assert!(progress.regain_heart());
        assert!(!progress.regain_heart());
        assert_eq!(progress.hearts, MAX_HEARTS);
    }

    #[test]
    fn test_state_json_round_trip() {
        let mut state = ProgressState::default();
        let attempt = LevelAttempt::new(LevelId(2), 9, 10, 15);
        let record = LevelRecord::from_attempt(&attempt, evaluate(9, 10), chrono::Utc::now());
        state.records.insert(LevelId(2), record);
        state.progress.record_pass(LevelId(2), 15);

        let json = state.to_json().unwrap();
        let restored = ProgressState::from_json(&json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_from_json_clamps_hearts() {
        let json = r#"{"records":{},"progress":{"total_xp":5,"completed_level_ids":[],
            "current_streak":1,"hearts":42,"max_hearts":42,"highest_unlocked_level":0}}"#;
        let state = ProgressState::from_json(json).unwrap();
        assert_eq!(state.progress.hearts, MAX_HEARTS);
        assert_eq!(state.progress.highest_unlocked_level, LevelId(1));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(ProgressState::from_json("not json").is_err());
    }
}

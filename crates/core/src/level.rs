//! Level attempts and their evaluation.

use serde::{Deserialize, Serialize};
use crate::id::LevelId;
use crate::Time;

/// Minimum percentage for an attempt to count as passed.
pub const PASS_THRESHOLD: u32 = 80;

/// Outcome of scoring one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// `round(score / total * 100)`, half rounded up
    pub percentage: u32,
    /// Whether `percentage` met the pass threshold
    pub passed: bool,
}

/// Score an attempt.
///
/// A `total` of zero has no meaningful percentage and evaluates to 0%, failed.
pub fn evaluate(score: u32, total: u32) -> Evaluation {
    if total == 0 {
        return Evaluation { percentage: 0, passed: false };
    }

    // round(score * 100 / total) with half-up, kept in integers
    let score = u64::from(score);
    let total = u64::from(total);
    let percentage = (score * 200 + total) / (2 * total);
    let percentage = u32::try_from(percentage).unwrap_or(u32::MAX);

    Evaluation {
        percentage,
        passed: percentage >= PASS_THRESHOLD,
    }
}

/// Raw input of a single level attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelAttempt {
    /// Level that was played
    pub level_id: LevelId,

    /// Correct answers
    pub score: u32,

    /// Questions asked
    pub total: u32,

    /// XP granted if the attempt passes
    pub xp_award: u32,

    /// Seconds spent on the attempt, forwarded to the remote service
    pub time_spent: u32,
}

impl LevelAttempt {
    /// Create an attempt with no recorded play time.
    pub fn new(level_id: LevelId, score: u32, total: u32, xp_award: u32) -> Self {
        Self {
            level_id,
            score,
            total,
            xp_award,
            time_spent: 0,
        }
    }

    /// Set the time spent, in seconds.
    pub fn with_time_spent(mut self, seconds: u32) -> Self {
        self.time_spent = seconds;
        self
    }
}

/// The latest attempt recorded for a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRecord {
    /// Level ordinal
    pub level_id: LevelId,

    /// True only if the attempt that produced this record passed
    pub is_completed: bool,

    /// Correct answers
    pub score: u32,

    /// Questions asked
    pub total: u32,

    /// Rounded percentage
    pub percentage: u32,

    /// XP awarded by this attempt (0 when failed)
    pub xp_earned: u32,

    /// When the attempt was made, pass or fail
    pub completed_at: Time,
}

impl LevelRecord {
    /// Build the record for an evaluated attempt.
    pub fn from_attempt(attempt: &LevelAttempt, evaluation: Evaluation, at: Time) -> Self {
        Self {
            level_id: attempt.level_id,
            is_completed: evaluation.passed,
            score: attempt.score,
            total: attempt.total,
            percentage: evaluation.percentage,
            xp_earned: if evaluation.passed { attempt.xp_award } else { 0 },
            completed_at: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_threshold() {
        assert_eq!(evaluate(8, 10), Evaluation { percentage: 80, passed: true });
        assert_eq!(evaluate(7, 10), Evaluation { percentage: 70, passed: false });
        assert_eq!(evaluate(10, 10), Evaluation { percentage: 100, passed: true });
        assert_eq!(evaluate(0, 10), Evaluation { percentage: 0, passed: false });
    }

    #[test]
    fn test_evaluate_rounds_half_up() {
        // 79.5% -> 80
        assert_eq!(evaluate(159, 200).percentage, 80);
        assert!(evaluate(159, 200).passed);
        // 2/3 = 66.67% -> 67
        assert_eq!(evaluate(2, 3).percentage, 67);
        // 1/3 = 33.33% -> 33
        assert_eq!(evaluate(1, 3).percentage, 33);
        // 79.4% -> 79
        assert_eq!(evaluate(397, 500).percentage, 79);
        assert!(!evaluate(397, 500).passed);
    }

    #[test]
    fn test_evaluate_zero_total_fails() {
        let eval = evaluate(5, 0);
        assert_eq!(eval.percentage, 0);
        assert!(!eval.passed);
    }

    #[test]
    fn test_evaluate_matches_float_rounding() {
        for total in 1..=40u32 {
            for score in 0..=total {
                let expected = (score as f64 * 100.0 / total as f64 + 0.5).floor() as u32;
                let eval = evaluate(score, total);
                assert_eq!(eval.percentage, expected, "score={} total={}", score, total);
                assert_eq!(eval.passed, expected >= PASS_THRESHOLD);
            }
        }
    }

    #[test]
    fn test_record_from_failed_attempt_earns_nothing() {
        let attempt = LevelAttempt::new(LevelId(3), 7, 10, 20);
        let record = LevelRecord::from_attempt(&attempt, evaluate(7, 10), chrono::Utc::now());
        assert!(!record.is_completed);
        assert_eq!(record.xp_earned, 0);
        assert_eq!(record.percentage, 70);
    }
}

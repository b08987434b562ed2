//! Engine configuration.

use chrono::Duration;

/// Which learners share the heart regeneration clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegenScope {
    /// One timestamp for the whole device, whoever is bound
    #[default]
    Global,
    /// One timestamp per bound user
    PerUser,
}

/// How passes of an already-completed level are rewarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RewardPolicy {
    /// Every pass awards XP and extends the streak
    #[default]
    EveryPass,
    /// Only the first pass of a level awards XP and extends the streak
    FirstPassOnly,
}

/// Configuration for the progress engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum time between two regenerated hearts
    pub regen_interval: Duration,
    /// Scope of the regeneration timestamp
    pub regen_scope: RegenScope,
    /// Reward rule for repeated passes
    pub reward_policy: RewardPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            regen_interval: Duration::hours(1),
            regen_scope: RegenScope::Global,
            reward_policy: RewardPolicy::EveryPass,
        }
    }
}

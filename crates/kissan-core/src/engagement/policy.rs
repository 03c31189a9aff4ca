use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default dwell time before the daily reward is issued.
pub const DEFAULT_REWARD_THRESHOLD: Duration = Duration::from_secs(5 * 60);
/// Default spacing of threshold checks while foregrounded.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How backgrounding affects the dwell countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DwellMode {
    /// The session start survives backgrounding; elapsed time is wall-clock
    /// time since tracking began, background periods included.
    #[default]
    Cumulative,
    /// Backgrounding clears the session start; only an uninterrupted
    /// foreground stretch can earn the reward.
    Continuous,
}

/// Timing rules for the engagement reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPolicy {
    pub threshold: Duration,
    pub poll_interval: Duration,
    pub dwell_mode: DwellMode,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_REWARD_THRESHOLD,
            poll_interval: DEFAULT_POLL_INTERVAL,
            dwell_mode: DwellMode::Cumulative,
        }
    }
}

impl RewardPolicy {
    pub fn with_dwell_mode(mut self, dwell_mode: DwellMode) -> Self {
        self.dwell_mode = dwell_mode;
        self
    }

    /// Replace a zero poll interval with the default; a zero-period interval
    /// cannot be armed.
    pub fn normalized(mut self) -> Self {
        if self.poll_interval.is_zero() {
            tracing::warn!(
                default_secs = DEFAULT_POLL_INTERVAL.as_secs(),
                "zero engagement poll interval, using default"
            );
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        self
    }
}

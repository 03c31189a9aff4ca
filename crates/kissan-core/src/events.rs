use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement::TrackingState;

/// Every state change of the engagement engine produces an Event.
/// Hosts subscribe to them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TrackingStarted {
        foreground: bool,
        at: DateTime<Utc>,
    },
    /// Host went to background; polling cancelled.
    TrackingSuspended {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// Host came back to foreground; polling re-armed.
    TrackingResumed {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TrackingStopped {
        at: DateTime<Utc>,
    },
    /// Dwell threshold crossed; the reward call is being dispatched.
    RewardTriggered {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    RewardIssued {
        points: u64,
        at: DateTime<Utc>,
    },
    RewardFailed {
        reason: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TrackingState,
        elapsed_secs: Option<u64>,
        rewarded: bool,
        polling: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Snake-case name of the variant, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::TrackingStarted { .. } => "tracking_started",
            Event::TrackingSuspended { .. } => "tracking_suspended",
            Event::TrackingResumed { .. } => "tracking_resumed",
            Event::TrackingStopped { .. } => "tracking_stopped",
            Event::RewardTriggered { .. } => "reward_triggered",
            Event::RewardIssued { .. } => "reward_issued",
            Event::RewardFailed { .. } => "reward_failed",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}

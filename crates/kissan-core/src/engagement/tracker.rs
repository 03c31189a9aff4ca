//! Engagement tracker state machine.
//!
//! Like the rest of the engine's timing, the tracker has no thread or timer of
//! its own: the caller passes `now` into every operation and is responsible
//! for calling [`EngagementTracker::poll`] once per poll interval while
//! [`EngagementTracker::is_polling`] is true.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start(true)--> TrackingForeground <--lifecycle--> TrackingBackground
//!   ^                          |                                  |
//!   +------start(false)--------+----------------------------------+
//! ```

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::guard::RewardGuard;
use super::policy::{DwellMode, RewardPolicy};
use crate::events::Event;
use crate::lifecycle::LifecycleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    Idle,
    TrackingForeground,
    TrackingBackground,
}

/// Per-session bookkeeping, owned exclusively by one tracker.
#[derive(Debug, Clone, Default)]
pub struct TimerSession {
    session_start: Option<Instant>,
    /// Whether the recurring poll should currently be armed.
    polling: bool,
}

#[derive(Debug, Clone)]
pub struct EngagementTracker {
    policy: RewardPolicy,
    guard: RewardGuard,
    state: TrackingState,
    session: TimerSession,
}

impl EngagementTracker {
    pub fn new(policy: RewardPolicy, guard: RewardGuard) -> Self {
        Self {
            policy: policy.normalized(),
            guard,
            state: TrackingState::Idle,
            session: TimerSession::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn policy(&self) -> &RewardPolicy {
        &self.policy
    }

    pub fn is_polling(&self) -> bool {
        self.session.polling
    }

    pub fn is_rewarded(&self) -> bool {
        self.guard.is_claimed()
    }

    pub fn session_start(&self) -> Option<Instant> {
        self.session.session_start
    }

    /// Time since the session start, or `None` when no session is open.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.session
            .session_start
            .map(|start| now.saturating_duration_since(start))
    }

    pub fn snapshot(&self, now: Instant) -> Event {
        Event::StateSnapshot {
            state: self.state,
            elapsed_secs: self.elapsed(now).map(|d| d.as_secs()),
            rewarded: self.is_rewarded(),
            polling: self.session.polling,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Enable or disable tracking. `foreground` is the host's current
    /// lifecycle state at the moment of the call.
    pub fn start(&mut self, enabled: bool, foreground: bool, now: Instant) -> Option<Event> {
        if !enabled {
            return self.teardown();
        }
        if self.state != TrackingState::Idle {
            return None; // Already tracking.
        }

        self.session.session_start.get_or_insert(now);
        if foreground {
            self.state = TrackingState::TrackingForeground;
            self.session.polling = true;
        } else {
            self.state = TrackingState::TrackingBackground;
            self.session.polling = false;
        }
        Some(Event::TrackingStarted {
            foreground,
            at: Utc::now(),
        })
    }

    /// Feed a lifecycle notification. Only changes of foregroundedness
    /// produce an event; `Inactive -> Background` and repeats are ignored.
    pub fn on_lifecycle(&mut self, lifecycle: LifecycleState, now: Instant) -> Option<Event> {
        match (self.state, lifecycle.is_foreground()) {
            (TrackingState::TrackingForeground, false) => {
                let elapsed_secs = self.elapsed_secs(now);
                self.state = TrackingState::TrackingBackground;
                self.session.polling = false;
                if self.policy.dwell_mode == DwellMode::Continuous {
                    self.session.session_start = None;
                }
                Some(Event::TrackingSuspended {
                    elapsed_secs,
                    at: Utc::now(),
                })
            }
            (TrackingState::TrackingBackground, true) => {
                self.session.session_start.get_or_insert(now);
                self.state = TrackingState::TrackingForeground;
                self.session.polling = true;
                Some(Event::TrackingResumed {
                    elapsed_secs: self.elapsed_secs(now),
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// One poll tick. Returns `RewardTriggered` exactly once per guard, when
    /// the dwell threshold has been reached.
    pub fn poll(&mut self, now: Instant) -> Option<Event> {
        if !self.session.polling || self.guard.is_claimed() {
            return None;
        }
        let elapsed = self.elapsed(now)?;
        if elapsed < self.policy.threshold {
            return None;
        }
        if !self.guard.try_claim() {
            return None;
        }
        Some(Event::RewardTriggered {
            elapsed_secs: elapsed.as_secs(),
            at: Utc::now(),
        })
    }

    /// Return to `Idle`, dropping the session. The reward guard is untouched.
    pub fn teardown(&mut self) -> Option<Event> {
        if self.state == TrackingState::Idle {
            return None;
        }
        self.state = TrackingState::Idle;
        self.session = TimerSession::default();
        Some(Event::TrackingStopped { at: Utc::now() })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn elapsed_secs(&self, now: Instant) -> u64 {
        self.elapsed(now).map(|d| d.as_secs()).unwrap_or(0)
    }
}

mod guard;
mod policy;
mod timer;
mod tracker;

pub use guard::RewardGuard;
pub use policy::{DwellMode, RewardPolicy, DEFAULT_POLL_INTERVAL, DEFAULT_REWARD_THRESHOLD};
pub use timer::EngagementTimer;
pub use tracker::{EngagementTracker, TimerSession, TrackingState};

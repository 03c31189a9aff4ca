//! # Kissan Growth Core Library
//!
//! Core logic shared by the Kissan Growth hosts. Its centerpiece is the
//! stay-timer: a lifecycle-aware engagement timer that issues the daily
//! reward once the user has spent enough time in the app.
//!
//! ## Architecture
//!
//! - **Engagement Tracker**: A state machine over lifecycle events; the caller
//!   supplies `now` and drives `poll()`
//! - **Engagement Timer**: A tokio task that owns the tracker, the poll
//!   interval and the lifecycle subscription
//! - **Provider**: Switches the timer on and off as the user signs in and out
//! - **Storage**: TOML configuration and keyring-backed credentials
//!
//! ## Key Components
//!
//! - [`EngagementTracker`]: Core state machine
//! - [`EngagementTimer`]: Async driver with fire-and-forget reward dispatch
//! - [`EngagementProvider`]: Auth-driven session owner
//! - [`RewardService`]: Trait for the reward API, [`HttpRewardClient`] in production
//! - [`Config`]: Application configuration management

pub mod auth;
pub mod engagement;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod notify;
pub mod provider;
pub mod reward;
pub mod storage;

pub use auth::{AuthSession, AuthUser};
pub use engagement::{
    DwellMode, EngagementTimer, EngagementTracker, RewardGuard, RewardPolicy, TrackingState,
};
pub use error::{ConfigError, CoreError, RewardError};
pub use events::Event;
pub use lifecycle::{LifecycleHub, LifecycleState, Subscription};
pub use notify::{LogSink, Notification, NotificationLevel, NotificationSink};
pub use provider::EngagementProvider;
pub use reward::{HttpRewardClient, RewardPayload, RewardService};
pub use storage::Config;

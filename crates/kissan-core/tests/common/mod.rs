//! Shared fakes for kissan-core integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kissan_core::{Notification, NotificationSink, RewardError, RewardPayload, RewardService};
use parking_lot::Mutex;

/// Reward service that counts calls and either succeeds or fails.
pub struct MockReward {
    calls: AtomicUsize,
    fail: bool,
}

impl MockReward {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RewardService for MockReward {
    async fn issue_daily_reward(&self) -> Result<RewardPayload, RewardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(RewardError::Rejected("server busy".into()))
        } else {
            Ok(RewardPayload {
                points: 150,
                message: Some("Stay reward credited".into()),
            })
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}

/// Sleep on the (paused) tokio clock.
pub async fn advance_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

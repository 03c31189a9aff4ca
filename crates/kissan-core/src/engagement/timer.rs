//! Async driver for [`EngagementTracker`].
//!
//! One tokio task owns the tracker, the poll [`Interval`] and the lifecycle
//! [`Subscription`]; everything else talks to it through channels. Dropping
//! the interval is how polling is cancelled.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::guard::RewardGuard;
use super::policy::RewardPolicy;
use super::tracker::EngagementTracker;
use crate::events::Event;
use crate::lifecycle::{LifecycleHub, LifecycleState, Subscription};
use crate::notify::{Notification, NotificationSink};
use crate::reward::RewardService;

const EVENT_CAPACITY: usize = 64;

enum Control {
    Enable(bool),
    Snapshot(oneshot::Sender<Event>),
    Shutdown,
}

/// Handle to a running engagement timer.
///
/// Must be created inside a tokio runtime. Dropping the handle tears the
/// timer down; use [`shutdown`](Self::shutdown) to also wait for it.
pub struct EngagementTimer {
    control: mpsc::UnboundedSender<Control>,
    events: broadcast::Sender<Event>,
    task: Option<JoinHandle<()>>,
}

impl EngagementTimer {
    pub fn spawn(
        policy: RewardPolicy,
        guard: RewardGuard,
        lifecycle: LifecycleHub,
        reward: Arc<dyn RewardService>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (control, control_rx) = mpsc::unbounded_channel();
        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let driver = Driver {
            tracker: EngagementTracker::new(policy, guard),
            lifecycle,
            lifecycle_tx,
            lifecycle_rx,
            subscription: None,
            control_rx,
            poll: None,
            events: events.clone(),
            reward,
            sink,
        };

        Self {
            control,
            events,
            task: Some(tokio::spawn(driver.run())),
        }
    }

    /// Enable tracking when `enabled` (an authenticated user is present),
    /// otherwise tear down to idle.
    pub fn start(&self, enabled: bool) {
        let _ = self.control.send(Control::Enable(enabled));
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    /// Current state, or `None` if the driver has already stopped.
    pub async fn snapshot(&self) -> Option<Event> {
        let (tx, rx) = oneshot::channel();
        self.control.send(Control::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    /// Tear down and wait for the driver task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.control.send(Control::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "engagement timer task ended abnormally");
            }
        }
    }
}

impl Drop for EngagementTimer {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Shutdown);
    }
}

struct Driver {
    tracker: EngagementTracker,
    lifecycle: LifecycleHub,
    lifecycle_tx: mpsc::UnboundedSender<LifecycleState>,
    lifecycle_rx: mpsc::UnboundedReceiver<LifecycleState>,
    /// Held only while tracking is enabled.
    subscription: Option<Subscription>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    /// The recurring poll; `Some` exactly while the tracker is polling.
    poll: Option<Interval>,
    events: broadcast::Sender<Event>,
    reward: Arc<dyn RewardService>,
    sink: Arc<dyn NotificationSink>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                control = self.control_rx.recv() => match control {
                    Some(Control::Enable(enabled)) => self.set_enabled(enabled),
                    Some(Control::Snapshot(reply)) => {
                        let _ = reply.send(self.tracker.snapshot(Instant::now()));
                    }
                    Some(Control::Shutdown) | None => break,
                },
                Some(state) = self.lifecycle_rx.recv() => {
                    tracing::debug!(?state, "lifecycle transition");
                    let event = self.tracker.on_lifecycle(state, Instant::now());
                    self.sync_poll();
                    self.publish(event);
                }
                _ = next_tick(&mut self.poll) => self.on_tick(),
            }
        }
        self.set_enabled(false);
    }

    fn set_enabled(&mut self, enabled: bool) {
        if enabled && self.subscription.is_none() {
            let tx = self.lifecycle_tx.clone();
            self.subscription = Some(self.lifecycle.subscribe(move |state| {
                let _ = tx.send(state);
            }));
        }

        let foreground = self.lifecycle.current().is_foreground();
        let event = self.tracker.start(enabled, foreground, Instant::now());

        if !enabled {
            self.subscription = None;
            // Transitions queued before teardown must not leak into the next session.
            while self.lifecycle_rx.try_recv().is_ok() {}
        }
        self.sync_poll();

        if let Some(ref event) = event {
            match event {
                Event::TrackingStarted { foreground, .. } => {
                    tracing::info!(foreground, "engagement tracking started")
                }
                Event::TrackingStopped { .. } => tracing::info!("engagement tracking stopped"),
                _ => {}
            }
        }
        self.publish(event);
    }

    fn on_tick(&mut self) {
        let now = Instant::now();
        tracing::debug!(
            elapsed_secs = ?self.tracker.elapsed(now).map(|d| d.as_secs()),
            "engagement poll"
        );
        let event = self.tracker.poll(now);
        if let Some(Event::RewardTriggered { elapsed_secs, .. }) = event {
            tracing::info!(elapsed_secs, "engagement threshold reached, issuing reward");
            self.dispatch_reward();
        }
        self.publish(event);
    }

    /// Arm or release the poll interval to match the tracker.
    fn sync_poll(&mut self) {
        match (self.tracker.is_polling(), self.poll.is_some()) {
            (true, false) => {
                let period = self.tracker.policy().poll_interval;
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.poll = Some(interval);
            }
            (false, true) => self.poll = None,
            _ => {}
        }
    }

    /// Fire-and-forget: the outcome goes to the sink and the event stream,
    /// never back into the tracker.
    fn dispatch_reward(&self) {
        let reward = Arc::clone(&self.reward);
        let sink = Arc::clone(&self.sink);
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match reward.issue_daily_reward().await {
                Ok(payload) => {
                    tracing::info!(points = payload.points, "daily engagement reward issued");
                    sink.notify(Notification::reward_issued(payload.points, payload.message));
                    Event::RewardIssued {
                        points: payload.points,
                        at: Utc::now(),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "daily engagement reward failed");
                    sink.notify(Notification::reward_failed(e.to_string()));
                    Event::RewardFailed {
                        reason: e.to_string(),
                        at: Utc::now(),
                    }
                }
            };
            let _ = events.send(event);
        });
    }

    fn publish(&self, event: Option<Event>) {
        if let Some(event) = event {
            // No receivers is fine.
            let _ = self.events.send(event);
        }
    }
}

async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

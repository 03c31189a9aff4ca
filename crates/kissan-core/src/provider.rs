//! Session-level owner of the engagement timer.
//!
//! Mounted once per application session. It follows the authenticated-user
//! record and switches the timer on and off; a change of user restarts the
//! countdown. The reward guard belongs to the provider, so no sequence of
//! sign-ins earns more than one reward per process.

use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use crate::auth::AuthSession;
use crate::engagement::{EngagementTimer, RewardGuard, RewardPolicy};
use crate::events::Event;
use crate::lifecycle::LifecycleHub;
use crate::notify::NotificationSink;
use crate::reward::RewardService;

pub struct EngagementProvider {
    guard: RewardGuard,
    events: broadcast::Sender<Event>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl EngagementProvider {
    /// Must be called inside a tokio runtime.
    ///
    /// The provider keeps its own `auth` handle until unmounted, so the host
    /// may drop its copies without ending tracking for a signed-in user.
    pub fn mount(
        policy: RewardPolicy,
        auth: AuthSession,
        lifecycle: LifecycleHub,
        reward: Arc<dyn RewardService>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let guard = RewardGuard::new();
        let timer = EngagementTimer::spawn(policy, guard.clone(), lifecycle, reward, sink);
        let events = timer.event_sender();
        let (shutdown, shutdown_rx) = oneshot::channel();

        Self {
            guard,
            events,
            shutdown: Some(shutdown),
            task: Some(tokio::spawn(follow_auth(timer, auth, shutdown_rx))),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn is_rewarded(&self) -> bool {
        self.guard.is_claimed()
    }

    /// Tear down the timer and wait for it to stop.
    pub async fn unmount(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "engagement provider task ended abnormally");
            }
        }
    }
}

impl Drop for EngagementProvider {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn follow_auth(
    timer: EngagementTimer,
    auth: AuthSession,
    mut shutdown: oneshot::Receiver<()>,
) {
    // `auth` lives as long as this task, so the channel stays open even after
    // the host drops its own handles.
    let mut users = auth.subscribe();

    let mut current_user = users.borrow_and_update().as_ref().map(|u| u.user_id.clone());
    timer.start(current_user.is_some());

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = users.changed() => {
                if changed.is_err() {
                    break;
                }
                let next_user = users.borrow_and_update().as_ref().map(|u| u.user_id.clone());
                if current_user.is_some() && next_user.is_some() && current_user != next_user {
                    tracing::info!("signed-in user changed, restarting engagement tracking");
                    timer.start(false);
                }
                timer.start(next_user.is_some());
                current_user = next_user;
            }
        }
    }

    timer.shutdown().await;
}

//! Application lifecycle notifications.
//!
//! The host (mobile shell, desktop window, CLI stdin reader) reports
//! foreground/background transitions through a [`LifecycleHub`]. Consumers
//! register a callback and receive a [`Subscription`] token; dropping the
//! token unregisters the callback.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Active,
    Inactive,
    Background,
}

impl LifecycleState {
    /// Only `Active` counts as foregrounded; `Inactive` (e.g. the app
    /// switcher is open) is treated like background.
    pub fn is_foreground(self) -> bool {
        matches!(self, LifecycleState::Active)
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "foreground" => Ok(LifecycleState::Active),
            "inactive" => Ok(LifecycleState::Inactive),
            "background" => Ok(LifecycleState::Background),
            other => Err(format!("unknown lifecycle state: {other}")),
        }
    }
}

type Callback = Box<dyn Fn(LifecycleState) + Send + Sync>;

struct Registry {
    current: LifecycleState,
    callbacks: BTreeMap<u64, Arc<Callback>>,
}

/// Fan-out point for lifecycle transitions.
///
/// Cloning the hub yields another handle onto the same registry.
#[derive(Clone)]
pub struct LifecycleHub {
    inner: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl LifecycleHub {
    /// Create a hub. The host is assumed to be foregrounded at launch.
    pub fn new() -> Self {
        Self::with_state(LifecycleState::Active)
    }

    pub fn with_state(initial: LifecycleState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                current: initial,
                callbacks: BTreeMap::new(),
            })),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Last state reported by the host.
    pub fn current(&self) -> LifecycleState {
        self.inner.lock().current
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().callbacks.len()
    }

    /// Register `callback` for every subsequent [`emit`](Self::emit).
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(LifecycleState) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .lock()
            .callbacks
            .insert(id, Arc::new(Box::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Record `state` and deliver it to every live subscriber.
    pub fn emit(&self, state: LifecycleState) {
        // Callbacks run outside the lock so they may subscribe or unsubscribe.
        let callbacks: Vec<Arc<Callback>> = {
            let mut registry = self.inner.lock();
            registry.current = state;
            registry.callbacks.values().cloned().collect()
        };
        for callback in callbacks {
            callback(state);
        }
    }
}

impl Default for LifecycleHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Unsubscribe token returned by [`LifecycleHub::subscribe`].
#[must_use = "dropping the subscription unregisters the callback"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().callbacks.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn only_active_is_foreground() {
        assert!(LifecycleState::Active.is_foreground());
        assert!(!LifecycleState::Inactive.is_foreground());
        assert!(!LifecycleState::Background.is_foreground());
    }

    #[test]
    fn parses_host_state_names() {
        assert_eq!("active".parse::<LifecycleState>(), Ok(LifecycleState::Active));
        assert_eq!(" Background ".parse::<LifecycleState>(), Ok(LifecycleState::Background));
        assert!("paused".parse::<LifecycleState>().is_err());
    }

    #[test]
    fn emit_reaches_subscribers_and_updates_current() {
        let hub = LifecycleHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = hub.subscribe(move |state| sink.lock().push(state));

        hub.emit(LifecycleState::Background);
        hub.emit(LifecycleState::Active);

        assert_eq!(
            *seen.lock(),
            vec![LifecycleState::Background, LifecycleState::Active]
        );
        assert_eq!(hub.current(), LifecycleState::Active);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let hub = LifecycleHub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = hub.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hub.subscriber_count(), 1);

        hub.emit(LifecycleState::Inactive);
        sub.unsubscribe();
        hub.emit(LifecycleState::Active);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn subscription_outliving_hub_is_harmless() {
        let hub = LifecycleHub::new();
        let sub = hub.subscribe(|_| {});
        drop(hub);
        drop(sub);
    }
}

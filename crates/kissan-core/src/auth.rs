//! Authenticated-user record shared across the app.
//!
//! The engagement provider watches this to decide whether tracking runs; the
//! reward client reads the access token from it at call time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub access_token: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Cloneable handle onto the current user (or `None` when signed out).
#[derive(Debug, Clone)]
pub struct AuthSession {
    tx: Arc<watch::Sender<Option<AuthUser>>>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::from_user(None)
    }

    pub fn from_user(user: Option<AuthUser>) -> Self {
        let (tx, _rx) = watch::channel(user);
        Self { tx: Arc::new(tx) }
    }

    pub fn sign_in(&self, user: AuthUser) {
        self.tx.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|u| u.access_token.clone())
    }

    /// Receiver that wakes on every change of the user record.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.tx.subscribe()
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

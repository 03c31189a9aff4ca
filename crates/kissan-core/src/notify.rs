//! User-facing notifications (the app's toasts).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    /// Updated point total, when the notification reports a reward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u64>,
}

impl Notification {
    pub fn reward_issued(points: u64, message: Option<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: "Daily reward".into(),
            message: message.unwrap_or_else(|| format!("You earned points! Balance: {points}")),
            points: Some(points),
        }
    }

    pub fn reward_failed(reason: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: "Daily reward".into(),
            message: reason.into(),
            points: None,
        }
    }
}

/// Destination for notifications. Implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Sink that only writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => tracing::info!(
                title = %notification.title,
                points = ?notification.points,
                "{}",
                notification.message
            ),
            NotificationLevel::Error => {
                tracing::warn!(title = %notification.title, "{}", notification.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_issued_falls_back_to_balance_message() {
        let n = Notification::reward_issued(120, None);
        assert_eq!(n.level, NotificationLevel::Success);
        assert_eq!(n.points, Some(120));
        assert!(n.message.contains("120"));
    }

    #[test]
    fn failure_omits_points_in_json() {
        let json = serde_json::to_value(Notification::reward_failed("offline")).unwrap();
        assert_eq!(json["level"], "error");
        assert!(json.get("points").is_none());
    }
}

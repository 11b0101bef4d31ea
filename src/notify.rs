use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use ts_rs::TS;
use utoipa::ToSchema;

/// NotificationColor
///
/// Severity of a user-facing notification, rendered by the client as a colored toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NotificationColor {
    Green,
    Orange,
    Red,
}

/// Notification
///
/// A message raised by a guard. When `translate` is set, `text` is an i18n key the
/// client resolves; otherwise it is shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Notification {
    pub color: NotificationColor,
    pub text: String,
    pub translate: bool,
}

impl Notification {
    pub fn message(color: NotificationColor, key: &str) -> Self {
        Self {
            color,
            text: key.to_string(),
            translate: true,
        }
    }

    pub fn text(color: NotificationColor, text: impl Into<String>) -> Self {
        Self {
            color,
            text: text.into(),
            translate: false,
        }
    }
}

/// Notifier
///
/// Sink the guards push notifications into.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Collects everything raised during one transition.
#[derive(Default)]
pub struct CollectingNotifier {
    raised: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn into_notifications(self) -> Vec<Notification> {
        self.raised
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!(color = ?notification.color, text = %notification.text, "notification raised");
        self.raised
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

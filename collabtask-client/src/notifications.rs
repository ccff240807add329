/// Locally displayed notifications
///
/// Every pushed notice lands in two lists:
///
/// - the **panel**, newest first, kept until the user clears it
/// - the **toasts**, newest first, all dismissed together once
///   [`TOAST_TTL`] has passed without a new arrival
///
/// ```text
/// received ──► toast visible ──(5 s quiet)──► toast expired
///     └──────► panel listed ──(clear)──► cleared
/// ```
///
/// Toast expiry is evaluated against the tokio clock when the toasts are
/// read, so paused-time tests can drive it with `tokio::time::advance`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

pub const TOAST_TTL: Duration = Duration::from_secs(5);

const DEFAULT_MESSAGE: &str = "New task assigned";

/// A notification as shown by this client
///
/// IDs and timestamps are generated locally; they are unrelated to the
/// persisted notification records on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalNotification {
    pub id: Uuid,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct NotificationCenter {
    panel: Vec<LocalNotification>,
    toasts: Vec<LocalNotification>,
    toasts_expire_at: Option<Instant>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a notice in the panel and the toasts
    ///
    /// Each arrival restarts the toast timer.
    pub fn push(&mut self, message: &str) -> LocalNotification {
        let message = if message.trim().is_empty() {
            DEFAULT_MESSAGE
        } else {
            message
        };

        let notification = LocalNotification {
            id: Uuid::new_v4(),
            message: message.to_string(),
            received_at: Utc::now(),
        };

        self.expire_toasts();
        self.panel.insert(0, notification.clone());
        self.toasts.insert(0, notification.clone());
        self.toasts_expire_at = Some(Instant::now() + TOAST_TTL);

        notification
    }

    pub fn panel(&self) -> &[LocalNotification] {
        &self.panel
    }

    pub fn clear_panel(&mut self) {
        self.panel.clear();
    }

    /// Toasts still on screen
    pub fn toasts(&mut self) -> &[LocalNotification] {
        self.expire_toasts();
        &self.toasts
    }

    /// When the visible toasts disappear, if any are visible
    pub fn toasts_expire_at(&mut self) -> Option<Instant> {
        self.expire_toasts();
        self.toasts_expire_at
    }

    fn expire_toasts(&mut self) {
        if matches!(self.toasts_expire_at, Some(deadline) if Instant::now() >= deadline) {
            self.toasts.clear();
            self.toasts_expire_at = None;
        }
    }
}

//! Transient toast notifications.

use std::time::Duration;
use tokio::time::Instant;

/// How long a notification stays fully visible
pub const DISPLAY_DURATION: Duration = Duration::from_secs(3);
/// Shorter display for minor confirmations such as copying a CID
pub const BRIEF_DISPLAY_DURATION: Duration = Duration::from_secs(2);
/// Fade-out appended to every display duration
pub const FADE_DURATION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Notifications currently on screen, oldest first.
#[derive(Debug, Default)]
pub struct Notifications {
    next_id: u64,
    active: Vec<Notification>,
}

impl Notifications {
    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        self.push_for(kind, message, DISPLAY_DURATION)
    }

    pub fn push_for(&mut self, kind: NotificationKind, message: impl Into<String>, display: Duration) -> u64 {
        self.next_id += 1;
        self.active.push(Notification {
            id: self.next_id,
            kind,
            message: message.into(),
            expires_at: Instant::now() + display + FADE_DURATION,
        });
        self.next_id
    }

    /// Drop expired notifications and return the rest.
    pub fn current(&mut self) -> &[Notification] {
        let now = Instant::now();
        self.active.retain(|n| n.expires_at > now);
        &self.active
    }
}

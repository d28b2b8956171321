//! Notification history shown in the top bar popup and on the dashboard.

use crate::error::WorkflowError;
use std::collections::VecDeque;

/// Entries beyond this are dropped oldest-first
pub const MAX_NOTIFICATIONS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

impl NotificationLevel {
    pub fn tag(self) -> &'static str {
        match self {
            NotificationLevel::Info => "[--]",
            NotificationLevel::Success => "[OK]",
            NotificationLevel::Error => "[!!]",
        }
    }
}

/// A notification entry with message and timestamp
#[derive(Clone)]
pub struct NotificationEntry {
    pub message: String,
    pub level: NotificationLevel,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl NotificationEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_level(message, NotificationLevel::Info)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::with_level(message, NotificationLevel::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(message, NotificationLevel::Error)
    }

    fn with_level(message: impl Into<String>, level: NotificationLevel) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp: chrono::Local::now(),
        }
    }

    pub fn time_ago(&self) -> String {
        let now = chrono::Local::now();
        let duration = now.signed_duration_since(self.timestamp);
        if duration.num_seconds() < 60 {
            "just now".to_string()
        } else if duration.num_minutes() < 60 {
            format!("{}m ago", duration.num_minutes())
        } else if duration.num_hours() < 24 {
            format!("{}h ago", duration.num_hours())
        } else {
            self.timestamp.format("%m/%d %H:%M").to_string()
        }
    }
}

/// Append an entry, trimming the history to [`MAX_NOTIFICATIONS`].
pub fn push_notification(notifications: &mut VecDeque<NotificationEntry>, entry: NotificationEntry) {
    notifications.push_back(entry);
    while notifications.len() > MAX_NOTIFICATIONS {
        notifications.pop_front();
    }
}

/// Short notification text for a failed workflow action
pub fn failure_notice(action: &str, error: &WorkflowError) -> NotificationEntry {
    let text = error.to_string();
    let short = match text.char_indices().nth(80) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    };
    NotificationEntry::error(format!("{} failed: {}", action, short))
}

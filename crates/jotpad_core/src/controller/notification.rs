//! Transient user feedback.

use serde::Serialize;

pub const MSG_EMPTY_NOTE: &str = "Note cannot be empty!";
pub const MSG_NOTE_SAVED: &str = "Note saved successfully!";
pub const MSG_SAVE_FAILED: &str = "Error saving note. Please try again.";
pub const MSG_NOTE_DELETED: &str = "Note deleted!";
pub const MSG_DELETE_FAILED: &str = "Error deleting note. Please try again.";
pub const MSG_LOAD_FAILED: &str = "Error loading notes.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// One toast-style message for the notification surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// The user can repeat the same action and expect it may succeed.
    pub retryable: bool,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn error(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            retryable,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

//! Transient user-visible notifications.
//!
//! Operations report their outcome as a [`Notification`]; the front end
//! decides how to show it. The CLI prints them, tests collect them.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::CoachResult;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A short message shown to the user after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title, description)
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title, description)
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, title, description)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warn",
            NotificationLevel::Error => "error",
        };
        if self.description.is_empty() {
            write!(f, "[{}] {}", tag, self.title)
        } else {
            write!(f, "[{}] {} {}", tag, self.title, self.description)
        }
    }
}

/// Sink for notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Prints notifications to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        eprintln!("{}", notification);
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().expect("lock not poisoned").clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.seen.lock().expect("lock not poisoned").last().cloned()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .expect("lock not poisoned")
            .push(notification);
    }
}

/// Logs and notifies the error of a failed operation, passing the result on.
pub fn surface<T>(notifier: &dyn Notifier, result: CoachResult<T>) -> CoachResult<T> {
    if let Err(err) = &result {
        tracing::warn!(error = %err, "Operation failed");
        notifier.notify(err.notification());
    }
    result
}

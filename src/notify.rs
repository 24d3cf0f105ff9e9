//! Reminder delivery.
//!
//! Notifications are tagged `health-<type>`; a new notification with the same
//! tag replaces the previous one instead of stacking.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::models::ReminderType;
use crate::{Error, Result};

/// Whether notifications may be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Not decided yet
    Default,
    Unsupported,
}

impl PermissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Default => "default",
            Self::Unsupported => "unsupported",
        }
    }
}

/// A delivered notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub tag: String,
    pub title: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(reminder_type: ReminderType, message: &str) -> Self {
        Self {
            tag: format!("health-{}", reminder_type.as_str()),
            title: reminder_type.title().to_string(),
            body: message.to_string(),
            sent_at: Utc::now(),
        }
    }
}

/// Notification delivery channel.
pub trait Notifier: Send + Sync {
    fn check_permission(&self) -> PermissionStatus;

    /// Ask for permission; returns whether it was granted.
    fn request_permission(&self) -> bool;

    fn send(&self, reminder_type: ReminderType, message: &str) -> Result<()>;
}

/// Keeps the latest notification per tag.
#[derive(Debug, Default)]
struct TagBoard(Mutex<BTreeMap<String, Notification>>);

impl TagBoard {
    fn post(&self, notification: Notification) -> Result<()> {
        self.0
            .lock()
            .map_err(|_| Error::Other("notification board lock poisoned".to_string()))?
            .insert(notification.tag.clone(), notification);
        Ok(())
    }

    fn current(&self) -> Vec<Notification> {
        self.0
            .lock()
            .map(|board| board.values().cloned().collect())
            .unwrap_or_default()
    }
}

/// Prints notifications to stdout, one line each.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    human: bool,
    board: TagBoard,
}

impl ConsoleNotifier {
    pub fn new(human: bool) -> Self {
        Self {
            human,
            board: TagBoard::default(),
        }
    }

    /// Latest notification per tag.
    pub fn current(&self) -> Vec<Notification> {
        self.board.current()
    }
}

impl Notifier for ConsoleNotifier {
    fn check_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn request_permission(&self) -> bool {
        true
    }

    fn send(&self, reminder_type: ReminderType, message: &str) -> Result<()> {
        let notification = Notification::new(reminder_type, message);
        if self.human {
            println!(
                "[{}] {}: {}",
                notification.sent_at.format("%H:%M"),
                notification.title,
                notification.body
            );
        } else {
            println!("{}", serde_json::to_string(&notification)?);
        }
        self.board.post(notification)
    }
}

/// Records notifications in memory. Permission is fixed at construction.
#[derive(Debug)]
pub struct MemoryNotifier {
    permission: Mutex<PermissionStatus>,
    grant_on_request: bool,
    board: TagBoard,
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new(permission: PermissionStatus) -> Self {
        Self {
            permission: Mutex::new(permission),
            grant_on_request: permission != PermissionStatus::Unsupported,
            board: TagBoard::default(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted)
    }

    /// Every notification in send order.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Latest notification per tag.
    pub fn current(&self) -> Vec<Notification> {
        self.board.current()
    }
}

impl Notifier for MemoryNotifier {
    fn check_permission(&self) -> PermissionStatus {
        self.permission
            .lock()
            .map(|p| *p)
            .unwrap_or(PermissionStatus::Unsupported)
    }

    fn request_permission(&self) -> bool {
        let granted = self.grant_on_request;
        if let Ok(mut permission) = self.permission.lock() {
            if *permission != PermissionStatus::Unsupported {
                *permission = if granted {
                    PermissionStatus::Granted
                } else {
                    PermissionStatus::Denied
                };
            }
        }
        granted
    }

    fn send(&self, reminder_type: ReminderType, message: &str) -> Result<()> {
        if self.check_permission() != PermissionStatus::Granted {
            return Err(Error::Other("notification permission not granted".to_string()));
        }
        let notification = Notification::new(reminder_type, message);
        self.sent
            .lock()
            .map_err(|_| Error::Other("notifier lock poisoned".to_string()))?
            .push(notification.clone());
        self.board.post(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_tag_replaces() {
        let notifier = MemoryNotifier::granted();
        notifier.send(ReminderType::Water, "first").unwrap();
        notifier.send(ReminderType::Water, "second").unwrap();
        notifier.send(ReminderType::Sleep, "bed").unwrap();

        assert_eq!(notifier.sent().len(), 3);
        let current = notifier.current();
        assert_eq!(current.len(), 2);
        let water = current.iter().find(|n| n.tag == "health-water").unwrap();
        assert_eq!(water.body, "second");
        assert_eq!(water.title, "Water reminder");
    }

    #[test]
    fn test_permission_flow() {
        let notifier = MemoryNotifier::new(PermissionStatus::Default);
        assert!(notifier.send(ReminderType::Custom, "x").is_err());
        assert!(notifier.request_permission());
        assert_eq!(notifier.check_permission(), PermissionStatus::Granted);

        let unsupported = MemoryNotifier::new(PermissionStatus::Unsupported);
        assert!(!unsupported.request_permission());
        assert_eq!(unsupported.check_permission(), PermissionStatus::Unsupported);
    }

    #[test]
    fn test_console_notifier_tracks_tags() {
        let notifier = ConsoleNotifier::new(true);
        assert_eq!(notifier.check_permission(), PermissionStatus::Granted);
        notifier.send(ReminderType::Medicine, "pill").unwrap();
        notifier.send(ReminderType::Medicine, "pill again").unwrap();
        assert_eq!(notifier.current().len(), 1);
    }
}

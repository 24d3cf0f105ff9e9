//! Reminder definitions, persisted under the `reminders` key.
//!
//! The store works without a scheduler (plain CRUD from the CLI). When a
//! [`ReminderScheduler`] is attached, enabling a reminder starts its timer and
//! disabling or deleting it stops the timer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::models::{NewReminder, Reminder, ReminderPatch, ReminderType};
use crate::notify::{Notifier, PermissionStatus};
use crate::scheduler::ReminderScheduler;
use crate::storage::{KeyValueStore, generate_id, keys};
use crate::{Error, Result};

/// Reminders plus export timestamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderExport {
    pub reminders: Vec<Reminder>,
    pub exported_at: DateTime<Utc>,
}

pub struct ReminderStore {
    kv: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    reminders: Vec<Reminder>,
    permission: PermissionStatus,
    scheduler: Option<ReminderScheduler>,
}

impl ReminderStore {
    pub fn init(kv: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Self {
        let reminders = match kv.get::<Vec<Reminder>>(keys::REMINDERS) {
            Ok(reminders) => reminders.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "stored reminders unreadable, starting empty");
                Vec::new()
            }
        };
        let permission = notifier.check_permission();
        Self {
            kv,
            notifier,
            reminders,
            permission,
            scheduler: None,
        }
    }

    /// Attach a scheduler and start every enabled reminder.
    ///
    /// Returns the number of reminders started. Requires a tokio runtime.
    pub fn attach_scheduler(&mut self, scheduler: ReminderScheduler) -> usize {
        self.scheduler = Some(scheduler);
        self.start_all()
    }

    pub fn scheduler(&self) -> Option<&ReminderScheduler> {
        self.scheduler.as_ref()
    }

    fn start_all(&mut self) -> usize {
        let Some(scheduler) = self.scheduler.as_mut() else {
            return 0;
        };
        self.reminders
            .iter()
            .filter(|r| r.enabled)
            .filter(|r| scheduler.start(r))
            .count()
    }

    fn start(&mut self, id: &str) {
        let reminder = self.reminders.iter().find(|r| r.id == id);
        if let (Some(scheduler), Some(reminder)) = (self.scheduler.as_mut(), reminder) {
            scheduler.start(reminder);
        }
    }

    fn stop(&mut self, id: &str) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.stop(id);
        }
    }

    fn commit(&mut self, next: Vec<Reminder>, operation: &str) -> Result<()> {
        self.kv
            .set(keys::REMINDERS, &next)
            .map_err(|e| e.into_persistence(operation))?;
        self.reminders = next;
        Ok(())
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn get(&self, id: &str) -> Option<&Reminder> {
        self.reminders.iter().find(|r| r.id == id)
    }

    /// Create an enabled reminder.
    ///
    /// With neither a time nor an interval, the type's default interval is
    /// used when it has one.
    pub fn add_reminder(&mut self, new: NewReminder) -> Result<Reminder> {
        if new.reminder_type == ReminderType::Custom
            && new.message.as_deref().is_none_or(str::is_empty)
        {
            return Err(Error::InvalidInput(
                "Custom reminders need a message".to_string(),
            ));
        }
        let default_interval = new.reminder_type.default_interval();
        let interval = match (new.interval, new.time) {
            (None, None) if default_interval > 0 => Some(default_interval),
            (interval, _) => interval,
        };

        let reminder = Reminder {
            id: generate_id("reminder", new.reminder_type.as_str()),
            reminder_type: new.reminder_type,
            message: new.message,
            time: new.time,
            interval,
            repeat: new.repeat,
            enabled: true,
            created_at: Utc::now(),
        };

        let mut next = self.reminders.clone();
        next.push(reminder.clone());
        self.commit(next, "add reminder")?;
        tracing::info!(id = %reminder.id, reminder_type = %reminder.reminder_type, "reminder added");
        self.start(&reminder.id);
        Ok(reminder)
    }

    /// Apply `patch`. `Ok(None)` if the reminder does not exist.
    pub fn update_reminder(&mut self, id: &str, patch: &ReminderPatch) -> Result<Option<Reminder>> {
        let Some(index) = self.reminders.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let mut next = self.reminders.clone();
        patch.apply(&mut next[index]);
        let updated = next[index].clone();
        self.commit(next, "update reminder")?;

        if updated.enabled {
            self.start(id);
        } else {
            self.stop(id);
        }
        Ok(Some(updated))
    }

    /// Flip `enabled`. Returns the new state, or `None` if absent.
    pub fn toggle_reminder(&mut self, id: &str) -> Result<Option<bool>> {
        let Some(enabled) = self.get(id).map(|r| !r.enabled) else {
            return Ok(None);
        };
        let patch = ReminderPatch {
            enabled: Some(enabled),
            ..Default::default()
        };
        Ok(self.update_reminder(id, &patch)?.map(|r| r.enabled))
    }

    pub fn delete_reminder(&mut self, id: &str) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next = self.reminders.iter().filter(|r| r.id != id).cloned().collect();
        self.commit(next, "delete reminder")?;
        self.stop(id);
        Ok(true)
    }

    pub fn enabled_reminders(&self) -> Vec<&Reminder> {
        self.reminders.iter().filter(|r| r.enabled).collect()
    }

    pub fn reminders_by_type(&self, reminder_type: ReminderType) -> Vec<&Reminder> {
        self.reminders
            .iter()
            .filter(|r| r.reminder_type == reminder_type)
            .collect()
    }

    pub fn permission_status(&self) -> PermissionStatus {
        self.permission
    }

    pub fn request_permission(&mut self) -> bool {
        let granted = self.notifier.request_permission();
        self.permission = if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        granted
    }

    pub fn export(&self) -> ReminderExport {
        ReminderExport {
            reminders: self.reminders.clone(),
            exported_at: Utc::now(),
        }
    }
}

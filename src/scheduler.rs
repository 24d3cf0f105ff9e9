//! Running reminder timers.
//!
//! One tokio task per running reminder, keyed by reminder id. Starting a
//! reminder always aborts any task already registered for that id, so a
//! reminder never has two timers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::dates::{Clock, delay_until};
use crate::models::{Reminder, ReminderRepeat, ReminderSchedule, ReminderType};
use crate::notify::{Notifier, PermissionStatus};

pub struct ReminderScheduler {
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    handles: HashMap<String, JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn new(notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            notifier,
            clock,
            handles: HashMap::new(),
        }
    }

    /// Start (or restart) the timer for `reminder`.
    ///
    /// Returns false when nothing was scheduled: notification permission is
    /// not granted, or the reminder has neither an interval nor a time.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, reminder: &Reminder) -> bool {
        self.stop(&reminder.id);

        if self.notifier.check_permission() != PermissionStatus::Granted {
            tracing::debug!(id = %reminder.id, "notification permission not granted, not scheduling");
            return false;
        }

        let notifier = Arc::clone(&self.notifier);
        let reminder_type = reminder.reminder_type;
        let message = reminder.effective_message().to_string();

        let handle = match reminder.schedule() {
            ReminderSchedule::Interval(period) => {
                tokio::spawn(run_interval(notifier, reminder_type, message, period))
            }
            ReminderSchedule::TimeOfDay { time, repeat } => {
                let clock = Arc::clone(&self.clock);
                tokio::spawn(async move {
                    loop {
                        tokio::time::sleep(delay_until(time, clock.now())).await;
                        deliver(notifier.as_ref(), reminder_type, &message);
                        if repeat != ReminderRepeat::Daily {
                            break;
                        }
                    }
                })
            }
            ReminderSchedule::Unscheduled => return false,
        };

        tracing::info!(id = %reminder.id, reminder_type = %reminder_type, "reminder started");
        self.handles.insert(reminder.id.clone(), handle);
        true
    }

    /// Stop the timer for `id`. Returns whether one was registered.
    pub fn stop(&mut self, id: &str) -> bool {
        match self.handles.remove(id) {
            Some(handle) => {
                handle.abort();
                tracing::debug!(id, "reminder stopped");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }

    /// Ids of reminders whose timers are still live, sorted.
    pub fn running(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .handles
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.handles.get(id).is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn run_interval(
    notifier: Arc<dyn Notifier>,
    reminder_type: ReminderType,
    message: String,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        deliver(notifier.as_ref(), reminder_type, &message);
    }
}

fn deliver(notifier: &dyn Notifier, reminder_type: ReminderType, message: &str) {
    if let Err(e) = notifier.send(reminder_type, message) {
        tracing::warn!(reminder_type = %reminder_type, error = %e, "failed to deliver reminder");
    }
}

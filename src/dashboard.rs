//! The assembled application: every store over one data directory.
//!
//! Opening a [`Dashboard`] loads all stores and runs the daily rollover:
//! the first run on a new calendar day resets daily goals, when
//! `auto-daily-reset` is on.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::aggregate::{self, SleepTrendPoint, Statistics, TrendPoint};
use crate::config::ResolvedConfig;
use crate::dates::{Clock, SystemClock};
use crate::export::{self, Backup, HealthReport};
use crate::notify::Notifier;
use crate::scheduler::ReminderScheduler;
use crate::storage::{DocumentStore, KeyValueStore, Storage, StorageUsage, keys};
use crate::stores::{GoalStore, ProfileStore, RecordStore, ReminderStore};
use crate::Result;

/// Session settings persisted under the `settings` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Settings {
    last_active_date: Option<NaiveDate>,
}

/// What the daily rollover did on open.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRollover {
    pub previous: NaiveDate,
    pub today: NaiveDate,
    pub goals_reset: usize,
}

/// Statistics window selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsWindow {
    Week,
    Month,
    All,
}

impl StatsWindow {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
        }
    }
}

pub struct Dashboard {
    pub records: RecordStore,
    pub goals: GoalStore,
    pub profile: ProfileStore,
    pub reminders: ReminderStore,
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    config: ResolvedConfig,
    rollover: Option<DailyRollover>,
}

impl Dashboard {
    /// Open every store in an initialized data directory.
    pub fn open(
        storage: &Storage,
        config: ResolvedConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let documents = Box::new(storage.documents());
        let kv = storage.key_value()?;
        Self::assemble(documents, kv, Arc::new(SystemClock), notifier, config)
    }

    /// Build a dashboard from explicit backends.
    pub fn assemble(
        documents: Box<dyn DocumentStore>,
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        config: ResolvedConfig,
    ) -> Result<Self> {
        let mut records = RecordStore::new(documents, Arc::clone(&kv), Arc::clone(&clock));
        records.init();

        let mut dashboard = Self {
            records,
            goals: GoalStore::init(Arc::clone(&kv)),
            profile: ProfileStore::init(Arc::clone(&kv)),
            reminders: ReminderStore::init(Arc::clone(&kv), Arc::clone(&notifier)),
            kv,
            clock,
            notifier,
            config,
            rollover: None,
        };

        match dashboard.daily_rollover() {
            Ok(rollover) => dashboard.rollover = rollover,
            Err(e) => tracing::warn!(error = %e, "daily rollover failed"),
        }
        Ok(dashboard)
    }

    /// Reset daily goals if the last active date is before today, then
    /// record today as active.
    fn daily_rollover(&mut self) -> Result<Option<DailyRollover>> {
        let today = self.today();
        let mut settings = self.kv.get_or(keys::SETTINGS, Settings::default());

        let rollover = match settings.last_active_date {
            Some(previous) if previous != today && self.config.auto_daily_reset() => {
                let goals_reset = self.goals.reset_daily_progress()?;
                tracing::info!(%previous, %today, goals_reset, "daily rollover");
                Some(DailyRollover {
                    previous,
                    today,
                    goals_reset,
                })
            }
            _ => None,
        };

        if settings.last_active_date != Some(today) {
            settings.last_active_date = Some(today);
            self.kv
                .set(keys::SETTINGS, &settings)
                .map_err(|e| e.into_persistence("save settings"))?;
        }
        Ok(rollover)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// The rollover performed when this dashboard was opened, if any.
    pub fn rollover(&self) -> Option<&DailyRollover> {
        self.rollover.as_ref()
    }

    /// Key-value storage use against the configured quota.
    pub fn usage(&self) -> Result<StorageUsage> {
        self.kv.usage(self.config.storage_quota())
    }

    pub fn statistics(&self, window: StatsWindow) -> Statistics {
        let records = self.records.records();
        let today = self.today();
        match window {
            StatsWindow::Week => aggregate::statistics(aggregate::week_records(records, today)),
            StatsWindow::Month => aggregate::statistics(aggregate::month_records(records, today)),
            StatsWindow::All => aggregate::statistics(records),
        }
    }

    pub fn steps_trend(&self) -> Vec<TrendPoint> {
        aggregate::steps_trend(self.records.records(), self.today())
    }

    pub fn sleep_trend(&self) -> Vec<SleepTrendPoint> {
        aggregate::sleep_trend(self.records.records(), self.today())
    }

    /// Everything, for a JSON backup.
    pub fn backup(&self) -> Backup {
        Backup {
            records: self.records.records().to_vec(),
            goals: self.goals.goals().to_vec(),
            profile: self.profile.profile().cloned(),
            reminders: self.reminders.reminders().to_vec(),
            exported_at: Utc::now(),
        }
    }

    pub fn report(&self) -> HealthReport {
        export::generate_report(
            self.profile.profile(),
            self.records.records(),
            self.goals.goals(),
            self.today(),
        )
    }

    /// Start timers for every enabled reminder. Requires a tokio runtime.
    pub fn start_reminders(&mut self) -> usize {
        let scheduler = ReminderScheduler::new(Arc::clone(&self.notifier), Arc::clone(&self.clock));
        self.reminders.attach_scheduler(scheduler)
    }
}

//! Calendar helpers and the clock abstraction.
//!
//! Every "today" in the crate flows through a [`Clock`] so that stores and
//! tests agree on the same calendar date. Windows are inclusive on both ends
//! and weeks start on Monday.

use chrono::{DateTime, Datelike, Days, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use std::time::Duration;

use crate::{Error, Result};

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Clock backed by the system's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Freeze the clock at noon on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Inclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Monday through Sunday of the ISO week containing `today`.
pub fn week_range(today: NaiveDate) -> DateRange {
    let offset = u64::from(today.weekday().num_days_from_monday());
    let start = today - Days::new(offset);
    DateRange::new(start, start + Days::new(6))
}

/// First through last day of the calendar month containing `today`.
pub fn month_range(today: NaiveDate) -> DateRange {
    let start = today.with_day(1).unwrap_or(today);
    let end = (start + Months::new(1))
        .pred_opt()
        .unwrap_or(start);
    DateRange::new(start, end)
}

/// The last `n` calendar dates ending with `today`, oldest first.
pub fn last_days(n: u64, today: NaiveDate) -> Vec<NaiveDate> {
    (0..n)
        .rev()
        .map(|offset| today - Days::new(offset))
        .collect()
}

/// Whole years elapsed between `birth_date` and `today`.
pub fn age(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    today.years_since(birth_date).unwrap_or(0)
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("Invalid date (expected YYYY-MM-DD): {}", s)))
}

/// Parse an `HH:MM` (or `HH:MM:SS`) time of day.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| Error::InvalidInput(format!("Invalid time (expected HH:MM): {}", s)))
}

/// Delay from `now` until the next occurrence of `time`.
///
/// A time equal to or earlier than `now` is scheduled for the next day.
pub fn delay_until(time: NaiveTime, now: NaiveDateTime) -> Duration {
    let mut target = now.date().and_time(time);
    if target <= now {
        target += chrono::Duration::days(1);
    }
    (target - now).to_std().unwrap_or_default()
}

/// Timestamp formatted the way exported file names expect.
pub fn file_stamp(now: DateTime<Local>) -> String {
    now.format("%Y_%m_%d_%H%M%S").to_string()
}

//! Statistics and trend windows over records.
//!
//! Everything here is a pure function of a record slice and "today".
//! When several records share a date, the first one in the slice wins.

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::{self, DateRange};
use crate::models::{Record, round1};

/// Number of days in a trend window.
pub const TREND_DAYS: u64 = 7;

/// Totals and averages over a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_days: usize,
    pub total_steps: u64,
    pub avg_steps: u64,
    pub total_water: u64,
    pub avg_water: u64,
    pub total_sleep: f64,
    /// Average hours of sleep, one decimal
    pub avg_sleep: f64,
}

/// One day of the steps trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One day of the sleep trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepTrendPoint {
    pub date: NaiveDate,
    pub duration: f64,
    pub deep: f64,
    pub light: f64,
}

fn rounded_avg(total: u64, count: usize) -> u64 {
    (total as f64 / count as f64).round() as u64
}

pub fn statistics<'a, I>(records: I) -> Statistics
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut stats = Statistics::default();
    for record in records {
        stats.total_days += 1;
        stats.total_steps += u64::from(record.steps.unwrap_or(0));
        stats.total_water += u64::from(record.water.unwrap_or(0));
        stats.total_sleep += record.sleep.duration.unwrap_or(0.0);
    }
    if stats.total_days == 0 {
        return Statistics::default();
    }
    stats.avg_steps = rounded_avg(stats.total_steps, stats.total_days);
    stats.avg_water = rounded_avg(stats.total_water, stats.total_days);
    stats.avg_sleep = round1(stats.total_sleep / stats.total_days as f64);
    stats.total_sleep = round1(stats.total_sleep);
    stats
}

/// Records dated within `range`, in input order.
pub fn in_range(records: &[Record], range: DateRange) -> Vec<&Record> {
    records.iter().filter(|r| range.contains(r.date)).collect()
}

/// Records in the Monday-to-Sunday week containing `today`.
pub fn week_records(records: &[Record], today: NaiveDate) -> Vec<&Record> {
    in_range(records, dates::week_range(today))
}

/// Records in the calendar month containing `today`.
pub fn month_records(records: &[Record], today: NaiveDate) -> Vec<&Record> {
    in_range(records, dates::month_range(today))
}

fn first_on(records: &[Record], date: NaiveDate) -> Option<&Record> {
    records.iter().find(|r| r.date == date)
}

/// Steps for each of the last seven days, oldest first. Missing days are 0.
pub fn steps_trend(records: &[Record], today: NaiveDate) -> Vec<TrendPoint> {
    dates::last_days(TREND_DAYS, today)
        .into_iter()
        .map(|date| TrendPoint {
            date,
            value: first_on(records, date)
                .and_then(|r| r.steps)
                .map(f64::from)
                .unwrap_or(0.0),
        })
        .collect()
}

/// Sleep for each of the last seven days, oldest first. Missing days are 0.
pub fn sleep_trend(records: &[Record], today: NaiveDate) -> Vec<SleepTrendPoint> {
    dates::last_days(TREND_DAYS, today)
        .into_iter()
        .map(|date| {
            let sleep = first_on(records, date).map(|r| &r.sleep);
            SleepTrendPoint {
                date,
                duration: sleep.and_then(|s| s.duration).unwrap_or(0.0),
                deep: sleep.and_then(|s| s.deep).unwrap_or(0.0),
                light: sleep.and_then(|s| s.light).unwrap_or(0.0),
            }
        })
        .collect()
}

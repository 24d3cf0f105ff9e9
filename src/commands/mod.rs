//! Command implementations for the healthdash CLI.
//!
//! Each command returns a result type implementing [`Output`], which the
//! binary prints as JSON (default) or as human-readable text with `-H`.
//! Commands are grouped by area:
//! - system: init, status, usage
//! - record: daily records
//! - goal: goals and progress
//! - stats / trend: aggregation
//! - profile, reminder
//! - export / import, config

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::aggregate::{SleepTrendPoint, Statistics, TrendPoint};
use crate::cli::RecordFields;
use crate::config::{CONFIG_KEYS, ResolvedConfig};
use crate::dashboard::{Dashboard, DailyRollover, StatsWindow};
use crate::dates::{DateRange, parse_date, parse_time_of_day};
use crate::export::{self, HealthReport, ImportFormat};
use crate::models::{
    BloodPressure, Food, Goal, GoalPatch, GoalPeriod, GoalProgress, GoalStatus, GoalType,
    HeartRate, NewGoal, NewReminder, Profile, ProfileInput, Record, RecordPatch, Reminder,
    ReminderPatch, ReminderRepeat, ReminderType, Sleep,
};
use crate::notify::PermissionStatus;
use crate::storage::{DocumentStore, Storage, StorageTier, StorageUsage};
use crate::stores::{ImportSummary, RecordOutcome};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output: Serialize {
    /// Serialize to a single-line JSON string.
    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

// === Parsing helpers ===

fn parse_goal_type(s: &str) -> Result<GoalType> {
    GoalType::parse(s).ok_or_else(|| {
        let known: Vec<&str> = GoalType::ALL.iter().map(GoalType::as_str).collect();
        Error::InvalidInput(format!(
            "Unknown goal type '{}' (expected one of: {})",
            s,
            known.join(", ")
        ))
    })
}

fn parse_period(s: &str) -> Result<GoalPeriod> {
    GoalPeriod::parse(s).ok_or_else(|| {
        Error::InvalidInput(format!("Unknown period '{}' (expected daily, weekly or monthly)", s))
    })
}

fn parse_status(s: &str) -> Result<GoalStatus> {
    GoalStatus::parse(s).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Unknown status '{}' (expected active, paused or completed)",
            s
        ))
    })
}

fn parse_reminder_type(s: &str) -> Result<ReminderType> {
    ReminderType::parse(s).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Unknown reminder type '{}' (expected water, exercise, medicine, sleep, measure or custom)",
            s
        ))
    })
}

fn parse_repeat(s: &str) -> Result<ReminderRepeat> {
    ReminderRepeat::parse(s).ok_or_else(|| {
        Error::InvalidInput(format!("Unknown repeat '{}' (expected once or daily)", s))
    })
}

fn parse_optional_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(parse_date).transpose()
}

fn not_found(kind: &str, id: &str) -> Error {
    Error::NotFound(format!("{} {}", kind, id))
}

/// Build a record patch from CLI flags. Nested blocks are only present when
/// one of their fields was given.
pub fn record_patch(fields: &RecordFields) -> Result<RecordPatch> {
    let heart_rate = HeartRate {
        resting: fields.heart_resting,
        max: fields.heart_max,
        avg: fields.heart_avg,
    };
    let sleep = Sleep {
        duration: fields.sleep,
        deep: fields.sleep_deep,
        light: fields.sleep_light,
        quality: fields.sleep_quality.clone(),
    };
    let blood_pressure = BloodPressure {
        systolic: fields.systolic,
        diastolic: fields.diastolic,
    };
    let food = Food {
        breakfast: fields.breakfast.clone(),
        lunch: fields.lunch.clone(),
        dinner: fields.dinner.clone(),
        calories: fields.food_calories,
    };

    Ok(RecordPatch {
        date: parse_optional_date(fields.date.as_deref())?,
        steps: fields.steps,
        distance: fields.distance,
        calories: fields.calories,
        heart_rate: (heart_rate != HeartRate::default()).then_some(heart_rate),
        sleep: (sleep != Sleep::default()).then_some(sleep),
        water: fields.water,
        weight: fields.weight,
        blood_pressure: (blood_pressure != BloodPressure::default()).then_some(blood_pressure),
        food: (food != Food::default()).then_some(food),
        mood: fields.mood.clone(),
        notes: fields.notes.clone(),
    })
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

// === System ===

#[derive(Serialize)]
pub struct InitResult {
    pub data_dir: PathBuf,
    pub created: bool,
    pub tier: StorageTier,
}

impl Output for InitResult {
    fn to_human(&self) -> String {
        let verb = if self.created { "Initialized" } else { "Already initialized" };
        format!(
            "{} healthdash data directory: {}\nRecord storage: {}",
            verb,
            self.data_dir.display(),
            self.tier
        )
    }
}

/// Create the data directory and probe the document store.
pub fn system_init(data_dir: Option<&Path>) -> Result<InitResult> {
    let existed = Storage::exists(data_dir)?;
    let storage = Storage::init(data_dir)?;
    let mut documents = storage.documents();
    let tier = match documents.init() {
        Ok(()) => StorageTier::Document,
        Err(e) => {
            tracing::warn!(error = %e, "document store unavailable, records will use key-value storage");
            StorageTier::KeyValue
        }
    };
    Ok(InitResult {
        data_dir: storage.root,
        created: !existed,
        tier,
    })
}

#[derive(Serialize)]
pub struct StatusResult {
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub git_commit: &'static str,
    pub data_dir: PathBuf,
    pub today: NaiveDate,
    pub tier: StorageTier,
    pub records: usize,
    pub has_today_record: bool,
    pub goals: usize,
    pub active_goals: usize,
    pub reminders: usize,
    pub enabled_reminders: usize,
    pub has_profile: bool,
    pub notification_permission: PermissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollover: Option<DailyRollover>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Output for StatusResult {
    fn to_human(&self) -> String {
        let mut out = format!(
            "healthdash {} ({}, built {})\n",
            self.version, self.git_commit, self.build_timestamp
        );
        let _ = writeln!(out, "Data directory: {}", self.data_dir.display());
        let _ = writeln!(out, "Record storage: {}", self.tier);
        let _ = writeln!(
            out,
            "Records: {} (today: {})",
            self.records,
            if self.has_today_record { "logged" } else { "not logged" }
        );
        let _ = writeln!(out, "Goals: {} ({} active)", self.goals, self.active_goals);
        let _ = writeln!(
            out,
            "Reminders: {} ({} enabled, notifications {})",
            self.reminders,
            self.enabled_reminders,
            self.notification_permission.as_str()
        );
        let _ = write!(out, "Profile: {}", if self.has_profile { "set" } else { "not set" });
        if let Some(ref rollover) = self.rollover {
            let _ = write!(
                out,
                "\nNew day since {}: {} daily goal(s) reset",
                rollover.previous, rollover.goals_reset
            );
        }
        if let Some(ref error) = self.last_error {
            let _ = write!(out, "\nLast error: {}", error);
        }
        out
    }
}

pub fn system_status(dash: &Dashboard, data_dir: &Path) -> StatusResult {
    StatusResult {
        version: env!("CARGO_PKG_VERSION"),
        build_timestamp: env!("HDASH_BUILD_TIMESTAMP"),
        git_commit: env!("HDASH_GIT_COMMIT"),
        data_dir: data_dir.to_path_buf(),
        today: dash.today(),
        tier: dash.records.tier(),
        records: dash.records.records().len(),
        has_today_record: dash.records.today_record().is_some(),
        goals: dash.goals.goals().len(),
        active_goals: dash.goals.active_goals().len(),
        reminders: dash.reminders.reminders().len(),
        enabled_reminders: dash.reminders.enabled_reminders().len(),
        has_profile: dash.profile.has_profile(),
        notification_permission: dash.reminders.permission_status(),
        rollover: dash.rollover().cloned(),
        last_error: dash
            .records
            .last_error()
            .or(dash.goals.last_error())
            .map(str::to_string),
    }
}

#[derive(Serialize)]
pub struct UsageResult {
    #[serde(flatten)]
    pub usage: StorageUsage,
}

impl Output for UsageResult {
    fn to_human(&self) -> String {
        format!(
            "Storage: {} of {} ({:.2}%)",
            format_bytes(self.usage.used),
            format_bytes(self.usage.total),
            self.usage.percentage
        )
    }
}

pub fn system_usage(dash: &Dashboard) -> Result<UsageResult> {
    Ok(UsageResult {
        usage: dash.usage()?,
    })
}

// === Records ===

fn format_record(record: &Record) -> String {
    let mut out = format!("{} ({})", record.date, record.id);
    if let Some(steps) = record.steps {
        let _ = write!(out, "\n  Steps: {}", steps);
    }
    if let Some(distance) = record.distance {
        let _ = write!(out, "\n  Distance: {} km", distance);
    }
    if let Some(calories) = record.calories {
        let _ = write!(out, "\n  Calories burned: {} kcal", calories);
    }
    if let Some(duration) = record.sleep.duration {
        let _ = write!(out, "\n  Sleep: {} h", duration);
        if record.sleep.deep.is_some() || record.sleep.light.is_some() {
            let _ = write!(
                out,
                " (deep {}, light {})",
                or_dash(record.sleep.deep),
                or_dash(record.sleep.light)
            );
        }
        if let Some(ref quality) = record.sleep.quality {
            let _ = write!(out, ", {}", quality);
        }
    }
    if let Some(water) = record.water {
        let _ = write!(out, "\n  Water: {} ml", water);
    }
    if let Some(weight) = record.weight {
        let _ = write!(out, "\n  Weight: {} kg", weight);
    }
    if record.heart_rate != HeartRate::default() {
        let _ = write!(
            out,
            "\n  Heart rate: resting {} / avg {} / max {}",
            or_dash(record.heart_rate.resting),
            or_dash(record.heart_rate.avg),
            or_dash(record.heart_rate.max)
        );
    }
    if record.blood_pressure != BloodPressure::default() {
        let _ = write!(
            out,
            "\n  Blood pressure: {}/{}",
            or_dash(record.blood_pressure.systolic),
            or_dash(record.blood_pressure.diastolic)
        );
    }
    let meals: Vec<String> = [
        ("breakfast", &record.food.breakfast),
        ("lunch", &record.food.lunch),
        ("dinner", &record.food.dinner),
    ]
    .iter()
    .filter_map(|(meal, food)| food.as_ref().map(|f| format!("{} {}", meal, f)))
    .collect();
    if !meals.is_empty() {
        let _ = write!(out, "\n  Food: {}", meals.join(", "));
    }
    if let Some(calories) = record.food.calories {
        let _ = write!(out, "\n  Calories eaten: {} kcal", calories);
    }
    let _ = write!(out, "\n  Mood: {}", record.mood);
    if !record.notes.is_empty() {
        let _ = write!(out, "\n  Notes: {}", record.notes);
    }
    out
}

impl Output for Record {
    fn to_human(&self) -> String {
        format_record(self)
    }
}

impl Output for RecordOutcome {
    fn to_human(&self) -> String {
        let mut out = format_record(&self.record);
        if let Some(ref sync) = self.sync {
            if !sync.updated.is_empty() {
                let _ = write!(out, "\nGoals updated: {}", sync.updated.len());
            }
            if !sync.completed.is_empty() {
                let _ = write!(out, "\nGoals completed: {}", sync.completed.join(", "));
            }
            for failure in &sync.failures {
                let _ = write!(out, "\nGoal {} not updated: {}", failure.goal_id, failure.error);
            }
        }
        out
    }
}

pub fn record_add(dash: &mut Dashboard, fields: &RecordFields) -> Result<RecordOutcome> {
    let patch = record_patch(fields)?;
    dash.records.add_record(&patch, &mut dash.goals)
}

pub fn record_update(dash: &mut Dashboard, id: &str, fields: &RecordFields) -> Result<RecordOutcome> {
    let patch = record_patch(fields)?;
    dash.records
        .update_record(id, &patch, &mut dash.goals)?
        .ok_or_else(|| not_found("record", id))
}

#[derive(Serialize)]
pub struct Removed {
    pub kind: &'static str,
    pub id: String,
    pub deleted: bool,
}

impl Output for Removed {
    fn to_human(&self) -> String {
        format!("Deleted {} {}", self.kind, self.id)
    }
}

pub fn record_delete(dash: &mut Dashboard, id: &str) -> Result<Removed> {
    if !dash.records.delete_record(id)? {
        return Err(not_found("record", id));
    }
    Ok(Removed {
        kind: "record",
        id: id.to_string(),
        deleted: true,
    })
}

/// Look a record up by id, or by date when the argument parses as one.
pub fn record_show(dash: &Dashboard, id_or_date: &str) -> Result<Record> {
    let by_id = dash.records.get(id_or_date);
    let found = match by_id {
        Some(record) => Some(record),
        None => match parse_date(id_or_date) {
            Ok(date) => dash.records.get_record_by_date(date),
            Err(_) => None,
        },
    };
    found.cloned().ok_or_else(|| not_found("record", id_or_date))
}

#[derive(Serialize)]
pub struct TodayRecord {
    pub date: NaiveDate,
    pub record: Option<Record>,
}

impl Output for TodayRecord {
    fn to_human(&self) -> String {
        match self.record {
            Some(ref record) => format_record(record),
            None => format!("No record for {} yet", self.date),
        }
    }
}

pub fn record_today(dash: &Dashboard) -> TodayRecord {
    TodayRecord {
        date: dash.today(),
        record: dash.records.today_record().cloned(),
    }
}

#[derive(Serialize)]
pub struct RecordList {
    pub count: usize,
    pub records: Vec<Record>,
}

impl Output for RecordList {
    fn to_human(&self) -> String {
        if self.records.is_empty() {
            return "No records".to_string();
        }
        let mut out = format!("{} record(s):", self.count);
        for r in &self.records {
            let _ = write!(
                out,
                "\n  {}  {}  steps {}  water {}  sleep {}  {}",
                r.date,
                r.id,
                or_dash(r.steps),
                or_dash(r.water),
                or_dash(r.sleep.duration),
                r.mood
            );
        }
        out
    }
}

/// Records newest first, optionally within `from..=to`.
pub fn record_list(
    dash: &Dashboard,
    from: Option<&str>,
    to: Option<&str>,
    limit: Option<usize>,
) -> Result<RecordList> {
    let from = parse_optional_date(from)?;
    let to = parse_optional_date(to)?;

    let mut records = if from.is_none() && to.is_none() {
        dash.records.records().to_vec()
    } else {
        let all = dash.records.records();
        let start = from
            .or_else(|| all.iter().map(|r| r.date).min())
            .unwrap_or_else(|| dash.today());
        let end = to
            .or_else(|| all.iter().map(|r| r.date).max())
            .unwrap_or_else(|| dash.today());
        if start > end {
            return Err(Error::InvalidInput(format!(
                "--from {} is after --to {}",
                start, end
            )));
        }
        let mut hits = dash.records.records_by_range(start, end)?;
        hits.sort_by(|a, b| b.date.cmp(&a.date));
        hits
    };
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    Ok(RecordList {
        count: records.len(),
        records,
    })
}

// === Goals ===

fn format_goal(goal: &Goal) -> String {
    format!(
        "{} [{}] {}: {}/{} {} ({}, {})",
        goal.id,
        goal.goal_type,
        goal.display_name(),
        goal.current_value,
        goal.target_value,
        goal.goal_type.unit(),
        goal.period.as_str(),
        goal.status.as_str()
    )
}

impl Output for Goal {
    fn to_human(&self) -> String {
        format_goal(self)
    }
}

pub fn goal_add(
    dash: &mut Dashboard,
    goal_type: &str,
    target: f64,
    period: &str,
    name: Option<String>,
) -> Result<Goal> {
    dash.goals.add_goal(NewGoal {
        goal_type: parse_goal_type(goal_type)?,
        period: parse_period(period)?,
        target_value: target,
        name,
    })
}

#[derive(Serialize)]
pub struct GoalList {
    pub count: usize,
    pub goals: Vec<Goal>,
}

impl Output for GoalList {
    fn to_human(&self) -> String {
        if self.goals.is_empty() {
            return "No goals".to_string();
        }
        let mut out = format!("{} goal(s):", self.count);
        for goal in &self.goals {
            let _ = write!(out, "\n  {}", format_goal(goal));
        }
        out
    }
}

pub fn goal_list(dash: &Dashboard, status: Option<&str>) -> Result<GoalList> {
    let status = status.map(parse_status).transpose()?;
    let goals: Vec<Goal> = dash
        .goals
        .goals()
        .iter()
        .filter(|g| status.is_none_or(|s| g.status == s))
        .cloned()
        .collect();
    Ok(GoalList {
        count: goals.len(),
        goals,
    })
}

fn changed_goal(dash: &Dashboard, id: &str, found: bool) -> Result<Goal> {
    if !found {
        return Err(not_found("goal", id));
    }
    dash.goals.get(id).cloned().ok_or_else(|| not_found("goal", id))
}

pub fn goal_update(
    dash: &mut Dashboard,
    id: &str,
    goal_type: Option<&str>,
    name: Option<String>,
    period: Option<&str>,
    target: Option<f64>,
    status: Option<&str>,
) -> Result<Goal> {
    let patch = GoalPatch {
        goal_type: goal_type.map(parse_goal_type).transpose()?,
        name,
        period: period.map(parse_period).transpose()?,
        target_value: target,
        status: status.map(parse_status).transpose()?,
    };
    let found = dash.goals.update_goal(id, &patch)?;
    changed_goal(dash, id, found)
}

pub fn goal_progress(dash: &mut Dashboard, id: &str, value: f64) -> Result<Goal> {
    let found = dash.goals.update_progress(id, value)?;
    changed_goal(dash, id, found)
}

pub fn goal_pause(dash: &mut Dashboard, id: &str) -> Result<Goal> {
    let found = dash.goals.pause_goal(id)?;
    changed_goal(dash, id, found)
}

pub fn goal_resume(dash: &mut Dashboard, id: &str) -> Result<Goal> {
    let found = dash.goals.resume_goal(id)?;
    changed_goal(dash, id, found)
}

pub fn goal_delete(dash: &mut Dashboard, id: &str) -> Result<Removed> {
    if !dash.goals.delete_goal(id)? {
        return Err(not_found("goal", id));
    }
    Ok(Removed {
        kind: "goal",
        id: id.to_string(),
        deleted: true,
    })
}

#[derive(Serialize)]
pub struct ResetResult {
    pub reset: usize,
}

impl Output for ResetResult {
    fn to_human(&self) -> String {
        format!("Reset {} daily goal(s)", self.reset)
    }
}

pub fn goal_reset(dash: &mut Dashboard) -> Result<ResetResult> {
    Ok(ResetResult {
        reset: dash.goals.reset_daily_progress()?,
    })
}

#[derive(Serialize)]
pub struct GoalToday {
    pub date: NaiveDate,
    pub goals: Vec<GoalProgress>,
}

impl Output for GoalToday {
    fn to_human(&self) -> String {
        if self.goals.is_empty() {
            return format!("No active daily goals for {}", self.date);
        }
        let mut out = format!("Goals for {}:", self.date);
        for p in &self.goals {
            let _ = write!(
                out,
                "\n  {:<20} {:>3}%  {}/{} {}",
                p.goal.display_name(),
                p.progress,
                p.goal.current_value,
                p.goal.target_value,
                p.unit
            );
            if p.remaining > 0.0 {
                let _ = write!(out, " ({} to go)", p.remaining);
            }
        }
        out
    }
}

pub fn goal_today(dash: &Dashboard) -> GoalToday {
    GoalToday {
        date: dash.today(),
        goals: dash.goals.today_progress(),
    }
}

// === Stats and trends ===

#[derive(Serialize)]
pub struct StatsResult {
    pub window: &'static str,
    #[serde(flatten)]
    pub statistics: Statistics,
}

impl Output for StatsResult {
    fn to_human(&self) -> String {
        let s = &self.statistics;
        format!(
            "Statistics ({}, {} day(s))\n  Steps: {} total, {} avg\n  Water: {} ml total, {} ml avg\n  Sleep: {} h total, {} h avg",
            self.window,
            s.total_days,
            s.total_steps,
            s.avg_steps,
            s.total_water,
            s.avg_water,
            s.total_sleep,
            s.avg_sleep
        )
    }
}

pub fn stats(dash: &Dashboard, window: &str) -> Result<StatsResult> {
    let window = StatsWindow::parse(window).ok_or_else(|| {
        Error::InvalidInput(format!("Unknown window '{}' (expected week, month or all)", window))
    })?;
    Ok(StatsResult {
        window: window.as_str(),
        statistics: dash.statistics(window),
    })
}

#[derive(Serialize)]
pub struct StepsTrend {
    pub days: Vec<TrendPoint>,
}

impl Output for StepsTrend {
    fn to_human(&self) -> String {
        let max = self.days.iter().map(|d| d.value).fold(0.0, f64::max);
        let mut out = "Steps, last 7 days:".to_string();
        for day in &self.days {
            let width = if max > 0.0 { (day.value / max * 30.0).round() as usize } else { 0 };
            let _ = write!(out, "\n  {}  {:>7}  {}", day.date, day.value, "#".repeat(width));
        }
        out
    }
}

pub fn trend_steps(dash: &Dashboard) -> StepsTrend {
    StepsTrend {
        days: dash.steps_trend(),
    }
}

#[derive(Serialize)]
pub struct SleepTrend {
    pub days: Vec<SleepTrendPoint>,
}

impl Output for SleepTrend {
    fn to_human(&self) -> String {
        let mut out = "Sleep, last 7 days:".to_string();
        for day in &self.days {
            let _ = write!(
                out,
                "\n  {}  {:>4} h  (deep {}, light {})",
                day.date, day.duration, day.deep, day.light
            );
        }
        out
    }
}

pub fn trend_sleep(dash: &Dashboard) -> SleepTrend {
    SleepTrend {
        days: dash.sleep_trend(),
    }
}

// === Profile ===

#[derive(Serialize)]
pub struct ProfileView {
    pub profile: Option<Profile>,
    pub age: Option<u32>,
    pub bmi: Option<f64>,
    pub bmi_category: &'static str,
}

impl Output for ProfileView {
    fn to_human(&self) -> String {
        let Some(ref p) = self.profile else {
            return "No profile set".to_string();
        };
        let mut out = format!("{} ({})", p.nickname, p.id);
        let _ = write!(out, "\n  Age: {}", or_dash(self.age));
        let _ = write!(out, "\n  Gender: {}", or_dash(p.gender.as_deref()));
        let _ = write!(out, "\n  Height: {} cm", or_dash(p.height));
        let _ = write!(out, "\n  Weight: {} kg", or_dash(p.weight));
        let _ = write!(out, "\n  BMI: {} ({})", or_dash(self.bmi), self.bmi_category);
        out
    }
}

fn profile_view(dash: &Dashboard) -> ProfileView {
    ProfileView {
        profile: dash.profile.profile().cloned(),
        age: dash.profile.age(dash.today()),
        bmi: dash.profile.bmi(),
        bmi_category: dash.profile.bmi_status().as_str(),
    }
}

/// Create the profile, or merge the given fields into the existing one.
pub fn profile_set(
    dash: &mut Dashboard,
    nickname: Option<String>,
    birth_date: Option<&str>,
    gender: Option<String>,
    height: Option<f64>,
    weight: Option<f64>,
) -> Result<ProfileView> {
    let input = ProfileInput {
        nickname,
        birth_date: parse_optional_date(birth_date)?,
        gender,
        height,
        weight,
    };
    if dash.profile.has_profile() {
        dash.profile.update_profile(&input)?;
    } else {
        if input.nickname.as_deref().is_none_or(|n| n.trim().is_empty()) {
            return Err(Error::InvalidInput(
                "A new profile needs --nickname".to_string(),
            ));
        }
        dash.profile.save_profile(&input)?;
    }
    Ok(profile_view(dash))
}

pub fn profile_show(dash: &Dashboard) -> ProfileView {
    profile_view(dash)
}

pub fn profile_clear(dash: &mut Dashboard) -> Result<Removed> {
    let id = dash
        .profile
        .profile()
        .map(|p| p.id.clone())
        .ok_or_else(|| Error::NotFound("profile".to_string()))?;
    dash.profile.clear_profile()?;
    Ok(Removed {
        kind: "profile",
        id,
        deleted: true,
    })
}

// === Reminders ===

fn format_reminder(r: &Reminder) -> String {
    let schedule = match (r.interval, r.time) {
        (Some(minutes), _) if minutes > 0 => format!("every {} min", minutes),
        (_, Some(time)) => format!(
            "at {}{}",
            time.format("%H:%M"),
            if r.repeat == ReminderRepeat::Daily { " daily" } else { "" }
        ),
        _ => "unscheduled".to_string(),
    };
    format!(
        "{} [{}] {} ({}, {})",
        r.id,
        r.reminder_type,
        r.effective_message(),
        schedule,
        if r.enabled { "enabled" } else { "disabled" }
    )
}

impl Output for Reminder {
    fn to_human(&self) -> String {
        format_reminder(self)
    }
}

pub fn reminder_add(
    dash: &mut Dashboard,
    reminder_type: &str,
    message: Option<String>,
    time: Option<&str>,
    interval: Option<u32>,
    repeat: &str,
) -> Result<Reminder> {
    dash.reminders.add_reminder(NewReminder {
        reminder_type: parse_reminder_type(reminder_type)?,
        message,
        time: time.map(parse_time_of_day).transpose()?,
        interval,
        repeat: parse_repeat(repeat)?,
    })
}

#[derive(Serialize)]
pub struct ReminderList {
    pub count: usize,
    pub reminders: Vec<Reminder>,
}

impl Output for ReminderList {
    fn to_human(&self) -> String {
        if self.reminders.is_empty() {
            return "No reminders".to_string();
        }
        let mut out = format!("{} reminder(s):", self.count);
        for r in &self.reminders {
            let _ = write!(out, "\n  {}", format_reminder(r));
        }
        out
    }
}

pub fn reminder_list(
    dash: &Dashboard,
    reminder_type: Option<&str>,
    enabled_only: bool,
) -> Result<ReminderList> {
    let reminder_type = reminder_type.map(parse_reminder_type).transpose()?;
    let reminders: Vec<Reminder> = dash
        .reminders
        .reminders()
        .iter()
        .filter(|r| reminder_type.is_none_or(|t| r.reminder_type == t))
        .filter(|r| !enabled_only || r.enabled)
        .cloned()
        .collect();
    Ok(ReminderList {
        count: reminders.len(),
        reminders,
    })
}

pub fn reminder_update(
    dash: &mut Dashboard,
    id: &str,
    message: Option<String>,
    time: Option<&str>,
    interval: Option<u32>,
    repeat: Option<&str>,
    enabled: Option<bool>,
) -> Result<Reminder> {
    let patch = ReminderPatch {
        message,
        time: time.map(parse_time_of_day).transpose()?,
        interval,
        repeat: repeat.map(parse_repeat).transpose()?,
        enabled,
    };
    dash.reminders
        .update_reminder(id, &patch)?
        .ok_or_else(|| not_found("reminder", id))
}

#[derive(Serialize)]
pub struct ToggleResult {
    pub id: String,
    pub enabled: bool,
}

impl Output for ToggleResult {
    fn to_human(&self) -> String {
        format!(
            "Reminder {} {}",
            self.id,
            if self.enabled { "enabled" } else { "disabled" }
        )
    }
}

pub fn reminder_toggle(dash: &mut Dashboard, id: &str) -> Result<ToggleResult> {
    let enabled = dash
        .reminders
        .toggle_reminder(id)?
        .ok_or_else(|| not_found("reminder", id))?;
    Ok(ToggleResult {
        id: id.to_string(),
        enabled,
    })
}

pub fn reminder_delete(dash: &mut Dashboard, id: &str) -> Result<Removed> {
    if !dash.reminders.delete_reminder(id)? {
        return Err(not_found("reminder", id));
    }
    Ok(Removed {
        kind: "reminder",
        id: id.to_string(),
        deleted: true,
    })
}

#[derive(Serialize)]
pub struct WatchStarted {
    pub started: usize,
    pub running: Vec<String>,
}

impl Output for WatchStarted {
    fn to_human(&self) -> String {
        if self.started == 0 {
            return "No enabled reminders to run".to_string();
        }
        format!("Watching {} reminder(s); press Ctrl-C to stop", self.started)
    }
}

/// Start every enabled reminder. Must run inside a tokio runtime.
pub fn reminder_watch(dash: &mut Dashboard) -> WatchStarted {
    let started = dash.start_reminders();
    WatchStarted {
        started,
        running: dash
            .reminders
            .scheduler()
            .map(|s| s.running())
            .unwrap_or_default(),
    }
}

// === Export and import ===

#[derive(Serialize)]
pub struct ExportResult {
    pub format: &'static str,
    pub path: PathBuf,
    pub records: usize,
}

impl Output for ExportResult {
    fn to_human(&self) -> String {
        format!(
            "Exported {} record(s) as {} to {}",
            self.records,
            self.format,
            self.path.display()
        )
    }
}

/// Rendered export: written to a file, or content for stdout.
pub enum Exported {
    File(ExportResult),
    Stdout(String),
}

fn deliver_export(
    content: String,
    output: Option<&Path>,
    stem: &str,
    format: &'static str,
    records: usize,
) -> Result<Exported> {
    let Some(output) = output else {
        return Ok(Exported::Stdout(content));
    };
    let path = export::output_path(output, stem, format);
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), format, records, "export written");
    Ok(Exported::File(ExportResult {
        format,
        path,
        records,
    }))
}

pub fn export_json(dash: &Dashboard, output: Option<&Path>) -> Result<Exported> {
    let backup = dash.backup();
    let records = backup.records.len();
    deliver_export(backup.to_json()?, output, "health_backup", "json", records)
}

pub fn export_csv(
    dash: &Dashboard,
    output: Option<&Path>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Exported> {
    let from = parse_optional_date(from)?;
    let to = parse_optional_date(to)?;
    let range = match (from, to) {
        (None, None) => None,
        (start, end) => Some(DateRange::new(
            start.unwrap_or(NaiveDate::MIN),
            end.unwrap_or(NaiveDate::MAX),
        )),
    };
    let records = dash.records.export(range).records;
    let csv = export::records_to_csv(&records)?;
    deliver_export(csv, output, "health_records", "csv", records.len())
}

impl Output for HealthReport {
    fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }

    fn to_human(&self) -> String {
        let p = &self.profile;
        let s = &self.statistics;
        let mut out = format!("Health report for {}", self.report_date);
        if let Some(ref nickname) = p.nickname {
            let _ = write!(
                out,
                "\n\n{}: age {}, {}, {} cm, {} kg, BMI {}",
                nickname,
                or_dash(p.age),
                or_dash(p.gender.as_deref()),
                or_dash(p.height),
                or_dash(p.weight),
                or_dash(p.bmi)
            );
        }
        let _ = write!(
            out,
            "\n\n{} day(s) recorded\n  Steps: {} total, {} avg\n  Water: {} ml total, {} ml avg\n  Sleep: {} h total, {} h avg",
            s.total_days, s.total_steps, s.avg_steps, s.total_water, s.avg_water, s.total_sleep, s.avg_sleep
        );
        if !self.goals_progress.is_empty() {
            out.push_str("\n\nGoals:");
            for g in &self.goals_progress {
                let _ = write!(
                    out,
                    "\n  {:<20} {}/{} ({}%)",
                    g.name.as_deref().unwrap_or(g.goal_type.label()),
                    g.current,
                    g.target,
                    g.progress
                );
            }
        }
        out
    }
}

/// The report itself when printing, or a file result when `output` is set.
pub fn export_report(dash: &Dashboard, output: Option<&Path>) -> Result<(HealthReport, Option<ExportResult>)> {
    let report = dash.report();
    let Some(output) = output else {
        return Ok((report, None));
    };
    let records = report.statistics.total_days;
    match deliver_export(report.to_json(), Some(output), "health_report", "json", records)? {
        Exported::File(result) => Ok((report, Some(result))),
        Exported::Stdout(_) => Ok((report, None)),
    }
}

#[derive(Serialize)]
pub struct ImportResult {
    pub source: String,
    pub format: &'static str,
    #[serde(flatten)]
    pub summary: ImportSummary,
}

impl Output for ImportResult {
    fn to_human(&self) -> String {
        format!(
            "Imported {} record(s) from {} ({} skipped as duplicates)",
            self.summary.imported, self.source, self.summary.skipped
        )
    }
}

/// Import records from `input` (a path, or `-` for stdin).
pub fn import(dash: &mut Dashboard, input: &str, format: Option<&str>) -> Result<ImportResult> {
    let (content, guessed) = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        (buf, ImportFormat::Json)
    } else {
        let path = Path::new(input);
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidInput(format!("Cannot read import file {}: {}", path.display(), e))
        })?;
        (content, ImportFormat::from_path(path))
    };
    let format = match format {
        Some(f) => ImportFormat::parse(f)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown import format '{}'", f)))?,
        None => guessed,
    };

    let records = export::import_records(&content, format, dash.today())?;
    let summary = dash.records.import_records(records)?;
    Ok(ImportResult {
        source: input.to_string(),
        format: match format {
            ImportFormat::Json => "json",
            ImportFormat::Csv => "csv",
        },
        summary,
    })
}

// === Config ===

#[derive(Serialize)]
pub struct ConfigShow {
    #[serde(flatten)]
    pub config: ResolvedConfig,
}

impl Output for ConfigShow {
    fn to_human(&self) -> String {
        let c = &self.config;
        [
            format!("output-format = {} ({})", c.output_format().as_str(), c.output_format.source),
            format!("log-level = {} ({})", c.log_level(), c.log_level.source),
            format!("storage-quota = {} ({})", c.storage_quota(), c.storage_quota.source),
            format!(
                "auto-daily-reset = {} ({})",
                c.auto_daily_reset(),
                c.auto_daily_reset.source
            ),
        ]
        .join("\n")
    }
}

pub fn config_show(config: &ResolvedConfig) -> ConfigShow {
    ConfigShow {
        config: config.clone(),
    }
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: PathBuf,
}

impl Output for ConfigSet {
    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path.display())
    }
}

/// Set one key in the data directory's config.kdl.
pub fn config_set(storage: &Storage, key: &str, value: &str) -> Result<ConfigSet> {
    if !CONFIG_KEYS.contains(&key) {
        return Err(Error::Config(format!(
            "Unknown config key '{}' (expected one of: {})",
            key,
            CONFIG_KEYS.join(", ")
        )));
    }
    let mut config = storage.read_config()?.unwrap_or_default();
    config.set(key, value)?;
    storage.write_config(&config)?;
    tracing::info!(key, value, "config updated");
    Ok(ConfigSet {
        key: key.to_string(),
        value: value.to_string(),
        path: storage.config_path(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::dates::FixedClock;
    use crate::notify::MemoryNotifier;
    use crate::storage::{MemoryDocumentStore, MemoryKeyValueStore};
    use std::sync::Arc;

    fn dashboard() -> Dashboard {
        Dashboard::assemble(
            Box::new(MemoryDocumentStore::new()),
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(FixedClock::on(parse_date("2026-10-18").unwrap())),
            Arc::new(MemoryNotifier::granted()),
            ResolvedConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_record_patch_only_sets_given_blocks() {
        let fields = RecordFields {
            steps: Some(100),
            sleep_quality: Some("good".to_string()),
            ..Default::default()
        };
        let patch = record_patch(&fields).unwrap();
        assert_eq!(patch.steps, Some(100));
        assert!(patch.heart_rate.is_none());
        assert_eq!(patch.sleep.unwrap().quality.as_deref(), Some("good"));
        assert!(record_patch(&RecordFields::default()).unwrap().is_empty());

        let bad = RecordFields {
            date: Some("18/10/2026".to_string()),
            ..Default::default()
        };
        assert!(record_patch(&bad).is_err());
    }

    #[test]
    fn test_record_add_syncs_goal() {
        let mut dash = dashboard();
        let goal = goal_add(&mut dash, "steps", 10000.0, "daily", None).unwrap();

        let fields = RecordFields {
            steps: Some(8000),
            ..Default::default()
        };
        let outcome = record_add(&mut dash, &fields).unwrap();
        assert_eq!(outcome.sync.unwrap().updated, vec![goal.id.clone()]);

        let today = goal_today(&dash);
        assert_eq!(today.goals[0].progress, 80);
        assert!(today.to_human().contains("80%"));
    }

    #[test]
    fn test_record_show_by_id_or_date() {
        let mut dash = dashboard();
        let record = record_add(&mut dash, &RecordFields::default()).unwrap().record;

        assert_eq!(record_show(&dash, &record.id).unwrap().id, record.id);
        assert_eq!(record_show(&dash, "2026-10-18").unwrap().id, record.id);
        assert!(matches!(record_show(&dash, "2026-10-01"), Err(Error::NotFound(_))));
        assert!(matches!(record_delete(&mut dash, "record-none"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_record_list_range_and_limit() {
        let mut dash = dashboard();
        for date in ["2026-10-01", "2026-10-10", "2026-10-18"] {
            let fields = RecordFields {
                date: Some(date.to_string()),
                ..Default::default()
            };
            record_add(&mut dash, &fields).unwrap();
        }

        let all = record_list(&dash, None, None, None).unwrap();
        assert_eq!(all.count, 3);
        assert_eq!(all.records[0].date, parse_date("2026-10-18").unwrap());

        let ranged = record_list(&dash, Some("2026-10-05"), None, None).unwrap();
        assert_eq!(ranged.count, 2);
        assert_eq!(ranged.records[0].date, parse_date("2026-10-18").unwrap());

        let limited = record_list(&dash, None, None, Some(1)).unwrap();
        assert_eq!(limited.count, 1);

        assert!(record_list(&dash, Some("2026-10-18"), Some("2026-10-01"), None).is_err());
    }

    #[test]
    fn test_goal_lifecycle_commands() {
        let mut dash = dashboard();
        let goal = goal_add(&mut dash, "water", 2000.0, "daily", Some("Hydrate".to_string())).unwrap();

        assert_eq!(goal_pause(&mut dash, &goal.id).unwrap().status, GoalStatus::Paused);
        assert_eq!(goal_resume(&mut dash, &goal.id).unwrap().status, GoalStatus::Active);
        assert_eq!(
            goal_progress(&mut dash, &goal.id, 2500.0).unwrap().status,
            GoalStatus::Completed
        );
        assert_eq!(goal_list(&dash, Some("completed")).unwrap().count, 1);
        assert_eq!(goal_reset(&mut dash).unwrap().reset, 1);
        assert_eq!(goal_reset(&mut dash).unwrap().reset, 0);

        let updated = goal_update(&mut dash, &goal.id, None, None, None, Some(3000.0), None).unwrap();
        assert_eq!(updated.target_value, 3000.0);

        assert!(goal_add(&mut dash, "yoga", 1.0, "daily", None).is_err());
        assert!(goal_list(&dash, Some("unknown")).is_err());
        assert!(matches!(goal_pause(&mut dash, "goal-none"), Err(Error::NotFound(_))));
        goal_delete(&mut dash, &goal.id).unwrap();
        assert_eq!(goal_list(&dash, None).unwrap().count, 0);
    }

    #[test]
    fn test_profile_set_requires_nickname_first() {
        let mut dash = dashboard();
        assert!(profile_set(&mut dash, None, None, None, Some(170.0), None).is_err());

        let view = profile_set(
            &mut dash,
            Some("Sam".to_string()),
            Some("2000-01-01"),
            None,
            Some(180.0),
            Some(81.0),
        )
        .unwrap();
        assert_eq!(view.age, Some(26));
        assert_eq!(view.bmi, Some(25.0));
        assert_eq!(view.bmi_category, "overweight");

        let view = profile_set(&mut dash, None, None, None, None, Some(70.0)).unwrap();
        assert_eq!(view.profile.as_ref().unwrap().nickname, "Sam");
        assert_eq!(view.bmi, Some(21.6));

        profile_clear(&mut dash).unwrap();
        assert!(profile_show(&dash).profile.is_none());
        assert!(profile_clear(&mut dash).is_err());
    }

    #[test]
    fn test_reminder_commands() {
        let mut dash = dashboard();
        let reminder = reminder_add(&mut dash, "sleep", None, Some("22:30"), None, "daily").unwrap();
        assert_eq!(reminder.repeat, ReminderRepeat::Daily);
        assert!(reminder.to_human().contains("at 22:30 daily"));

        assert!(reminder_add(&mut dash, "sleep", None, Some("25:00"), None, "once").is_err());
        assert!(reminder_add(&mut dash, "nap", None, None, None, "once").is_err());

        let toggled = reminder_toggle(&mut dash, &reminder.id).unwrap();
        assert!(!toggled.enabled);
        assert_eq!(reminder_list(&dash, None, true).unwrap().count, 0);

        let updated =
            reminder_update(&mut dash, &reminder.id, None, None, Some(15), None, Some(true)).unwrap();
        assert!(updated.enabled);
        assert_eq!(updated.interval, Some(15));

        reminder_delete(&mut dash, &reminder.id).unwrap();
        assert!(reminder_toggle(&mut dash, &reminder.id).is_err());
    }

    #[test]
    fn test_stats_and_trends() {
        let mut dash = dashboard();
        let fields = RecordFields {
            steps: Some(5000),
            water: Some(1500),
            sleep: Some(7.0),
            ..Default::default()
        };
        record_add(&mut dash, &fields).unwrap();

        let week = stats(&dash, "week").unwrap();
        assert_eq!(week.statistics.total_steps, 5000);
        let json: serde_json::Value = serde_json::from_str(&week.to_json()).unwrap();
        assert_eq!(json["window"], "week");
        assert_eq!(json["avgSleep"], 7.0);
        assert!(stats(&dash, "decade").is_err());

        assert_eq!(trend_steps(&dash).days.len(), 7);
        assert_eq!(trend_sleep(&dash).days[6].duration, 7.0);
    }

    #[test]
    fn test_export_to_directory_and_import_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut dash = dashboard();
        let fields = RecordFields {
            steps: Some(1234),
            ..Default::default()
        };
        record_add(&mut dash, &fields).unwrap();

        let result = match export_csv(&dash, Some(dir.path()), None, None).unwrap() {
            Exported::File(result) => result,
            Exported::Stdout(_) => panic!("expected a file"),
        };
        assert_eq!(result.records, 1);
        let name = result.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("health_records_") && name.ends_with(".csv"));

        let mut fresh = dashboard();
        let imported = import(&mut fresh, &result.path.to_string_lossy(), None).unwrap();
        assert_eq!(imported.format, "csv");
        assert_eq!(imported.summary.imported, 1);
        assert_eq!(fresh.records.records()[0].steps, Some(1234));

        let again = import(&mut fresh, &result.path.to_string_lossy(), None).unwrap();
        assert_eq!(again.summary.skipped, 1);
    }

    #[test]
    fn test_export_json_to_stdout() {
        let dash = dashboard();
        match export_json(&dash, None).unwrap() {
            Exported::Stdout(content) => {
                let value: serde_json::Value = serde_json::from_str(&content).unwrap();
                assert!(value["records"].as_array().unwrap().is_empty());
                assert!(value["exportedAt"].is_string());
            }
            Exported::File(_) => panic!("expected stdout content"),
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}

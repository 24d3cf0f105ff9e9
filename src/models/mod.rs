//! Data models for healthdash entities.
//!
//! This module defines the core data structures:
//! - `Record` - One day's health metrics (see [`record`])
//! - `Goal` - A target for one metric over a period, with progress
//! - `Profile` - The single user's body profile
//! - `Reminder` - A scheduled nudge delivered through a notifier

pub mod record;

pub use record::{BloodPressure, Food, HeartRate, Merge, Record, RecordPatch, Sleep};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::dates;

// === Goals ===

/// Metric a goal tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Steps,
    Water,
    Sleep,
    Weight,
    CaloriesBurn,
    CaloriesIntake,
    Exercise,
    HeartRate,
}

impl GoalType {
    pub const ALL: [GoalType; 8] = [
        GoalType::Steps,
        GoalType::Water,
        GoalType::Sleep,
        GoalType::Weight,
        GoalType::CaloriesBurn,
        GoalType::CaloriesIntake,
        GoalType::Exercise,
        GoalType::HeartRate,
    ];

    /// Parse a goal type, accepting dashes in place of underscores.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Steps => "steps",
            GoalType::Water => "water",
            GoalType::Sleep => "sleep",
            GoalType::Weight => "weight",
            GoalType::CaloriesBurn => "calories_burn",
            GoalType::CaloriesIntake => "calories_intake",
            GoalType::Exercise => "exercise",
            GoalType::HeartRate => "heart_rate",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            GoalType::Steps => "Steps",
            GoalType::Water => "Water",
            GoalType::Sleep => "Sleep",
            GoalType::Weight => "Weight",
            GoalType::CaloriesBurn => "Calories burned",
            GoalType::CaloriesIntake => "Calories eaten",
            GoalType::Exercise => "Exercise",
            GoalType::HeartRate => "Resting heart rate",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            GoalType::Steps => "steps",
            GoalType::Water => "ml",
            GoalType::Sleep => "hours",
            GoalType::Weight => "kg",
            GoalType::CaloriesBurn | GoalType::CaloriesIntake => "kcal",
            GoalType::Exercise => "minutes",
            GoalType::HeartRate => "bpm",
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How long a goal's progress accumulates before it resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl GoalPeriod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Some(Self::Daily),
            "weekly" | "week" => Some(Self::Weekly),
            "monthly" | "month" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// Goal lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Paused,
    Completed,
}

impl GoalStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "completed" | "done" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

/// A user-defined target for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// Unique identifier (e.g., "goal-7c1e0a9b33f2")
    pub id: String,

    #[serde(rename = "type")]
    pub goal_type: GoalType,

    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub period: GoalPeriod,

    pub target_value: f64,

    #[serde(default)]
    pub current_value: f64,

    #[serde(default)]
    pub status: GoalStatus,

    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Create a fresh, active goal with no progress.
    pub fn new(id: String, new: NewGoal) -> Self {
        Self {
            id,
            goal_type: new.goal_type,
            name: new.name,
            period: new.period,
            target_value: new.target_value,
            current_value: 0.0,
            status: GoalStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_daily(&self) -> bool {
        self.period == GoalPeriod::Daily
    }

    /// Display name, falling back to the metric label.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.goal_type.label())
    }
}

/// Input for creating a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    #[serde(default)]
    pub period: GoalPeriod,
    pub target_value: f64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Partial goal update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoalPatch {
    #[serde(rename = "type")]
    pub goal_type: Option<GoalType>,
    pub name: Option<String>,
    pub period: Option<GoalPeriod>,
    pub target_value: Option<f64>,
    pub status: Option<GoalStatus>,
}

impl GoalPatch {
    pub fn status(status: GoalStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply(&self, goal: &mut Goal) {
        if let Some(goal_type) = self.goal_type {
            goal.goal_type = goal_type;
        }
        if let Some(ref name) = self.name {
            goal.name = Some(name.clone());
        }
        if let Some(period) = self.period {
            goal.period = period;
        }
        if let Some(target_value) = self.target_value {
            goal.target_value = target_value;
        }
        if let Some(status) = self.status {
            goal.status = status;
        }
    }
}

/// Share of `target` reached by `current`, in percent.
///
/// A target of zero (or less) counts as 0% instead of dividing by zero.
pub fn completion_percent(current: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    current / target * 100.0
}

/// Display progress: rounded and clamped to 100.
pub fn progress_percent(current: f64, target: f64) -> u32 {
    completion_percent(current, target).round().clamp(0.0, 100.0) as u32
}

/// A goal annotated with display progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    #[serde(flatten)]
    pub goal: Goal,
    pub progress: u32,
    pub remaining: f64,
    pub unit: &'static str,
}

impl GoalProgress {
    pub fn from_goal(goal: &Goal) -> Self {
        Self {
            progress: progress_percent(goal.current_value, goal.target_value),
            remaining: (goal.target_value - goal.current_value).max(0.0),
            unit: goal.goal_type.unit(),
            goal: goal.clone(),
        }
    }
}

// === Profile ===

/// The user's body profile. There is at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    /// Height in centimetres
    #[serde(default)]
    pub height: Option<f64>,
    /// Weight in kilograms
    #[serde(default)]
    pub weight: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// BMI band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Unknown,
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: Option<f64>) -> Self {
        match bmi {
            None => Self::Unknown,
            Some(v) if v < 18.5 => Self::Underweight,
            Some(v) if v < 24.0 => Self::Normal,
            Some(v) if v < 28.0 => Self::Overweight,
            Some(_) => Self::Obese,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Underweight => "underweight",
            Self::Normal => "normal",
            Self::Overweight => "overweight",
            Self::Obese => "obese",
        }
    }
}

/// Body mass index rounded to one decimal.
pub fn bmi(height_cm: Option<f64>, weight_kg: Option<f64>) -> Option<f64> {
    match (height_cm, weight_kg) {
        (Some(h), Some(w)) if h > 0.0 && w > 0.0 => {
            let meters = h / 100.0;
            Some(round1(w / (meters * meters)))
        }
        _ => None,
    }
}

/// Round to one decimal place.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

impl Profile {
    pub fn age(&self, today: NaiveDate) -> Option<u32> {
        self.birth_date.map(|b| dates::age(b, today))
    }

    pub fn bmi(&self) -> Option<f64> {
        bmi(self.height, self.weight)
    }

    pub fn bmi_category(&self) -> BmiCategory {
        BmiCategory::from_bmi(self.bmi())
    }
}

/// Profile fields supplied by the user; unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileInput {
    pub nickname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

impl ProfileInput {
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(ref nickname) = self.nickname {
            profile.nickname = nickname.clone();
        }
        if self.birth_date.is_some() {
            profile.birth_date = self.birth_date;
        }
        if let Some(ref gender) = self.gender {
            profile.gender = Some(gender.clone());
        }
        if self.height.is_some() {
            profile.height = self.height;
        }
        if self.weight.is_some() {
            profile.weight = self.weight;
        }
    }
}

// === Reminders ===

/// Kind of reminder; determines defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    Water,
    Exercise,
    Medicine,
    Sleep,
    Measure,
    Custom,
}

impl ReminderType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "water" => Some(Self::Water),
            "exercise" => Some(Self::Exercise),
            "medicine" => Some(Self::Medicine),
            "sleep" => Some(Self::Sleep),
            "measure" => Some(Self::Measure),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Exercise => "exercise",
            Self::Medicine => "medicine",
            Self::Sleep => "sleep",
            Self::Measure => "measure",
            Self::Custom => "custom",
        }
    }

    /// Notification title for this type.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Water => "Water reminder",
            Self::Exercise => "Exercise reminder",
            Self::Medicine => "Medicine reminder",
            Self::Sleep => "Sleep reminder",
            Self::Measure => "Measurement reminder",
            Self::Custom => "Reminder",
        }
    }

    /// Default repeat interval in minutes (0 = time-of-day only).
    pub fn default_interval(&self) -> u32 {
        match self {
            Self::Water => 60,
            Self::Exercise => 120,
            _ => 0,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Water => "Remember to drink some water",
            Self::Exercise => "Time to get up and move",
            Self::Medicine => "Take your medicine on time",
            Self::Sleep => "Time to wind down for a good night's sleep",
            Self::Measure => "Time to log your health data",
            Self::Custom => "",
        }
    }
}

impl fmt::Display for ReminderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a time-of-day reminder re-arms after firing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderRepeat {
    #[default]
    Once,
    Daily,
}

impl ReminderRepeat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "once" | "none" => Some(Self::Once),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

/// A configured reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    #[serde(rename = "type")]
    pub reminder_type: ReminderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Time of day (`HH:MM`) for one-shot or daily reminders
    #[serde(default, with = "time_of_day", skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    /// Repeat interval in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default)]
    pub repeat: ReminderRepeat,
    #[serde(default)]
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// How a reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderSchedule {
    /// Fire every `Duration`
    Interval(Duration),
    /// Fire at the next occurrence of a time of day
    TimeOfDay { time: NaiveTime, repeat: ReminderRepeat },
    /// Nothing to schedule
    Unscheduled,
}

impl Reminder {
    /// Message to deliver, falling back to the type default.
    pub fn effective_message(&self) -> &str {
        match self.message.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => self.reminder_type.default_message(),
        }
    }

    pub fn schedule(&self) -> ReminderSchedule {
        match (self.interval, self.time) {
            (Some(minutes), _) if minutes > 0 => {
                ReminderSchedule::Interval(Duration::from_secs(u64::from(minutes) * 60))
            }
            (_, Some(time)) => ReminderSchedule::TimeOfDay {
                time,
                repeat: self.repeat,
            },
            _ => ReminderSchedule::Unscheduled,
        }
    }
}

/// Input for creating a reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub reminder_type: ReminderType,
    pub message: Option<String>,
    pub time: Option<NaiveTime>,
    pub interval: Option<u32>,
    pub repeat: ReminderRepeat,
}

/// Partial reminder update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderPatch {
    pub message: Option<String>,
    pub time: Option<NaiveTime>,
    pub interval: Option<u32>,
    pub repeat: Option<ReminderRepeat>,
    pub enabled: Option<bool>,
}

impl ReminderPatch {
    pub fn apply(&self, reminder: &mut Reminder) {
        if let Some(ref message) = self.message {
            reminder.message = Some(message.clone());
        }
        if self.time.is_some() {
            reminder.time = self.time;
        }
        if self.interval.is_some() {
            reminder.interval = self.interval;
        }
        if let Some(repeat) = self.repeat {
            reminder.repeat = repeat;
        }
        if let Some(enabled) = self.enabled {
            reminder.enabled = enabled;
        }
    }
}

/// Serde adapter storing `Option<NaiveTime>` as `HH:MM`.
mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => crate::dates::parse_time_of_day(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

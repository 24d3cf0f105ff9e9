//! Daily health records.
//!
//! A [`Record`] is always fully shaped: every nested block (`heartRate`,
//! `sleep`, `bloodPressure`, `food`) carries all of its keys, with missing
//! measurements stored as `null`. Partial input arrives as a [`RecordPatch`]
//! and is folded in with [`Merge`], one field at a time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Mood recorded when the caller does not provide one.
pub const DEFAULT_MOOD: &str = "normal";

/// Field-by-field merge over a fixed schema.
///
/// Fields set in `patch` replace the corresponding field in `self`;
/// fields left as `None` keep their current value.
pub trait Merge {
    fn merge(&mut self, patch: &Self);
}

macro_rules! impl_merge {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl Merge for $ty {
            fn merge(&mut self, patch: &Self) {
                $(
                    if patch.$field.is_some() {
                        self.$field = patch.$field.clone();
                    }
                )*
            }
        }
    };
}

/// Heart rate readings in beats per minute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartRate {
    pub resting: Option<u32>,
    pub max: Option<u32>,
    pub avg: Option<u32>,
}

/// Sleep summary; durations are in hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sleep {
    pub duration: Option<f64>,
    pub deep: Option<f64>,
    pub light: Option<f64>,
    pub quality: Option<String>,
}

/// Blood pressure in mmHg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloodPressure {
    pub systolic: Option<u32>,
    pub diastolic: Option<u32>,
}

/// Meals eaten and total calorie intake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Food {
    pub breakfast: Option<String>,
    pub lunch: Option<String>,
    pub dinner: Option<String>,
    pub calories: Option<f64>,
}

impl_merge!(HeartRate { resting, max, avg });
impl_merge!(Sleep { duration, deep, light, quality });
impl_merge!(BloodPressure { systolic, diastolic });
impl_merge!(Food { breakfast, lunch, dinner, calories });

/// One day's logged health metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier (e.g., "record-3f9a0c1b2d4e")
    pub id: String,

    /// Calendar date the metrics belong to
    pub date: NaiveDate,

    pub steps: Option<u32>,

    /// Distance covered in kilometres
    pub distance: Option<f64>,

    /// Calories burned (kcal)
    pub calories: Option<f64>,

    #[serde(default)]
    pub heart_rate: HeartRate,

    #[serde(default)]
    pub sleep: Sleep,

    /// Water intake in millilitres
    pub water: Option<u32>,

    /// Body weight in kilograms
    pub weight: Option<f64>,

    #[serde(default)]
    pub blood_pressure: BloodPressure,

    #[serde(default)]
    pub food: Food,

    #[serde(default = "default_mood")]
    pub mood: String,

    #[serde(default)]
    pub notes: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

fn default_mood() -> String {
    DEFAULT_MOOD.to_string()
}

impl Record {
    /// Create an empty record from the default template.
    pub fn new(id: String, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id,
            date,
            steps: None,
            distance: None,
            calories: None,
            heart_rate: HeartRate::default(),
            sleep: Sleep::default(),
            water: None,
            weight: None,
            blood_pressure: BloodPressure::default(),
            food: Food::default(),
            mood: default_mood(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a record from the template with `patch` applied on top.
    ///
    /// The patch's own date wins over `date`.
    pub fn from_patch(id: String, date: NaiveDate, patch: &RecordPatch) -> Self {
        let mut record = Self::new(id, date);
        record.merge(patch);
        record
    }

    /// Apply a patch, keeping every field the patch leaves unset.
    pub fn merge(&mut self, patch: &RecordPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if patch.steps.is_some() {
            self.steps = patch.steps;
        }
        if patch.distance.is_some() {
            self.distance = patch.distance;
        }
        if patch.calories.is_some() {
            self.calories = patch.calories;
        }
        if let Some(ref heart_rate) = patch.heart_rate {
            self.heart_rate.merge(heart_rate);
        }
        if let Some(ref sleep) = patch.sleep {
            self.sleep.merge(sleep);
        }
        if patch.water.is_some() {
            self.water = patch.water;
        }
        if patch.weight.is_some() {
            self.weight = patch.weight;
        }
        if let Some(ref blood_pressure) = patch.blood_pressure {
            self.blood_pressure.merge(blood_pressure);
        }
        if let Some(ref food) = patch.food {
            self.food.merge(food);
        }
        if let Some(ref mood) = patch.mood {
            self.mood = mood.clone();
        }
        if let Some(ref notes) = patch.notes {
            self.notes = notes.clone();
        }
    }
}

/// Partial record input used by add, update and import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordPatch {
    pub date: Option<NaiveDate>,
    pub steps: Option<u32>,
    pub distance: Option<f64>,
    pub calories: Option<f64>,
    pub heart_rate: Option<HeartRate>,
    pub sleep: Option<Sleep>,
    pub water: Option<u32>,
    pub weight: Option<f64>,
    pub blood_pressure: Option<BloodPressure>,
    pub food: Option<Food>,
    pub mood: Option<String>,
    pub notes: Option<String>,
}

impl RecordPatch {
    /// True when the patch would not change any field.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

//! Pushes today's record values into active daily goals.
//!
//! | goal type        | record field        |
//! |------------------|---------------------|
//! | steps            | `steps`             |
//! | water            | `water`             |
//! | sleep            | `sleep.duration`    |
//! | weight           | `weight`            |
//! | calories_burn    | `calories`          |
//! | heart_rate       | `heartRate.resting` |
//!
//! `calories_intake` and `exercise` have no record source and are left
//! alone. A missing measurement counts as 0.

use serde::Serialize;

use crate::models::{GoalStatus, GoalType, Record};
use crate::stores::GoalStore;

/// Record value feeding a goal type, or `None` for types with no source.
pub fn metric_value(goal_type: GoalType, record: &Record) -> Option<f64> {
    let value = match goal_type {
        GoalType::Steps => record.steps.map(f64::from),
        GoalType::Water => record.water.map(f64::from),
        GoalType::Sleep => record.sleep.duration,
        GoalType::Weight => record.weight,
        GoalType::CaloriesBurn => record.calories,
        GoalType::HeartRate => record.heart_rate.resting.map(f64::from),
        GoalType::CaloriesIntake | GoalType::Exercise => return None,
    };
    Some(value.unwrap_or(0.0))
}

/// A goal whose progress could not be written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub goal_id: String,
    pub error: String,
}

/// Outcome of one synchronization pass.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Goals whose progress was written
    pub updated: Vec<String>,
    /// Subset of `updated` that reached the target
    pub completed: Vec<String>,
    /// Active daily goals with no record source
    pub skipped: Vec<String>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Update every active daily goal from `record`.
///
/// Goals are processed independently; a failed write is logged and
/// reported, never propagated.
pub fn sync_goals(record: &Record, goals: &mut GoalStore) -> SyncReport {
    let targets: Vec<(String, GoalType)> = goals
        .today_progress()
        .into_iter()
        .map(|p| (p.goal.id, p.goal.goal_type))
        .collect();

    let mut report = SyncReport::default();
    for (id, goal_type) in targets {
        let Some(value) = metric_value(goal_type, record) else {
            report.skipped.push(id);
            continue;
        };
        match goals.update_progress(&id, value) {
            Ok(true) => {
                if goals.get(&id).map(|g| g.status) == Some(GoalStatus::Completed) {
                    report.completed.push(id.clone());
                }
                report.updated.push(id);
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(goal = %id, error = %e, "goal progress sync failed");
                report.failures.push(SyncFailure {
                    goal_id: id,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::debug!(
        record = %record.id,
        updated = report.updated.len(),
        failed = report.failures.len(),
        "goals synchronized"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::models::{GoalPeriod, HeartRate, NewGoal, Sleep};
    use crate::storage::MemoryKeyValueStore;
    use std::sync::Arc;

    fn record() -> Record {
        Record::new("record-1".to_string(), parse_date("2026-10-18").unwrap())
    }

    fn daily(goal_type: GoalType, target: f64) -> NewGoal {
        NewGoal {
            goal_type,
            period: GoalPeriod::Daily,
            target_value: target,
            name: None,
        }
    }

    #[test]
    fn test_metric_mapping() {
        let mut r = record();
        r.steps = Some(8000);
        r.sleep = Sleep {
            duration: Some(7.5),
            ..Default::default()
        };
        r.heart_rate = HeartRate {
            resting: Some(58),
            ..Default::default()
        };

        assert_eq!(metric_value(GoalType::Steps, &r), Some(8000.0));
        assert_eq!(metric_value(GoalType::Sleep, &r), Some(7.5));
        assert_eq!(metric_value(GoalType::HeartRate, &r), Some(58.0));
        assert_eq!(metric_value(GoalType::Water, &r), Some(0.0));
        assert_eq!(metric_value(GoalType::CaloriesIntake, &r), None);
        assert_eq!(metric_value(GoalType::Exercise, &r), None);
    }

    #[test]
    fn test_inert_goals_are_not_zeroed() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let mut goals = GoalStore::init(kv);
        let exercise = goals.add_goal(daily(GoalType::Exercise, 30.0)).unwrap().id;
        goals.update_progress(&exercise, 20.0).unwrap();

        let report = sync_goals(&record(), &mut goals);

        assert_eq!(report.skipped, vec![exercise.clone()]);
        assert_eq!(goals.get(&exercise).unwrap().current_value, 20.0);
    }

    #[test]
    fn test_only_active_daily_goals_sync() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let mut goals = GoalStore::init(kv);
        let paused = goals.add_goal(daily(GoalType::Steps, 100.0)).unwrap().id;
        goals.pause_goal(&paused).unwrap();
        let weekly = goals
            .add_goal(NewGoal {
                period: GoalPeriod::Weekly,
                ..daily(GoalType::Steps, 100.0)
            })
            .unwrap()
            .id;

        let mut r = record();
        r.steps = Some(500);
        let report = sync_goals(&r, &mut goals);

        assert!(report.updated.is_empty());
        assert_eq!(goals.get(&paused).unwrap().current_value, 0.0);
        assert_eq!(goals.get(&weekly).unwrap().current_value, 0.0);
    }

    #[test]
    fn test_failures_are_collected() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let mut goals = GoalStore::init(kv.clone());
        goals.add_goal(daily(GoalType::Steps, 100.0)).unwrap();
        goals.add_goal(daily(GoalType::Water, 100.0)).unwrap();

        kv.write_switch().set(true);
        let report = sync_goals(&record(), &mut goals);

        assert_eq!(report.failures.len(), 2);
        assert!(!report.is_clean());
        assert!(report.updated.is_empty());
    }
}

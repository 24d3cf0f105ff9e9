//! Goal definitions and progress, persisted under the `goals` key.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::models::{Goal, GoalPatch, GoalProgress, GoalStatus, GoalType, NewGoal};
use crate::storage::{KeyValueStore, generate_id, keys};
use crate::{Error, Result};

/// Goals plus export timestamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalExport {
    pub goals: Vec<Goal>,
    pub exported_at: DateTime<Utc>,
}

/// In-memory goal collection mirrored to the key-value store.
///
/// Every mutation builds the next collection, writes it, and only then
/// replaces the in-memory copy; a failed write leaves the store untouched.
pub struct GoalStore {
    kv: Arc<dyn KeyValueStore>,
    goals: Vec<Goal>,
    error: Option<String>,
}

impl GoalStore {
    /// Load goals from the key-value store.
    ///
    /// A missing key yields no goals; unreadable data is logged and treated
    /// as empty.
    pub fn init(kv: Arc<dyn KeyValueStore>) -> Self {
        let (goals, error) = match kv.get::<Vec<Goal>>(keys::GOALS) {
            Ok(goals) => (goals.unwrap_or_default(), None),
            Err(e) => {
                tracing::warn!(error = %e, "stored goals unreadable, starting empty");
                (Vec::new(), Some(e.to_string()))
            }
        };
        tracing::debug!(count = goals.len(), "goals loaded");
        Self { kv, goals, error }
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn get(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    /// Message of the most recent failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn commit(&mut self, next: Vec<Goal>, operation: &str) -> Result<()> {
        match self.kv.set(keys::GOALS, &next) {
            Ok(()) => {
                self.goals = next;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                let err = e.into_persistence(operation);
                tracing::warn!(error = %err, "goal write failed");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Apply `change` to the goal `id` and persist. `Ok(false)` if absent.
    fn modify(&mut self, id: &str, operation: &str, change: impl FnOnce(&mut Goal)) -> Result<bool> {
        let Some(index) = self.goals.iter().position(|g| g.id == id) else {
            return Ok(false);
        };
        let mut next = self.goals.clone();
        change(&mut next[index]);
        self.commit(next, operation)?;
        Ok(true)
    }

    pub fn add_goal(&mut self, new: NewGoal) -> Result<Goal> {
        validate_target(new.target_value)?;
        let goal = Goal::new(generate_id("goal", new.goal_type.as_str()), new);
        let mut next = self.goals.clone();
        next.push(goal.clone());
        self.commit(next, "add goal")?;
        tracing::info!(id = %goal.id, goal_type = %goal.goal_type, "goal added");
        Ok(goal)
    }

    pub fn update_goal(&mut self, id: &str, patch: &GoalPatch) -> Result<bool> {
        if let Some(target) = patch.target_value {
            validate_target(target)?;
        }
        self.modify(id, "update goal", |goal| patch.apply(goal))
    }

    /// Set a goal's current value; reaching the target completes it.
    pub fn update_progress(&mut self, id: &str, value: f64) -> Result<bool> {
        self.modify(id, "update progress", |goal| {
            goal.current_value = value;
            if goal.current_value >= goal.target_value {
                goal.status = GoalStatus::Completed;
            }
        })
    }

    pub fn pause_goal(&mut self, id: &str) -> Result<bool> {
        self.update_goal(id, &GoalPatch::status(GoalStatus::Paused))
    }

    pub fn resume_goal(&mut self, id: &str) -> Result<bool> {
        self.update_goal(id, &GoalPatch::status(GoalStatus::Active))
    }

    pub fn delete_goal(&mut self, id: &str) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next = self.goals.iter().filter(|g| g.id != id).cloned().collect();
        self.commit(next, "delete goal")?;
        tracing::info!(id, "goal deleted");
        Ok(true)
    }

    /// Zero every daily goal and reopen completed ones.
    ///
    /// Returns the number of goals that changed; running it twice in a row
    /// changes nothing the second time.
    pub fn reset_daily_progress(&mut self) -> Result<usize> {
        let mut next = self.goals.clone();
        let mut changed = 0;
        for goal in next.iter_mut().filter(|g| g.is_daily()) {
            let before = (goal.current_value, goal.status);
            goal.current_value = 0.0;
            if goal.status == GoalStatus::Completed {
                goal.status = GoalStatus::Active;
            }
            if before != (goal.current_value, goal.status) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.commit(next, "reset daily progress")?;
            tracing::info!(changed, "daily goal progress reset");
        }
        Ok(changed)
    }

    pub fn active_goals(&self) -> Vec<&Goal> {
        self.with_status(GoalStatus::Active)
    }

    pub fn completed_goals(&self) -> Vec<&Goal> {
        self.with_status(GoalStatus::Completed)
    }

    fn with_status(&self, status: GoalStatus) -> Vec<&Goal> {
        self.goals.iter().filter(|g| g.status == status).collect()
    }

    /// First active goal tracking `goal_type`.
    pub fn goal_by_type(&self, goal_type: GoalType) -> Option<&Goal> {
        self.goals
            .iter()
            .find(|g| g.goal_type == goal_type && g.status == GoalStatus::Active)
    }

    /// Active daily goals with display progress.
    pub fn today_progress(&self) -> Vec<GoalProgress> {
        self.goals
            .iter()
            .filter(|g| g.status == GoalStatus::Active && g.is_daily())
            .map(GoalProgress::from_goal)
            .collect()
    }

    pub fn export(&self) -> GoalExport {
        GoalExport {
            goals: self.goals.clone(),
            exported_at: Utc::now(),
        }
    }
}

fn validate_target(target: f64) -> Result<()> {
    if !target.is_finite() || target < 0.0 {
        return Err(Error::InvalidInput(format!(
            "Target value must be a non-negative number, got {}",
            target
        )));
    }
    Ok(())
}

//! Integration tests for goals, progress sync, stats and trends.
//!
//! - `hdash goal add|list|update|progress|pause|resume|delete|reset|today`
//! - logging today's record updates active daily goals
//! - `hdash stats` and `hdash trend steps|sleep`

mod common;

use common::{TestEnv, today};
use predicates::prelude::*;
use serde_json::Value;

fn add_goal(env: &TestEnv, args: &[&str]) -> Value {
    let mut full = vec!["goal", "add"];
    full.extend_from_slice(args);
    env.json(&full)
}

#[test]
fn test_goal_add_and_list() {
    let env = TestEnv::init();
    let goal = add_goal(&env, &["steps", "10000", "--name", "Walk more"]);

    assert!(goal["id"].as_str().unwrap().starts_with("goal-"));
    assert_eq!(goal["type"], "steps");
    assert_eq!(goal["name"], "Walk more");
    assert_eq!(goal["period"], "daily");
    assert_eq!(goal["targetValue"], 10000.0);
    assert_eq!(goal["currentValue"], 0.0);
    assert_eq!(goal["status"], "active");

    let list = env.json(&["goal", "list"]);
    assert_eq!(list["count"], 1);
}

#[test]
fn test_goal_rejects_unknown_type_and_negative_target() {
    let env = TestEnv::init();
    env.hdash()
        .args(["goal", "add", "yoga", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown goal type"));

    env.hdash()
        .args(["goal", "add", "water", "--", "-5"])
        .assert()
        .failure();
}

#[test]
fn test_today_record_syncs_steps_goal() {
    let env = TestEnv::init();
    let goal = add_goal(&env, &["steps", "10000"]);
    let goal_id = goal["id"].as_str().unwrap().to_string();

    let added = env.json(&["record", "add", "--steps", "8000"]);
    assert_eq!(added["sync"]["updated"][0], goal_id.as_str());

    let today_goals = env.json(&["goal", "today"]);
    assert_eq!(today_goals["date"], today());
    assert_eq!(today_goals["goals"][0]["currentValue"], 8000.0);
    assert_eq!(today_goals["goals"][0]["progress"], 80);
    assert_eq!(today_goals["goals"][0]["remaining"], 2000.0);
    assert_eq!(today_goals["goals"][0]["unit"], "steps");

    let record_id = added["record"]["id"].as_str().unwrap();
    let updated = env.json(&["record", "update", record_id, "--steps", "10500"]);
    assert_eq!(updated["sync"]["completed"][0], goal_id.as_str());

    let completed = env.json(&["goal", "list", "--status", "completed"]);
    assert_eq!(completed["count"], 1);
    assert_eq!(completed["goals"][0]["currentValue"], 10500.0);
}

#[test]
fn test_past_record_does_not_sync() {
    let env = TestEnv::init();
    add_goal(&env, &["water", "2000"]);

    let added = env.json(&["record", "add", "--date", "2020-01-01", "--water", "1800"]);
    assert!(added.get("sync").is_none());
    assert_eq!(env.json(&["goal", "list"])["goals"][0]["currentValue"], 0.0);
}

#[test]
fn test_goal_lifecycle() {
    let env = TestEnv::init();
    let goal = add_goal(&env, &["sleep", "8"]);
    let id = goal["id"].as_str().unwrap();

    assert_eq!(env.json(&["goal", "pause", id])["status"], "paused");
    assert_eq!(env.json(&["goal", "resume", id])["status"], "active");

    let progressed = env.json(&["goal", "progress", id, "8.5"]);
    assert_eq!(progressed["status"], "completed");

    let reset = env.json(&["goal", "reset"]);
    assert_eq!(reset["reset"], 1);
    let after = env.json(&["goal", "list"]);
    assert_eq!(after["goals"][0]["status"], "active");
    assert_eq!(after["goals"][0]["currentValue"], 0.0);
    assert_eq!(env.json(&["goal", "reset"])["reset"], 0);

    let updated = env.json(&["goal", "update", id, "--target", "7", "--name", "Rest"]);
    assert_eq!(updated["targetValue"], 7.0);
    assert_eq!(updated["name"], "Rest");

    env.json(&["goal", "delete", id]);
    assert_eq!(env.json(&["goal", "list"])["count"], 0);
    env.hdash().args(["goal", "pause", id]).assert().failure();
}

#[test]
fn test_goal_today_human() {
    let env = TestEnv::init();
    add_goal(&env, &["water", "2000", "--name", "Hydrate"]);
    env.json(&["record", "add", "--water", "500"]);

    env.hdash()
        .args(["goal", "today", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hydrate"))
        .stdout(predicate::str::contains("25%"));
}

#[test]
fn test_stats_all_window() {
    let env = TestEnv::init();
    env.json(&["record", "add", "--date", "2021-05-01", "--steps", "1000", "--sleep", "7"]);
    env.json(&["record", "add", "--date", "2021-05-02", "--steps", "2001", "--sleep", "6.25"]);
    env.json(&["record", "add", "--date", "2021-05-03", "--water", "900"]);

    let stats = env.json(&["stats", "--window", "all"]);
    assert_eq!(stats["window"], "all");
    assert_eq!(stats["totalDays"], 3);
    assert_eq!(stats["totalSteps"], 3001);
    assert_eq!(stats["avgSteps"], 1000);
    assert_eq!(stats["totalWater"], 900);
    assert_eq!(stats["avgWater"], 300);
    assert_eq!(stats["avgSleep"], 4.4);
}

#[test]
fn test_stats_empty_week() {
    let env = TestEnv::init();
    let stats = env.json(&["stats"]);
    assert_eq!(stats["window"], "week");
    assert_eq!(stats["totalDays"], 0);
    assert_eq!(stats["avgSleep"], 0.0);
}

#[test]
fn test_trends_have_seven_days() {
    let env = TestEnv::init();
    env.json(&["record", "add", "--steps", "4321", "--sleep", "7", "--sleep-deep", "2"]);

    let steps = env.json(&["trend", "steps"]);
    let days = steps["days"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[6]["date"], today());
    assert_eq!(days[6]["value"], 4321.0);
    assert_eq!(days[0]["value"], 0.0);

    let sleep = env.json(&["trend", "sleep"]);
    let days = sleep["days"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[6]["duration"], 7.0);
    assert_eq!(days[6]["deep"], 2.0);
    assert_eq!(days[6]["light"], 0.0);
}

//! Integration tests for the liftlog binary.
//!
//! These tests verify end-to-end behavior including:
//! - Exercise and preset management
//! - Set logging and preset prefill
//! - Progress and portfolio output
//! - User context resolution

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI isolated from the host's config and environment
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("liftlog"));
    cmd.env_remove("LIFTLOG_USER")
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn json_of(cmd: &mut Command) -> Value {
    let output = cmd.arg("--json").output().expect("Failed to run liftlog");
    assert!(
        output.status.success(),
        "liftlog failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn add_exercise(dir: &Path, user: &str, name: &str) -> String {
    let exercise = json_of(
        cli(dir)
            .args(["--user", user])
            .args(["exercise", "add", name]),
    );
    exercise["id"].as_str().unwrap().to_string()
}

fn log_set(dir: &Path, user: &str, date: &str, exercise_id: &str, set: &str) {
    cli(dir)
        .args(["--user", user])
        .args(["log", date, exercise_id, set])
        .assert()
        .success();
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Workout log with strength progress tracking",
        ));
}

#[test]
fn test_exercise_add_and_list() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    let id = add_exercise(dir, "alice", "Bench Press");

    cli(dir)
        .args(["--user", "alice", "exercise", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bench Press"))
        .stdout(predicate::str::contains(id.as_str()));

    // another user does not see it
    cli(dir)
        .args(["--user", "bob", "exercise", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No exercises yet."));

    assert!(dir.join("data/library.json").exists());
}

#[test]
fn test_progress_scenario() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let id = add_exercise(dir, "alice", "Bench Press");

    for (date, set) in [
        ("2024-01-01", "60x5"),
        ("2024-01-08", "65x5"),
        ("2024-01-15", "70x5"),
        ("2024-01-22", "80x5@9"),
    ] {
        log_set(dir, "alice", date, &id, set);
    }

    let progress = json_of(cli(dir).args(["--user", "alice", "progress", &id]));

    assert_eq!(progress["status"], "populated");
    assert_eq!(progress["summary"]["total_sessions"], 4);
    assert_eq!(progress["summary"]["all_time_max_weight"], 80.0);
    assert_eq!(progress["summary"]["current_max_weight"], 80.0);
    assert_eq!(progress["summary"]["current_estimated_one_rm"], 90.0);
    assert_eq!(progress["summary"]["weight_progress_percent"], 10.3);

    let dates: Vec<_> = progress["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["date"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(dates, vec!["2024-01-01", "2024-01-08", "2024-01-15", "2024-01-22"]);
    assert_eq!(progress["history"][3]["sets"][0]["rpe"], 9);
}

#[test]
fn test_progress_text_output() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let id = add_exercise(dir, "alice", "Squat");
    log_set(dir, "alice", "2024-02-01", &id, "100x5");

    cli(dir)
        .args(["--user", "alice", "progress", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Squat"))
        .stdout(predicate::str::contains("112.5 kg"))
        .stdout(predicate::str::contains("+0.0%"));
}

#[test]
fn test_progress_empty_exercise() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let id = add_exercise(dir, "alice", "Deadlift");

    let progress = json_of(cli(dir).args(["--user", "alice", "progress", &id]));
    assert_eq!(progress["status"], "empty");
    assert_eq!(progress["summary"]["total_sessions"], 0);
    assert!(progress["summary"]["all_time_max_weight"].is_null());
}

#[test]
fn test_progress_unknown_exercise() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let id = add_exercise(dir, "alice", "Bench Press");

    cli(dir)
        .args(["--user", "bob", "progress", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Exercise not found"));
}

#[test]
fn test_missing_user_is_unauthorized() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["exercise", "add", "Bench Press"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unauthorized"));

    cli(temp_dir.path())
        .arg("portfolio")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unauthorized"));
}

#[test]
fn test_user_from_env_and_config() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .env("LIFTLOG_USER", "alice")
        .args(["exercise", "add", "Row"])
        .assert()
        .success();

    let config_path = dir.join("custom.toml");
    fs::write(&config_path, "[user]\nid = \"alice\"\n").unwrap();

    cli(dir)
        .arg("--config")
        .arg(&config_path)
        .args(["exercise", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Row"));
}

#[test]
fn test_portfolio_sorted_by_sessions() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let bench = add_exercise(dir, "alice", "Bench Press");
    let squat = add_exercise(dir, "alice", "Squat");
    add_exercise(dir, "alice", "Curl");

    log_set(dir, "alice", "2024-03-01", &bench, "60x5");
    for date in ["2024-03-01", "2024-03-03", "2024-03-05"] {
        log_set(dir, "alice", date, &squat, "100x5");
    }

    let portfolio = json_of(cli(dir).args(["--user", "alice", "portfolio"]));
    let names: Vec<_> = portfolio
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["exercise"]["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Squat", "Bench Press", "Curl"]);
    assert_eq!(portfolio[0]["session_count"], 3);
    assert!(portfolio[2]["max_weight"].is_null());
}

#[test]
fn test_apply_preset_prefills_last_sets() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let bench = add_exercise(dir, "alice", "Bench Press");
    let row = add_exercise(dir, "alice", "Row");

    log_set(dir, "alice", "2024-04-01", &bench, "60x8");
    log_set(dir, "alice", "2024-04-01", &bench, "62.5x6");

    let preset = json_of(
        cli(dir)
            .args(["--user", "alice", "preset", "add", "Upper"])
            .args([&bench, &row]),
    );
    let preset_id = preset["id"].as_str().unwrap();

    let session = json_of(cli(dir).args(["--user", "alice", "apply-preset", "2024-04-03", preset_id]));
    assert_eq!(session["preset_id"], preset_id);
    assert_eq!(session["exercises"][0]["sets"].as_array().unwrap().len(), 2);
    assert_eq!(session["exercises"][0]["sets"][1]["weight"], 62.5);
    assert!(session["exercises"][1]["sets"].as_array().unwrap().is_empty());
}

#[test]
fn test_progress_csv_export() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let id = add_exercise(dir, "alice", "Bench Press");
    log_set(dir, "alice", "2024-05-01", &id, "60x5");
    log_set(dir, "alice", "2024-05-01", &id, "60x5");

    let csv_path = dir.join("exports/bench.csv");
    cli(dir)
        .args(["--user", "alice", "progress", &id, "--csv"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 sets"));

    let content = fs::read_to_string(&csv_path).unwrap();
    assert!(content.starts_with("date,set_number,weight,reps,rpe"));
    assert_eq!(content.lines().count(), 3);
}

#[test]
fn test_invalid_set_spec_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let id = add_exercise(dir, "alice", "Bench Press");

    cli(dir)
        .args(["--user", "alice", "log", "2024-01-01", &id, "heavy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation"));

    assert!(!dir.join("data/sessions.jsonl").exists());
}

#[test]
fn test_remove_set_and_delete_session() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let id = add_exercise(dir, "alice", "Bench Press");
    log_set(dir, "alice", "2024-06-01", &id, "60x5");
    log_set(dir, "alice", "2024-06-01", &id, "70x5");

    cli(dir)
        .args(["--user", "alice", "remove-set", "2024-06-01", &id, "1"])
        .assert()
        .success();

    let progress = json_of(cli(dir).args(["--user", "alice", "progress", &id]));
    assert_eq!(progress["history"][0]["sets"][0]["set_number"], 1);
    assert_eq!(progress["history"][0]["sets"][0]["weight"], 70.0);

    cli(dir)
        .args(["--user", "alice", "delete-session", "2024-06-01"])
        .assert()
        .success();

    let progress = json_of(cli(dir).args(["--user", "alice", "progress", &id]));
    assert_eq!(progress["status"], "empty");
}

#[test]
fn test_edit_set_fills_placeholder() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let id = add_exercise(dir, "alice", "Pull Up");
    log_set(dir, "alice", "2024-06-03", &id, "x");

    let progress = json_of(cli(dir).args(["--user", "alice", "progress", &id]));
    assert!(progress["summary"]["current_max_weight"].is_null());

    let set = json_of(cli(dir).args(["--user", "alice", "edit-set", "2024-06-03", &id, "1", "10x8@7"]));
    assert_eq!(set["set_number"], 1);
    assert_eq!(set["weight"], 10.0);

    let progress = json_of(cli(dir).args(["--user", "alice", "progress", &id]));
    assert_eq!(progress["summary"]["current_max_weight"], 10.0);
    assert_eq!(progress["history"][0]["total_volume"], 80.0);

    cli(dir)
        .args(["--user", "alice", "edit-set", "2024-06-03", &id, "2", "10x8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));
}

#[test]
fn test_session_memo_and_show() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let id = add_exercise(dir, "alice", "Squat");

    cli(dir)
        .args(["--user", "alice", "session", "2024-06-10", "--memo", "Felt strong"])
        .assert()
        .success();
    cli(dir)
        .args(["--user", "alice", "add-exercise", "2024-06-10", &id])
        .assert()
        .success();
    cli(dir)
        .args(["--user", "alice", "memo", "2024-06-10", &id, "Paused reps"])
        .assert()
        .success();

    let session = json_of(cli(dir).args(["--user", "alice", "show", "2024-06-10"]));
    assert_eq!(session["memo"], "Felt strong");
    assert_eq!(session["is_rest_day"], false);
    assert_eq!(session["exercises"][0]["memo"], "Paused reps");

    cli(dir)
        .args(["--user", "alice", "session", "2024-06-11", "--rest-day", "true"])
        .assert()
        .success();
    cli(dir)
        .args(["--user", "alice", "show", "2024-06-11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rest day"));

    cli(dir)
        .args(["--user", "alice", "show", "2024-06-12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No session on 2024-06-12"));
}

#[test]
fn test_remove_exercise_from_session() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let squat = add_exercise(dir, "alice", "Squat");
    let row = add_exercise(dir, "alice", "Row");
    log_set(dir, "alice", "2024-06-20", &squat, "100x5");
    log_set(dir, "alice", "2024-06-20", &row, "50x10");

    let session = json_of(cli(dir).args(["--user", "alice", "remove-exercise", "2024-06-20", &squat]));
    assert_eq!(session["exercises"].as_array().unwrap().len(), 1);
    assert_eq!(session["exercises"][0]["exercise_id"], row.as_str());
    assert_eq!(session["exercises"][0]["order"], 0);

    let progress = json_of(cli(dir).args(["--user", "alice", "progress", &squat]));
    assert_eq!(progress["status"], "empty");
}

#[test]
fn test_exercise_edit_and_delete() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let bench = add_exercise(dir, "alice", "Bench Press");
    let fly = add_exercise(dir, "alice", "Fly");
    log_set(dir, "alice", "2024-06-01", &bench, "60x5");

    let edited = json_of(
        cli(dir)
            .args(["--user", "alice", "exercise", "edit", &bench])
            .args(["--name", "Incline Bench", "--body-part", "chest"]),
    );
    assert_eq!(edited["name"], "Incline Bench");
    assert_eq!(edited["body_part"], "chest");
    assert_eq!(edited["kind"], "strength");

    cli(dir)
        .args(["--user", "alice", "exercise", "delete", &bench])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation"));

    cli(dir)
        .args(["--user", "alice", "exercise", "delete", &fly])
        .assert()
        .success();

    cli(dir)
        .args(["--user", "alice", "exercise", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Incline Bench"))
        .stdout(predicate::str::contains("Fly").not());
}

#[test]
fn test_preset_editing() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let a = add_exercise(dir, "alice", "Squat");
    let b = add_exercise(dir, "alice", "Bench Press");
    let c = add_exercise(dir, "alice", "Row");

    let preset = json_of(cli(dir).args(["--user", "alice", "preset", "add", "Full", &a]));
    let preset_id = preset["id"].as_str().unwrap().to_string();

    json_of(cli(dir).args(["--user", "alice", "preset", "add-exercises", &preset_id, &b, &c]));
    let preset = json_of(cli(dir).args(["--user", "alice", "preset", "reorder", &preset_id, &c, &a]));
    assert_eq!(preset["exercise_ids"], serde_json::json!([&c, &a, &b]));

    let preset = json_of(cli(dir).args(["--user", "alice", "preset", "remove-exercise", &preset_id, &a]));
    assert_eq!(preset["exercise_ids"], serde_json::json!([&c, &b]));

    let preset = json_of(cli(dir).args(["--user", "alice", "preset", "rename", &preset_id, "Upper"]));
    assert_eq!(preset["name"], "Upper");

    cli(dir)
        .args(["--user", "alice", "preset", "delete", &preset_id])
        .assert()
        .success();
    cli(dir)
        .args(["--user", "alice", "apply-preset", "2024-06-01", &preset_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));
}

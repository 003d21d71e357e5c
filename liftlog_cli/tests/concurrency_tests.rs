//! Concurrency tests for the liftlog binary.
//!
//! These tests verify that multiple processes can safely:
//! - Append to the session journal simultaneously (file locking)
//! - Read progress while other processes are writing

use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("liftlog"));
    cmd.env_remove("LIFTLOG_USER")
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir.join("data"))
        .args(["--user", "alice"]);
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn create_exercise(dir: &Path, name: &str) -> String {
    let output = cli(dir)
        .args(["--json", "exercise", "add", name])
        .output()
        .expect("Failed to run liftlog");
    assert!(output.status.success());
    let exercise: Value = serde_json::from_slice(&output.stdout).unwrap();
    exercise["id"].as_str().unwrap().to_string()
}

fn journal_lines(dir: &Path) -> Vec<Value> {
    let content = std::fs::read_to_string(dir.join("data/sessions.jsonl"))
        .expect("Failed to read journal");
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("Torn journal line"))
        .collect()
}

#[test]
fn test_concurrent_set_logging() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();
    let exercise_id = create_exercise(&dir, "Bench Press");

    // One process per date so every write is independent
    let handles: Vec<_> = (1..=8)
        .map(|day| {
            let dir: PathBuf = dir.clone();
            let exercise_id = exercise_id.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["log", &format!("2024-07-{:02}", day), &exercise_id])
                    .arg(format!("{}x5", 60 + day))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let lines = journal_lines(&dir);
    assert_eq!(lines.len(), 8);

    let output = cli(&dir)
        .args(["--json", "progress", &exercise_id])
        .output()
        .unwrap();
    let progress: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(progress["summary"]["total_sessions"], 8);
    assert_eq!(progress["summary"]["all_time_max_weight"], 68.0);
}

#[test]
fn test_concurrent_logging_same_day() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();
    let exercise_id = create_exercise(&dir, "Squat");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dir: PathBuf = dir.clone();
            let exercise_id = exercise_id.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["log", "2024-07-15", &exercise_id])
                    .arg(format!("{}x5", 100 + i))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let output = cli(&dir)
        .args(["--json", "show", "2024-07-15"])
        .output()
        .unwrap();
    let session: Value = serde_json::from_slice(&output.stdout).unwrap();
    let numbers: Vec<_> = session["exercises"][0]["sets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["set_number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, (1..=8).collect::<Vec<u64>>());
}

#[test]
fn test_concurrent_exercise_creation() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dir: PathBuf = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["exercise", "add", &format!("Lift {}", i)])
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let output = cli(&dir)
        .args(["--json", "exercise", "list"])
        .output()
        .unwrap();
    let exercises: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(exercises.as_array().unwrap().len(), 8);
}

#[test]
fn test_reads_while_writing() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();
    let exercise_id = create_exercise(&dir, "Squat");

    let writer = {
        let dir = dir.clone();
        let exercise_id = exercise_id.clone();
        thread::spawn(move || {
            for day in 1..=5 {
                cli(&dir)
                    .args(["log", &format!("2024-08-{:02}", day), &exercise_id, "100x5"])
                    .assert()
                    .success();
            }
        })
    };

    // Readers see a consistent snapshot at any point
    for i in 0..5 {
        thread::sleep(Duration::from_millis(i * 10));
        cli(&dir).arg("portfolio").assert().success();
        cli(&dir).args(["progress", &exercise_id]).assert().success();
    }

    writer.join().expect("Writer panicked");
    assert_eq!(journal_lines(&dir).len(), 5);
}

#[test]
fn test_sequential_edits_same_session() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();
    let exercise_id = create_exercise(&dir, "Row");

    for set in ["50x10", "55x8", "60x6"] {
        cli(&dir)
            .args(["log", "2024-09-01", &exercise_id, set])
            .assert()
            .success();
    }

    // Each edit appends a full snapshot; the last one carries every set
    let lines = journal_lines(&dir);
    assert_eq!(lines.len(), 3);
    let sets = lines[2]["exercises"][0]["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 3);
    assert_eq!(sets[2]["set_number"], 3);
}

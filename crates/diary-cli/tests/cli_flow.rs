use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_diary"))
}

fn run(dir: &TempDir, args: &[&str]) -> Output {
    let db_path = dir.path().join("diary.db");
    Command::new(bin())
        .arg("--diary")
        .arg(&db_path)
        .args(args)
        .env_remove("DIARY_SERVER")
        .env_remove("DIARY_TOKEN")
        .output()
        .expect("binary should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_add_then_list_round_trip() {
    let dir = TempDir::new().unwrap();

    let add = run(
        &dir,
        &[
            "add",
            "2024-03-05",
            "--start",
            "2024-03-05T10:00:00Z",
            "--end",
            "2024-03-05T10:30:00Z",
            "--severity",
            "dripping",
            "--notes",
            "dry air",
        ],
    );
    assert!(add.status.success(), "add failed: {:?}", add);
    assert!(stdout(&add).contains("Recorded"));

    let list = run(&dir, &["list", "2024-03-05"]);
    assert!(list.status.success());
    let text = stdout(&list);
    assert!(text.contains("Dripping"));
    assert!(text.contains("30m"));

    let other_day = run(&dir, &["list", "2024-03-06"]);
    assert!(stdout(&other_day).contains("No records."));
}

#[test]
fn test_incomplete_event_is_flagged_until_corrected() {
    let dir = TempDir::new().unwrap();

    let add = run(&dir, &["add", "2024-03-07"]);
    assert!(add.status.success());
    assert!(stdout(&add).contains("incomplete"));

    let incomplete = run(&dir, &["incomplete", "--json"]);
    assert!(incomplete.status.success());
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&incomplete)).unwrap();
    let records = parsed.as_array().unwrap();
    assert_eq!(records.len(), 1);
    let id = records[0]["id"].as_str().unwrap().to_string();

    let correct = run(
        &dir,
        &[
            "correct",
            &id,
            "--end",
            "2024-03-07T21:00:00Z",
            "--severity",
            "spotting",
        ],
    );
    assert!(correct.status.success(), "correct failed: {:?}", correct);

    let incomplete = run(&dir, &["incomplete", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&incomplete)).unwrap();
    assert!(parsed.as_array().unwrap().is_empty());
}

#[test]
fn test_no_event_marker_and_check() {
    let dir = TempDir::new().unwrap();

    let marker = run(&dir, &["no-event", "2024-03-08"]);
    assert!(marker.status.success());

    let check = run(&dir, &["check"]);
    assert!(check.status.success());
    assert!(stdout(&check).contains("verified"));
}

#[test]
fn test_device_id_is_stable_until_wipe() {
    let dir = TempDir::new().unwrap();

    let first = stdout(&run(&dir, &["device-id"]));
    let second = stdout(&run(&dir, &["device-id"]));
    assert_eq!(first, second);

    let refused = run(&dir, &["wipe"]);
    assert!(!refused.status.success(), "wipe must require --yes");

    let wiped = run(&dir, &["wipe", "--yes"]);
    assert!(wiped.status.success());

    let third = stdout(&run(&dir, &["device-id"]));
    assert_ne!(first, third);
}

#[test]
fn test_retract_keeps_original_visible() {
    let dir = TempDir::new().unwrap();

    run(&dir, &["add", "2024-03-09", "--severity", "gushing"]);
    let list = run(&dir, &["list", "2024-03-09", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&list)).unwrap();
    let id = parsed.as_array().unwrap()[0]["id"].as_str().unwrap().to_string();

    let retract = run(&dir, &["retract", &id, "entered twice"]);
    assert!(retract.status.success());

    let list = run(&dir, &["list", "2024-03-09", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&list)).unwrap();
    let records = parsed.as_array().unwrap();
    assert_eq!(records.len(), 2, "original and retraction both remain");
}

#[test]
fn test_sync_without_server_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    run(&dir, &["add", "2024-03-10"]);

    let sync = run(&dir, &["sync", "push"]);
    assert!(!sync.status.success());
    let err = String::from_utf8_lossy(&sync.stderr).to_string();
    assert!(err.contains("No server URL configured"));
}

#[test]
fn test_invalid_inputs_are_rejected() {
    let dir = TempDir::new().unwrap();

    let bad_date = run(&dir, &["add", "03/05/2024"]);
    assert!(!bad_date.status.success());

    let bad_severity = run(&dir, &["add", "2024-03-05", "--severity", "torrential"]);
    assert!(!bad_severity.status.success());

    let bad_id = run(&dir, &["show", "not-a-uuid"]);
    assert!(!bad_id.status.success());
}

//! Integration tests for the `schedule` CLI binary.
//!
//! These drive the built binary through `assert_cmd` against the JSON and TOML
//! fixtures: a weekly maths lesson (Mon/Wed/Fri, six times, skipping Jan 5), an
//! overlapping one-off English lesson, a substitute's science lesson and a
//! cancelled assembly.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

fn events_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/events.json")
}

fn grid_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/grid.toml")
}

fn bad_grid_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/bad_grid.toml")
}

fn schedule() -> Command {
    Command::cargo_bin("schedule").unwrap()
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout must be JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// slots
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn slots_follow_config_file() {
    schedule()
        .args(["--config", grid_path(), "slots"])
        .assert()
        .success()
        .stdout("08:00\n09:00\n10:00\n");
}

#[test]
fn slots_zoom_override_changes_scale() {
    // 1.0 is the fifteen-minute scale.
    schedule()
        .args(["--config", grid_path(), "slots", "--zoom", "1.0"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("08:00\n08:15\n08:30\n"))
        .stdout(predicate::str::ends_with("09:45\n10:00\n"));
}

#[test]
fn default_grid_stops_before_midnight() {
    schedule()
        .args(["slots", "--zoom", "0.25"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("00:00\n01:00\n"))
        .stdout(predicate::str::ends_with("23:00\n"))
        .stdout(predicate::str::contains("24:00").not());
}

#[test]
fn invalid_config_is_reported() {
    schedule()
        .args(["--config", bad_grid_path(), "slots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid grid config"));
}

#[test]
fn missing_config_file_is_reported() {
    schedule()
        .args(["--config", "/nonexistent/grid.toml", "slots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// layout
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn layout_splits_overlapping_lessons() {
    let json = stdout_json(schedule().args(["layout", "-i", events_path(), "--date", "2024-01-01"]));
    let placed = json.as_array().unwrap();

    // Cancelled assembly is not laid out.
    assert_eq!(placed.len(), 2);

    assert_eq!(placed[0]["id"], "maths@2024-01-01");
    assert_eq!(placed[0]["column"], 0);
    assert_eq!(placed[0]["topPixels"], 1080.0);
    assert_eq!(placed[0]["heightPixels"], 120.0);

    assert_eq!(placed[1]["id"], "english");
    assert_eq!(placed[1]["column"], 1);
    assert_eq!(placed[1]["columnCount"], 2);
    assert_eq!(placed[1]["leftPercent"], 50.0);
    assert_eq!(placed[1]["widthPercent"], 50.0);
}

#[test]
fn layout_reads_stdin() {
    let events = std::fs::read_to_string(events_path()).unwrap();
    schedule()
        .args(["layout", "--date", "2024-01-03"])
        .write_stdin(events)
        .assert()
        .success()
        .stdout(predicate::str::contains("maths@2024-01-03"))
        .stdout(predicate::str::contains("science"));
}

#[test]
fn layout_writes_output_file() {
    let output_path = std::env::temp_dir().join("schedule-cli-layout.json");
    let _ = std::fs::remove_file(&output_path);

    schedule()
        .args(["layout", "-i", events_path(), "--date", "2024-01-01", "-o"])
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(&output_path).expect("output file must exist");
    assert!(content.contains("\"parentEventId\": \"maths\""));

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn layout_rejects_bad_date() {
    schedule()
        .args(["layout", "-i", events_path(), "--date", "Monday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

// ─────────────────────────────────────────────────────────────────────────────
// conflicts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn conflicts_finds_recurring_occurrence() {
    let json = stdout_json(schedule().args([
        "conflicts",
        "-i",
        events_path(),
        "--resource",
        "teacher-42",
        "--substitute",
        "teacher-7",
        "--start",
        "2024-01-03T09:15",
        "--end",
        "2024-01-03T09:45",
    ]));

    let main = json["main"].as_array().unwrap();
    assert_eq!(main.len(), 1);
    assert_eq!(main[0]["event"]["id"], "maths@2024-01-03");
    assert_eq!(main[0]["overlapMinutes"], 30);
    assert_eq!(json["substitute"], serde_json::json!([]));
}

#[test]
fn conflicts_checks_substitute_independently() {
    let json = stdout_json(schedule().args([
        "conflicts",
        "-i",
        events_path(),
        "--resource",
        "teacher-42",
        "--substitute",
        "teacher-7",
        "--start",
        "2024-01-03T11:30",
        "--end",
        "2024-01-03T12:30",
    ]));

    assert_eq!(json["main"], serde_json::json!([]));
    assert_eq!(json["substitute"][0]["event"]["id"], "science");
}

#[test]
fn excluding_a_series_skips_its_occurrences() {
    let json = stdout_json(schedule().args([
        "conflicts",
        "-i",
        events_path(),
        "--resource",
        "teacher-42",
        "--start",
        "2024-01-03T09:00",
        "--end",
        "2024-01-03T10:00",
        "--exclude",
        "maths",
    ]));

    assert_eq!(json["main"], serde_json::json!([]));
    assert!(json.get("substitute").is_none());
}

#[test]
fn conflicts_sees_overnight_occurrence_from_the_previous_day() {
    let events = r#"[{
        "id": "night",
        "title": "Boarding duty",
        "startTime": "2024-01-01T23:00:00",
        "endTime": "2024-01-02T01:00:00",
        "resourceId": "teacher-42",
        "scheduleId": "term-1",
        "isRecurring": true,
        "recurrence": {"frequency": "daily", "interval": 1}
    }]"#;

    let json = stdout_json(
        schedule()
            .args([
                "conflicts",
                "--resource",
                "teacher-42",
                "--start",
                "2024-01-05T00:15",
                "--end",
                "2024-01-05T00:45",
            ])
            .write_stdin(events),
    );

    let main = json["main"].as_array().unwrap();
    assert_eq!(main.len(), 1);
    assert_eq!(main[0]["event"]["id"], "night@2024-01-04");
}

#[test]
fn conflicts_rejects_inverted_range() {
    schedule()
        .args([
            "conflicts",
            "-i",
            events_path(),
            "--resource",
            "teacher-42",
            "--start",
            "2024-01-03T10:00",
            "--end",
            "2024-01-03T09:00",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid range"));
}

// ─────────────────────────────────────────────────────────────────────────────
// expand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_materializes_first_week() {
    let json = stdout_json(schedule().args([
        "expand",
        "-i",
        events_path(),
        "--from",
        "2024-01-01",
        "--to",
        "2024-01-07",
    ]));
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();

    // Jan 5 is an exception; the assembly is cancelled.
    assert_eq!(
        ids,
        vec!["maths@2024-01-01", "english", "maths@2024-01-03", "science"]
    );
}

#[test]
fn expand_honours_occurrence_count() {
    // Six lessons: Jan 1, 3, 8, 10, 12, 15.
    schedule()
        .args([
            "expand",
            "-i",
            events_path(),
            "--from",
            "2024-01-15",
            "--to",
            "2024-01-31",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("maths@2024-01-15"))
        .stdout(predicate::str::contains("maths@2024-01-17").not());
}

#[test]
fn malformed_events_are_reported() {
    schedule()
        .args(["expand", "--from", "2024-01-01", "--to", "2024-01-07"])
        .write_stdin("[{\"title\": 1}]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse events JSON"));
}

#[test]
fn missing_input_file_is_reported() {
    schedule()
        .args([
            "expand",
            "-i",
            "/nonexistent/events.json",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-07",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// free
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn free_lists_gaps_around_merged_lessons() {
    let json = stdout_json(schedule().args([
        "free",
        "-i",
        events_path(),
        "--resource",
        "teacher-42",
        "--start",
        "2024-01-01T08:00",
        "--end",
        "2024-01-01T12:00",
    ]));
    let slots = json.as_array().unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["end"], "2024-01-01T09:00:00");
    assert_eq!(slots[0]["durationMinutes"], 60);
    assert_eq!(slots[1]["start"], "2024-01-01T10:30:00");
    assert_eq!(slots[1]["durationMinutes"], 90);
}

#[test]
fn free_with_minimum_returns_first_long_enough_slot() {
    let json = stdout_json(schedule().args([
        "free",
        "-i",
        events_path(),
        "--resource",
        "teacher-42",
        "--start",
        "2024-01-01T08:00",
        "--end",
        "2024-01-01T12:00",
        "--min-minutes",
        "90",
    ]));
    assert_eq!(json["start"], "2024-01-01T10:30:00");

    let none = stdout_json(schedule().args([
        "free",
        "-i",
        events_path(),
        "--resource",
        "teacher-42",
        "--start",
        "2024-01-01T08:00",
        "--end",
        "2024-01-01T12:00",
        "--min-minutes",
        "120",
    ]));
    assert!(none.is_null());
}

#[test]
fn verbose_logs_to_stderr() {
    schedule()
        .args([
            "-v",
            "expand",
            "-i",
            events_path(),
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-07",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("read 4 events"));
}

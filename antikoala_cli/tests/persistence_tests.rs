//! Persistence tests for the antikoala binary.
//!
//! These tests verify the store survives:
//! - Several processes appending to the journal at once
//! - Corrupted profile, journal and snapshot files
//! - An unwritable data directory

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use std::path::PathBuf;
use std::thread;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli_at(config_home: &std::path::Path, data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("antikoala"));
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn cli(dir: &TempDir) -> Command {
    cli_at(&dir.path().join("config"), &data_dir(dir))
}

fn data_dir(dir: &TempDir) -> PathBuf {
    dir.path().join("data")
}

fn user_dir(dir: &TempDir) -> PathBuf {
    data_dir(dir).join("users").join("local")
}

#[test]
fn test_concurrent_session_creation() {
    let dir = setup_test_dir();
    let config_home = dir.path().join("config");
    let data = data_dir(&dir);

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let config_home = config_home.clone();
            let data = data.clone();
            thread::spawn(move || {
                cli_at(&config_home, &data)
                    .args(["new", &format!("session-{}", i), "--date", "2025-03-14"])
                    .assert()
                    .success();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let journal = fs::read_to_string(user_dir(&dir).join("sessions.wal")).unwrap();
    let entries: Vec<serde_json::Value> = journal
        .lines()
        .map(|line| serde_json::from_str(line).expect("every journal line is whole JSON"))
        .collect();
    assert_eq!(entries.len(), 6);
    assert!(entries.iter().all(|e| e["op"] == "create"));

    let output = cli(&dir).arg("list").output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    for i in 0..6 {
        assert!(stdout.contains(&format!("session-{}", i)));
    }
}

#[test]
fn test_reads_during_rollup() {
    let dir = setup_test_dir();
    for i in 0..5 {
        cli(&dir)
            .args(["new", &format!("s{}", i), "--date", "2025-03-14"])
            .assert()
            .success();
    }

    let config_home = dir.path().join("config");
    let data = data_dir(&dir);
    let reader = thread::spawn(move || {
        for _ in 0..5 {
            cli_at(&config_home, &data).arg("list").assert().success();
        }
    });

    cli(&dir).arg("rollup").assert().success();
    reader.join().unwrap();

    let output = cli(&dir).arg("list").output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    for i in 0..5 {
        assert!(stdout.contains(&format!("s{}", i)));
    }
}

#[test]
fn test_corrupted_profile_reads_as_missing() {
    let dir = setup_test_dir();
    fs::create_dir_all(user_dir(&dir)).unwrap();
    fs::write(user_dir(&dir).join("profile.json"), "{ invalid json }}}}").unwrap();

    cli(&dir)
        .args(["profile", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No profile found"));

    cli(&dir)
        .args(["profile", "set", "--name", "a", "--weight", "60", "--capacity", "1"])
        .assert()
        .success();
    cli(&dir).args(["profile", "show"]).assert().success();
}

#[test]
fn test_corrupted_journal_lines_are_skipped() {
    let dir = setup_test_dir();
    cli(&dir)
        .args(["new", "first", "--date", "2025-03-01"])
        .assert()
        .success();

    {
        let mut journal = fs::OpenOptions::new()
            .append(true)
            .open(user_dir(&dir).join("sessions.wal"))
            .unwrap();
        writeln!(journal, "{{ half a line").unwrap();
        writeln!(journal, "{{\"op\":\"unknown\"}}").unwrap();
    }

    cli(&dir)
        .args(["new", "second", "--date", "2025-03-02"])
        .assert()
        .success();

    cli(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("first"))
        .stdout(predicate::str::contains("second"));

    // Rollup keeps the good records and drops the garbage
    cli(&dir).arg("rollup").assert().success();
    let snapshot = fs::read_to_string(user_dir(&dir).join("sessions.csv")).unwrap();
    assert_eq!(snapshot.lines().count(), 3);
}

#[test]
fn test_corrupted_snapshot_rows_are_skipped() {
    let dir = setup_test_dir();
    cli(&dir)
        .args(["new", "kept", "--date", "2025-03-01"])
        .assert()
        .success();
    cli(&dir).arg("rollup").assert().success();

    {
        let mut snapshot = fs::OpenOptions::new()
            .append(true)
            .open(user_dir(&dir).join("sessions.csv"))
            .unwrap();
        writeln!(snapshot, "not-a-uuid,broken,yesterday,,,0,0,0,0,0,0,0,").unwrap();
    }

    cli(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("kept"))
        .stdout(predicate::str::contains("broken").not());
}

#[test]
fn test_missing_files_start_empty() {
    let dir = setup_test_dir();
    cli(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("기록된 술자리가 없습니다"));
    cli(&dir)
        .args(["stats", "--date", "2025-03-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0회"));
}

#[test]
fn test_unwritable_store_reports_notice() {
    let dir = setup_test_dir();
    // A regular file where the data directory should be
    fs::write(data_dir(&dir), "not a directory").unwrap();

    cli(&dir)
        .args(["new", "lost", "--date", "2025-03-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("⚠"));
}

//! Corruption recovery tests for the subtrack binary.
//!
//! These tests verify the system can handle:
//! - Corrupted store documents (refused, never overwritten)
//! - Individual malformed records (skipped, others still served)
//! - Empty and missing store files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("subtrack").expect("Failed to find subtrack binary");
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir);
    cmd
}

fn write_store(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("subscriptions.json");
    fs::write(&path, contents).expect("Failed to write store");
    path
}

const MIXED_STORE: &str = r#"{
  "nextId": 4,
  "subscriptions": [
    {
      "id": 1,
      "uniqueKey": "6f1c2a4e-0b1d-4c55-9d43-6a8b5f2e7a10",
      "name": "Music",
      "createdAt": "2024-01-01T09:30:00Z",
      "startDate": "2024-01-15T00:00:00",
      "billingCycle": "monthly",
      "anchorDay": 15,
      "price": 9.99
    },
    {
      "id": 2,
      "uniqueKey": "0c7e9b1a-52a3-4d1e-8f6b-3e2d1c0b9a87",
      "name": "Broken",
      "createdAt": "2024-01-01T09:30:00Z",
      "startDate": "2024-01-15T00:00:00",
      "billingCycle": "monthly"
    },
    {
      "id": 3,
      "name": 42,
      "billingCycle": ["yearly"]
    }
  ]
}"#;

#[test]
fn test_corrupted_store_is_refused() {
    let temp_dir = setup_test_dir();
    let corrupt = "{ invalid json }}}}";
    let path = write_store(temp_dir.path(), corrupt);

    cli(temp_dir.path()).arg("list").assert().failure();

    cli(temp_dir.path())
        .args(["add", "--name", "Music", "--start", "2024-01-15", "--cycle", "monthly"])
        .assert()
        .failure();

    // The damaged document is left for the user to inspect
    let after = fs::read_to_string(&path).expect("Failed to read store");
    assert_eq!(after, corrupt);
}

#[test]
fn test_malformed_records_are_skipped() {
    let temp_dir = setup_test_dir();
    write_store(temp_dir.path(), MIXED_STORE);

    cli(temp_dir.path())
        .args(["day", "2024-02-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Music"))
        .stdout(predicate::str::contains("Broken").not());

    cli(temp_dir.path())
        .args(["list", "--today", "2024-02-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("next: 2024-02-15"))
        .stdout(predicate::str::contains("Broken").not());
}

#[test]
fn test_malformed_record_cannot_be_shown() {
    let temp_dir = setup_test_dir();
    write_store(temp_dir.path(), MIXED_STORE);

    cli(temp_dir.path())
        .args(["show", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MissingAnchorDay"));

    cli(temp_dir.path())
        .args(["show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Music (#1)"));
}

#[test]
fn test_writes_preserve_unreadable_entries() {
    let temp_dir = setup_test_dir();
    let path = write_store(temp_dir.path(), MIXED_STORE);

    cli(temp_dir.path())
        .args(["add", "--name", "Video", "--start", "2024-03-01", "--cycle", "yearly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Added subscription 4: Video"));

    cli(temp_dir.path()).args(["remove", "1"]).assert().success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("Failed to read store"))
            .expect("Store is not JSON");
    let ids: Vec<_> = json["subscriptions"]
        .as_array()
        .expect("subscriptions array")
        .iter()
        .map(|entry| entry["id"].as_i64())
        .collect();

    assert_eq!(ids, vec![Some(2), Some(3), Some(4)]);
    assert_eq!(json["subscriptions"][1]["name"], 42);
    assert_eq!(json["nextId"], 5);
}

#[test]
fn test_empty_document_is_treated_as_new() {
    let temp_dir = setup_test_dir();
    write_store(temp_dir.path(), "{}");

    cli(temp_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No subscriptions recorded."));

    cli(temp_dir.path())
        .args(["add", "--name", "Music", "--start", "2024-01-15", "--cycle", "monthly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Added subscription 1: Music"));
}

#[test]
fn test_missing_data_dir_is_created_on_write() {
    let temp_dir = setup_test_dir();
    let nested = temp_dir.path().join("a/b/c");

    Command::cargo_bin("subtrack")
        .expect("Failed to find subtrack binary")
        .env("XDG_CONFIG_HOME", temp_dir.path().join("config"))
        .arg("--data-dir")
        .arg(&nested)
        .args(["add", "--name", "Music", "--start", "2024-01-15", "--cycle", "monthly"])
        .assert()
        .success();

    assert!(nested.join("subscriptions.json").exists());
}

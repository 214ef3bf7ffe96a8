//! Corruption recovery tests for health-exporter.
//!
//! These tests verify the exporter can handle:
//! - Malformed entries inside an otherwise valid input file
//! - Input files that are not JSON at all
//! - Corrupted or partially unknown config files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("health-exporter"));
    cmd.arg("--config").arg(dir.join("config.toml"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("Failed to write fixture");
    path
}

#[test]
fn test_malformed_samples_are_skipped() {
    let temp_dir = setup_test_dir();
    let input = write_file(
        temp_dir.path(),
        "health.json",
        r#"{
            "samples": [
                { "kind": "weight", "timestamp": "not a date", "value": 80.0, "unit": "mass" },
                { "kind": "weight", "value": 81.0, "unit": "mass" },
                "garbage",
                { "kind": "weight", "timestamp": "2024-01-15T09:30:00Z", "value": 75.0, "unit": "mass" }
            ]
        }"#,
    );

    cli(temp_dir.path())
        .args(["export", "--stdout", "--utc", "--metrics", "weight", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(
            "Date,ISO8601,Metric,Value,Unit\n\
             2024-01-15 09:30:00,2024-01-15T09:30:00Z,Weight,75.00,kg\n",
        );
}

#[test]
fn test_wrong_unit_samples_are_rejected() {
    let temp_dir = setup_test_dir();
    let input = write_file(
        temp_dir.path(),
        "health.json",
        r#"{
            "samples": [
                { "kind": "weight", "timestamp": "2024-01-15T09:30:00Z", "value": 8000, "unit": "count" },
                { "kind": "weight", "timestamp": "2024-01-14T09:30:00Z", "value": 74.5, "unit": "mass" }
            ]
        }"#,
    );

    cli(temp_dir.path())
        .args(["export", "--stdout", "--utc", "--metrics", "weight", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("74.50"))
        .stdout(predicate::str::contains("8000").not())
        .stderr(predicate::str::contains("skipped 1 invalid samples"));
}

#[test]
fn test_incomplete_lab_records_are_skipped() {
    let temp_dir = setup_test_dir();
    write_file(
        temp_dir.path(),
        "config.toml",
        "[features]\npaid_account = true\n",
    );
    let input = write_file(
        temp_dir.path(),
        "health.json",
        r#"{
            "lab_records": [
                { "code": { "coding": [ { "code": "4548-4" } ] }, "valueQuantity": { "value": 6.0, "unit": "%" } },
                { "code": { "coding": [ { "code": "4548-4" } ] }, "effectiveDateTime": "2023-05-01" },
                { "code": { "coding": [ { "code": "2345-7" } ] }, "effectiveDateTime": "2023-05-01", "valueQuantity": { "value": 90 } },
                { "code": { "coding": [ { "code": "4548-4" } ] }, "effectiveDateTime": "2023-05-01", "valueQuantity": { "value": 5.8 } }
            ]
        }"#,
    );

    cli(temp_dir.path())
        .args(["export", "--stdout", "--utc", "--metrics", "a1c", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(
            "Date,ISO8601,Metric,Value,Unit\n\
             2023-05-01 00:00:00,2023-05-01T00:00:00Z,Hemoglobin A1C,5.80,%\n",
        )
        .stderr(predicate::str::contains("skipped 3 invalid samples"));
}

#[test]
fn test_input_that_is_not_json_fails() {
    let temp_dir = setup_test_dir();
    let input = write_file(temp_dir.path(), "health.json", "{ invalid json }}}}");

    cli(temp_dir.path())
        .args(["export", "--stdout", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_corrupted_config_file_fails() {
    let temp_dir = setup_test_dir();
    write_file(temp_dir.path(), "config.toml", "[units\nweight = ");

    cli(temp_dir.path())
        .arg("metrics")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TOML error"));
}

#[test]
fn test_unknown_config_values_fall_back() {
    let temp_dir = setup_test_dir();
    write_file(
        temp_dir.path(),
        "config.toml",
        "[units]\nweight = \"stone\"\n[export]\ntime_zone = \"mars\"\n",
    );
    let input = write_file(
        temp_dir.path(),
        "health.json",
        r#"{ "samples": [ { "kind": "weight", "timestamp": "2024-01-15T09:30:00Z", "value": 75.0, "unit": "mass" } ] }"#,
    );

    cli(temp_dir.path())
        .args(["export", "--stdout", "--utc", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(",Weight,75.00,kg\n"));
}

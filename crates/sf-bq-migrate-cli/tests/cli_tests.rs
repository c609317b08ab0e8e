//! CLI integration tests for sf-bq-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for bad configuration.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the sf-bq-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("sf-bq-migrate").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_run_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--interactive"))
        .stdout(predicate::str::contains("--sample"))
        .stdout(predicate::str::contains("--raw-timestamps"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sf-bq-migrate"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_fails() {
    cmd()
        .args(["--config", "nonexistent_config_file.yml", "--dry-run"])
        .assert()
        .failure()
        .code(1); // IO error - file not found
}

#[test]
fn test_invalid_yaml_exits_with_config_code() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();
    cmd()
        .args(["--config"])
        .arg(file.path())
        .arg("--dry-run")
        .assert()
        .failure();
}

#[test]
fn test_raw_timestamps_without_interactive_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "snowflake:\n  connection_name: default\n  external_stage: STAGE\n\
         bigquery:\n  project_id: p\n  gcs_uri: gs://b/\n\
         migration:\n  tables:\n    - database: PROD"
    )
    .unwrap();
    cmd()
        .args(["--config"])
        .arg(file.path())
        .args(["--raw-timestamps", "--dry-run"])
        .assert()
        .failure()
        .code(2) // config error
        .stderr(predicate::str::contains("--raw-timestamps"));
}

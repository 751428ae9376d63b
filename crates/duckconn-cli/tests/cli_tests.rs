//! CLI integration tests
//!
//! Run the built binary against a secrets file in a temp directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SECRETS: &str = r#"
[connections.scratch]
data_uri = "memory://"
description = "Scratch space"
default_query = "SELECT 21 * 2 AS answer"

[connections.events]
data_uri = "data/events.duckdb"
source_url = "SOURCE_URL"
create_table = "events"

[connections.cloud]
data_uri = "md:analytics"

[connections.broken]
data_uri = "postgres://host/db"
create_table = 7
"#;

fn setup(temp_dir: &TempDir) -> std::path::PathBuf {
    let csv = temp_dir.path().join("events.csv");
    fs::write(&csv, "id,kind\n1,open\n2,close\n").unwrap();
    let source = format!("file://{}", csv.display());
    let path = temp_dir.path().join("secrets.toml");
    fs::write(&path, SECRETS.replace("SOURCE_URL", &source)).unwrap();
    path
}

fn run(secrets: &Path, staging: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_duckconn"))
        .env_remove("MOTHERDUCK_TOKEN")
        .env_remove("RUST_LOG")
        .arg("--secrets")
        .arg(secrets)
        .arg("--staging-dir")
        .arg(staging)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

#[test]
fn test_cli_list_shows_every_connection() {
    let temp_dir = TempDir::new().unwrap();
    let secrets = setup(&temp_dir);

    let output = run(&secrets, &temp_dir.path().join("staging"), &["list"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["broken", "cloud", "events", "scratch"] {
        assert!(stdout.contains(name), "missing {} in {}", name, stdout);
    }
    assert!(stdout.contains("Scratch space"));
}

#[test]
fn test_cli_query_uses_default_query() {
    let temp_dir = TempDir::new().unwrap();
    let secrets = setup(&temp_dir);

    let output = run(
        &secrets,
        &temp_dir.path().join("staging"),
        &["query", "scratch", "--format", "json"],
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(parsed["columns"][0], "answer");
    assert_eq!(parsed["rows"][0][0], 42);
}

#[test]
fn test_cli_query_bootstraps_file_target() {
    // Given: A file target with a local CSV source
    let temp_dir = TempDir::new().unwrap();
    let secrets = setup(&temp_dir);
    let staging = temp_dir.path().join("staging");

    // When: We query the bootstrapped table
    let output = run(
        &secrets,
        &staging,
        &["query", "events", "--sql", "SELECT count(*) AS n FROM events", "--metrics"],
    );

    // Then: The rows are there and the database sits next to the secrets file
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["n", "2"]);
    assert!(temp_dir.path().join("data").join("events.duckdb").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("resolution_time_ms"));

    // And: A second process finds the table already present
    let tables = run(&secrets, &staging, &["tables", "events"]);
    assert!(tables.status.success());
    assert!(String::from_utf8_lossy(&tables.stdout).contains("events"));
}

#[test]
fn test_cli_check_reports_all_field_errors() {
    let temp_dir = TempDir::new().unwrap();
    let secrets = setup(&temp_dir);

    let output = run(&secrets, &temp_dir.path().join("staging"), &["check", "broken"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error: "));
    assert!(stderr.contains("data_uri"));
    assert!(stderr.contains("create_table"));
}

#[test]
fn test_cli_check_valid_connection() {
    let temp_dir = TempDir::new().unwrap();
    let secrets = setup(&temp_dir);

    let output = run(&secrets, &temp_dir.path().join("staging"), &["check", "events"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("events: ok"));
    assert!(stdout.contains("bootstrap: table events"));
}

#[test]
fn test_cli_managed_target_without_token() {
    let temp_dir = TempDir::new().unwrap();
    let secrets = setup(&temp_dir);

    let output = run(&secrets, &temp_dir.path().join("staging"), &["tables", "cloud"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_INVALID_CONFIG"));
    assert!(stderr.contains("motherduck_token"));
}

#[test]
fn test_cli_unknown_connection() {
    let temp_dir = TempDir::new().unwrap();
    let secrets = setup(&temp_dir);

    let output = run(&secrets, &temp_dir.path().join("staging"), &["query", "nope"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no connection named 'nope'"));
}

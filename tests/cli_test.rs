//! CLI integration tests.
//!
//! Tests:
//! - Help and version output
//! - Init, query and exec against a temporary database

mod common;

use common::TestFixture;
use std::path::Path;
use std::process::{Command, Output};

fn duckload(db_path: &str, args: &[&str]) -> Output {
    duckload_in(Path::new(env!("CARGO_MANIFEST_DIR")), db_path, args)
}

fn duckload_in(cwd: &Path, db_path: &str, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_duckload"))
        .current_dir(cwd)
        .arg("--db-path")
        .arg(db_path)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("DUCKLOAD_DB_PATH")
        .output()
        .expect("failed to run duckload")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// CLI --help output should show the subcommands and shared options.
#[test]
fn test_cli_help_output() {
    let output = Command::new(env!("CARGO_BIN_EXE_duckload"))
        .arg("--help")
        .output()
        .expect("failed to run");

    let stdout = stdout(&output);
    assert!(output.status.success());
    for expected in ["init", "load", "query", "exec", "--db-path", "--log-level"] {
        assert!(stdout.contains(expected), "help should mention {expected}: {stdout}");
    }
}

/// CLI --version should show version.
#[test]
fn test_cli_version_output() {
    let output = Command::new(env!("CARGO_BIN_EXE_duckload"))
        .arg("--version")
        .output()
        .expect("failed to run");

    let stdout = stdout(&output);
    assert!(
        stdout.contains("0.1.0"),
        "version output should contain version number: {}",
        stdout
    );
}

#[test]
fn test_query_rounds_json_output() {
    let fixture = TestFixture::new();
    let output = duckload(
        fixture.db_path_str(),
        &[
            "query",
            "SELECT * FROM (VALUES (1.2345), (2.6789)) v(X)",
            "--sort-by",
            "X",
            "--descending",
            "--output",
            "json",
        ],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["columns"][0], "X");
    assert_eq!(json["rows"][0]["X"].as_f64(), Some(2.68));
    assert_eq!(json["rows"][1]["X"].as_f64(), Some(1.23));
}

#[test]
fn test_init_then_exec() {
    let fixture = TestFixture::new();
    let csv = fixture.write_file(
        "events.csv",
        "user_id,event_name,platform,experience,event_time\n\
         1,open,ios,a,2024-01-01 10:00:00\n\
         2,click,web,b,2024-01-02 11:00:00\n",
    );
    let schema = Path::new(env!("CARGO_MANIFEST_DIR")).join("sql/create_transactions_table.sql");

    let output = duckload(
        fixture.db_path_str(),
        &[
            "init",
            "--csv",
            csv.to_str().unwrap(),
            "--schema",
            schema.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Loaded 2 row(s) into TRANSACTIONS"));

    let report = fixture.write_file(
        "report.sql",
        "SELECT USER_ID, PLATFORM FROM TRANSACTIONS ORDER BY USER_ID;",
    );
    let output = duckload(
        fixture.db_path_str(),
        &["exec", report.to_str().unwrap(), "--output", "json"],
    );
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["rows"][0]["USER_ID"], 1);
    assert_eq!(json["rows"][1]["PLATFORM"], "web");
}

const EVENTS_CSV: &str = "user_id,event_name,platform,experience,event_time\n\
    1,open,ios,a,2024-01-01 10:00:00\n\
    2,click,web,b,2024-01-02 11:00:00\n";

#[test]
fn test_init_uses_default_schema() {
    let fixture = TestFixture::new();
    let csv = fixture.write_file("events.csv", EVENTS_CSV);

    let output = duckload(fixture.db_path_str(), &["init", "--csv", csv.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Loaded 2 row(s) into TRANSACTIONS"));
}

#[test]
fn test_init_default_schema_missing_from_working_dir() {
    let fixture = TestFixture::new();
    let csv = fixture.write_file("events.csv", EVENTS_CSV);

    let output = duckload_in(
        fixture.temp_dir.path(),
        fixture.db_path_str(),
        &["init", "--csv", csv.to_str().unwrap()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Schema file not found: sql/create_transactions_table.sql"),
        "stderr: {stderr}"
    );
}

#[test]
fn test_missing_sql_file_fails() {
    let fixture = TestFixture::new();
    let missing = fixture.missing_file("nope.sql");
    let output = duckload(fixture.db_path_str(), &["exec", missing.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SQL file not found"), "stderr: {stderr}");
}

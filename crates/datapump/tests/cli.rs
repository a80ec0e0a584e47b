use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn data_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../datapump-core/tests/data")
        .join(name)
}

fn datapump(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_datapump"))
        .args(args)
        // Keep a developer's .env out of the picture.
        .current_dir(data_dir("empty"))
        .env_remove("DATABASE_URL")
        .env_remove("DATAPUMP_DATABASE_URL")
        .env_remove("DATAPUMP_TABLE")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run datapump")
}

#[test]
fn missing_configuration_halts_before_any_file() {
    let input_dir = data_dir("pipeline");
    let output = datapump(&["--input-dir", input_dir.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("configuration error"), "stderr: {stderr}");
    assert!(!stderr.contains("BTCUSD"), "no file may be processed: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn no_input_files_exits_with_distinct_status() {
    let input_dir = data_dir("empty");
    let output = datapump(&["--dry-run", "--input-dir", input_dir.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn dry_run_reports_every_file() {
    let input_dir = data_dir("pipeline");
    let output = datapump(&[
        "--dry-run",
        "--report-json",
        "--log-format",
        "json",
        "--input-dir",
        input_dir.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report should be JSON");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["discovered"], 4);
    assert_eq!(report["imported"], 2);
    assert_eq!(report["skipped"], 2);
    assert_eq!(report["rows_inserted"], 5);

    let skipped: Vec<&str> = report["files"]
        .as_array()
        .expect("files array")
        .iter()
        .filter(|file| file["status"] == "skipped")
        .filter_map(|file| file["pair"].as_str())
        .collect();
    assert_eq!(skipped, ["BADUSD", "GAPUSD"]);
}

#[test]
fn invalid_table_name_is_fatal() {
    let input_dir = data_dir("pipeline");
    let output = datapump(&[
        "--input-dir",
        input_dir.to_str().unwrap(),
        "--database-url",
        "postgres://localhost:5432/candles",
        "--table",
        "Candles; DROP TABLE x",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid target table name"), "stderr: {stderr}");
}

#[test]
fn zero_connection_attempts_is_a_usage_error() {
    let input_dir = data_dir("pipeline");
    let output = datapump(&[
        "--input-dir",
        input_dir.to_str().unwrap(),
        "--max-attempts",
        "0",
    ]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--max-attempts"), "stderr: {stderr}");
    assert!(!stderr.contains("BTCUSD"), "no file may be processed: {stderr}");
}

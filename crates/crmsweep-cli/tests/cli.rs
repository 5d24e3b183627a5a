use assert_cmd::Command;
use std::path::Path;

fn crmsweep(dir: &Path, db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("crmsweep").expect("binary");
    cmd.env("XDG_DATA_HOME", dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("CRMSWEEP_TOKEN")
        .arg("--db-path")
        .arg(db);
    cmd
}

#[test]
fn info_reports_schema_version_on_a_fresh_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("sweep.sqlite3");

    let output = crmsweep(dir.path(), &db)
        .args(["--json", "info"])
        .output()
        .expect("run info");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"schema_version\": 4"), "stdout: {stdout}");
    assert!(stdout.contains("\"authenticated\": false"), "stdout: {stdout}");
}

#[test]
fn records_list_is_empty_on_a_fresh_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("sweep.sqlite3");

    let output = crmsweep(dir.path(), &db)
        .args(["records", "list", "contacts"])
        .output()
        .expect("run records list");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No records."), "stdout: {stdout}");
}

#[test]
fn unauthenticated_import_is_an_invalid_input_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("sweep.sqlite3");

    let output = crmsweep(dir.path(), &db)
        .args(["import", "contacts"])
        .output()
        .expect("run import");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn analyze_runs_on_an_empty_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("sweep.sqlite3");

    let output = crmsweep(dir.path(), &db)
        .args(["--json", "analyze", "contacts"])
        .output()
        .expect("run analyze");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"total_groups\": 0"), "stdout: {stdout}");
}

use std::process::Command;

fn neurohub() -> Command {
    Command::new(env!("CARGO_BIN_EXE_neurohub"))
}

/// Every invocation gets its own NEUROHUB_HOME so state never leaks
/// between tests (or into the developer's real home directory).
fn run_in(home: &std::path::Path, args: &[&str]) -> std::process::Output {
    neurohub()
        .args(args)
        .env("NEUROHUB_HOME", home)
        .env_remove("NEUROHUB_STATE_PATH")
        .output()
        .unwrap()
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

// --- catalog commands ---

#[test]
fn list_shows_catalog_entries() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = run_in(dir.path(), &["list"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("ds000114"));
    assert!(out.contains("abide"));
    assert!(out.contains("datasets."));
}

#[test]
fn search_finds_by_keyword_and_fails_on_no_match() {
    let dir = tempfile::TempDir::new().unwrap();

    let hit = run_in(dir.path(), &["search", "autism"]);
    assert!(hit.status.success());
    assert!(stdout(&hit).contains("abide"));

    let miss = run_in(dir.path(), &["search", "zzznothing"]);
    assert_eq!(miss.status.code(), Some(1));
}

#[test]
fn info_shows_source_and_access() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = run_in(dir.path(), &["info", "hcp1200"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("s3://hcp-openaccess"));
    assert!(out.contains("requires approval"));
}

#[test]
fn info_unknown_dataset_exits_one() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = run_in(dir.path(), &["info", "not-a-dataset"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn stats_emits_valid_json() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = run_in(dir.path(), &["stats"]);
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(parsed["catalog"]["total"].as_u64().unwrap() > 0);
    assert_eq!(parsed["local_successful_downloads"], 0);
}

// --- pull ---

#[test]
fn pull_unknown_dataset_exits_one() {
    let dir = tempfile::TempDir::new().unwrap();
    let dest = dir.path().join("out");
    let output = run_in(
        dir.path(),
        &["pull", "nope", dest.to_str().unwrap(), "--force"],
    );
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn pull_dry_run_prints_command_and_touches_nothing() {
    let dir = tempfile::TempDir::new().unwrap();
    let dest = dir.path().join("out");
    let output = run_in(
        dir.path(),
        &["pull", "ds000114", dest.to_str().unwrap(), "--dry-run"],
    );
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("aws s3 sync s3://openneuro.org/ds000114"));
    assert!(out.contains("--no-sign-request"));
    // Dry runs neither download nor record anything.
    assert!(!dest.exists());
    assert!(!dir.path().join("state.json").exists());
}

// --- atlas commands ---

#[test]
fn atlas_list_and_info() {
    let dir = tempfile::TempDir::new().unwrap();

    let list = run_in(dir.path(), &["atlas", "list"]);
    assert!(list.status.success());
    assert!(stdout(&list).contains("aal3"));

    let info = run_in(dir.path(), &["atlas", "info", "schaefer2018_100"]);
    assert!(info.status.success());
    assert!(stdout(&info).contains("100"));
}

#[test]
fn atlas_download_writes_csv() {
    let dir = tempfile::TempDir::new().unwrap();
    let out_dir = dir.path().join("atlases");
    let output = run_in(
        dir.path(),
        &[
            "atlas",
            "download",
            "aal3",
            "--output",
            out_dir.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());
    let written = std::fs::read_to_string(out_dir.join("aal3.csv")).unwrap();
    assert!(written.contains("Precentral"));
}

#[test]
fn atlas_download_all_writes_every_table() {
    let dir = tempfile::TempDir::new().unwrap();
    let out_dir = dir.path().join("atlases");
    let output = run_in(
        dir.path(),
        &["atlas", "download-all", "--output", out_dir.to_str().unwrap()],
    );
    assert!(output.status.success());
    let count = std::fs::read_dir(&out_dir).unwrap().count();
    assert!(count >= 4);
}

#[test]
fn atlas_attribution_lists_citations() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = run_in(dir.path(), &["atlas", "attribution"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Schaefer"));
}

// --- telemetry and state ---

#[test]
fn telemetry_enable_disable_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();

    let enable = run_in(dir.path(), &["telemetry", "enable"]);
    assert!(enable.status.success());

    let status = run_in(dir.path(), &["telemetry", "status"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&status)).unwrap();
    assert_eq!(parsed["consent_given"], true);
    assert_eq!(parsed["consent_asked"], true);

    run_in(dir.path(), &["telemetry", "disable"]);
    let status = run_in(dir.path(), &["telemetry", "status"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&status)).unwrap();
    assert_eq!(parsed["consent_given"], false);
}

#[test]
fn state_reset_clears_consent() {
    let dir = tempfile::TempDir::new().unwrap();
    run_in(dir.path(), &["telemetry", "enable"]);
    run_in(dir.path(), &["state", "reset", "--force"]);

    let status = run_in(dir.path(), &["telemetry", "status"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&status)).unwrap();
    assert_eq!(parsed["consent_given"], false);
    assert_eq!(parsed["consent_asked"], false);
}

#[test]
fn check_reports_every_tool() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = run_in(dir.path(), &["check"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("aws"));
    assert!(out.contains("aria2c"));
    assert!(out.contains("datalad"));
}

#[test]
fn analyze_without_log_exits_one() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = run_in(dir.path(), &["analyze"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn analyze_summarizes_given_log() {
    let dir = tempfile::TempDir::new().unwrap();
    let log = dir.path().join("session.log");
    std::fs::write(
        &log,
        "2026-01-01T10:00:00Z - INFO - started\n\
         2026-01-01T10:01:00Z - ERROR - connection timed out\n\
         2026-01-01T10:02:00Z - WARNING - slow mirror\n",
    )
    .unwrap();

    let output = run_in(dir.path(), &["analyze", log.to_str().unwrap()]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["total_errors"], 1);
    assert_eq!(parsed["total_warnings"], 1);
}

//! Basic CLI E2E tests.
//!
//! Tests run the built binary with HOME pointed at a temp dir so config and
//! stats never touch the real user directory.

use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_focusnoise"))
        .args(args)
        .env("HOME", home)
        .env_remove("FOCUSNOISE_ENV")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

/// Make sessions fast: one tick every 5 ms.
fn fast_ticks(home: &Path) {
    run_ok(home, &["config", "set", "session.tick_interval_ms", "5"]);
}

#[test]
fn test_sounds_lists_catalog() {
    let home = tempfile::tempdir().unwrap();
    let out = run_ok(home.path(), &["sounds"]);
    assert!(out.contains("1."));
    assert!(out.contains("Brown Noise"));
    assert!(out.contains("rain"));
}

#[test]
fn test_sounds_json() {
    let home = tempfile::tempdir().unwrap();
    let out = run_ok(home.path(), &["sounds", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 10);
}

#[test]
fn test_config_get_set_roundtrip() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(home.path(), &["config", "get", "session.default_minutes"]).trim(), "25");
    run_ok(home.path(), &["config", "set", "weather.frequency", "high"]);
    assert_eq!(run_ok(home.path(), &["config", "get", "weather.frequency"]).trim(), "high");

    let path = run_ok(home.path(), &["config", "path"]);
    assert!(path.trim().ends_with("config.toml"));
    assert!(Path::new(path.trim()).starts_with(home.path()));
}

#[test]
fn test_config_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "audio.nope", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_stats_start_empty() {
    let home = tempfile::tempdir().unwrap();
    let out = run_ok(home.path(), &["stats", "--json"]);
    let stats: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(stats["total_focus_seconds"], 0);
    assert_eq!(stats["rank"], "Terminal Tourist");
}

#[test]
fn test_play_records_stats() {
    let home = tempfile::tempdir().unwrap();
    fast_ticks(home.path());

    let out = run_ok(
        home.path(),
        &["play", "rain,1", "--minutes", "1", "--seed", "7", "--json"],
    );
    let receipt: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(receipt["outcome"], "completed");
    assert_eq!(receipt["session_duration_secs"], 60);
    assert_eq!(receipt["stats_saved"], true);

    let stats: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["stats", "--json"])).unwrap();
    assert_eq!(stats["total_focus_seconds"], 60);
    assert_eq!(stats["current_streak_days"], 1);
    assert_eq!(stats["sessions_completed"], 1);
}

#[test]
fn test_play_recovers_from_corrupt_stats() {
    let home = tempfile::tempdir().unwrap();
    fast_ticks(home.path());
    let data = home.path().join(".config").join("focusnoise");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("stats.json"), "{ truncated").unwrap();

    let (stdout, stderr, code) = run_cli(home.path(), &["play", "rain", "-m", "1", "--json"]);
    assert_eq!(code, 0, "play failed: {stderr}");
    let receipt: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(receipt["stats_saved"], true);

    assert_eq!(
        std::fs::read_to_string(data.join("stats.json.corrupt")).unwrap(),
        "{ truncated"
    );
    let stats: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["stats", "--json"])).unwrap();
    assert_eq!(stats["total_focus_seconds"], 60);
}

#[test]
fn test_play_text_receipt_without_saving() {
    let home = tempfile::tempdir().unwrap();
    fast_ticks(home.path());

    let out = run_ok(home.path(), &["play", "fire", "-m", "1", "--no-save"]);
    assert!(out.contains("SESSION RECEIPT"));
    assert!(out.contains("Fire"));

    let stats: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["stats", "--json"])).unwrap();
    assert_eq!(stats["total_focus_seconds"], 0);
}

#[test]
fn test_play_without_valid_sounds_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["play", "kazoo"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no valid sounds"));
}

#[test]
fn test_completions() {
    let home = tempfile::tempdir().unwrap();
    let out = run_ok(home.path(), &["completions", "bash"]);
    assert!(out.contains("focusnoise"));
}

//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with an isolated config directory and
//! verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(config_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_kissan-cli"))
        .args(args)
        .env("KISSAN_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("Failed to parse JSON line"))
        .collect()
}

#[test]
fn test_config_get_default() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "engagement.poll_interval_secs"]);
    assert_eq!(code, 0, "config get failed");
    assert_eq!(stdout.trim(), "10");
    assert!(dir.path().join("config.toml").exists(), "defaults written on first load");
}

#[test]
fn test_config_set_persists() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        dir.path(),
        &["config", "set", "engagement.reward_threshold_secs", "120"],
    );
    assert_eq!(code, 0, "config set failed");
    assert_eq!(stdout.trim(), "ok");

    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "engagement.reward_threshold_secs"]);
    assert_eq!(stdout.trim(), "120");
}

#[test]
fn test_config_rejects_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "engagement.nope", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));

    let (code, _, _) = run_cli(dir.path(), &["config", "get", "engagement.nope"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_list_json() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "list"]);
    assert_eq!(code, 0, "config list failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["engagement"]["dwell_mode"], "cumulative");
    assert_eq!(parsed["api"]["reward_path"], "users/stay-reward");
}

#[test]
fn test_simulate_default_script() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["engagement", "simulate"]);
    assert_eq!(code, 0, "simulate failed");

    let lines = json_lines(&stdout);
    let types: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["tracking_started", "reward_triggered", "state_snapshot"]);
    assert_eq!(lines[1]["t"], 300);
    assert_eq!(lines[2]["rewarded"], true);
}

#[test]
fn test_simulate_uses_configured_threshold() {
    let dir = tempfile::tempdir().unwrap();
    run_cli(dir.path(), &["config", "set", "engagement.reward_threshold_secs", "60"]);
    let (code, stdout, _) = run_cli(dir.path(), &["engagement", "simulate", "--until", "100"]);
    assert_eq!(code, 0);

    let lines = json_lines(&stdout);
    assert_eq!(lines[1]["type"], "reward_triggered");
    assert_eq!(lines[1]["t"], 60);
}

#[test]
fn test_simulate_continuous_mode_resets_on_background() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        dir.path(),
        &[
            "engagement",
            "simulate",
            "--script",
            "0:enable,200:background,210:active",
            "--until",
            "600",
            "--dwell-mode",
            "continuous",
        ],
    );
    assert_eq!(code, 0);

    let lines = json_lines(&stdout);
    let trigger = lines
        .iter()
        .find(|l| l["type"] == "reward_triggered")
        .expect("reward should trigger");
    assert_eq!(trigger["t"], 510);
}

#[test]
fn test_simulate_rejects_bad_script() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(
        dir.path(),
        &["engagement", "simulate", "--script", "0:enable,10:nap"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown lifecycle state"));
}

#[test]
fn test_simulate_rejects_out_of_range_until() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_cli(
        dir.path(),
        &[
            "engagement",
            "simulate",
            "--script",
            "18446744073709551615:enable",
            "--until",
            "18446744073709551615",
        ],
    );
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("error:"), "stderr: {stderr}");
    assert!(!stderr.contains("panicked"));
}

#[test]
fn test_simulate_long_horizon_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        dir.path(),
        &["engagement", "simulate", "--until", "100000000000"],
    );
    assert_eq!(code, 0, "simulate failed");

    let lines = json_lines(&stdout);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1]["t"], 300);
    assert_eq!(lines[2]["t"], 100_000_000_000u64);
}

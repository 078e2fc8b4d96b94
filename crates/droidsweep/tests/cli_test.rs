//! Integration tests for the `droidsweep` CLI binary.
//!
//! These cover argument parsing, help output, shell completions, config
//! handling and the exit-code contract, all without an ADB server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `droidsweep` binary with env isolation.
///
/// Clears every `DROIDSWEEP_*` variable and points config directories at
/// a nonexistent path so tests never touch the user's configuration.
fn droidsweep_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("droidsweep");
    cmd.env("HOME", "/tmp/droidsweep-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/droidsweep-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("DROIDSWEEP_CONFIG")
        .env_remove("DROIDSWEEP_BRIDGE")
        .env_remove("DROIDSWEEP_TIMEOUT")
        .env_remove("DROIDSWEEP_OUTPUT")
        .env_remove("DROIDSWEEP_WIFI_PASSWORD");
    cmd
}

/// A port nothing listens on, so bridge connections are refused.
const DEAD_BRIDGE: &str = "127.0.0.1:1";

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = droidsweep_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_flag() {
    droidsweep_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("devices")
            .and(predicate::str::contains("run"))
            .and(predicate::str::contains("sweep")),
    );
}

#[test]
fn test_version_flag() {
    droidsweep_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("droidsweep"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    droidsweep_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    droidsweep_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Catalog ─────────────────────────────────────────────────────────

#[test]
fn test_actions_plain_lists_catalog() {
    droidsweep_cmd()
        .args(["actions", "-o", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("captureScreen")
                .and(predicate::str::contains("enableWirelessDebug"))
                .and(predicate::str::contains("swipe"))
                .and(predicate::str::contains("screenRecord"))
                .and(predicate::str::contains("forwardDevTools")),
        );
}

#[test]
fn test_actions_json_is_valid() {
    let output = droidsweep_cmd()
        .args(["actions", "-o", "json-compact"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.trim_start().starts_with('['), "{text}");
    assert!(text.contains(r#""name":"installPackage""#), "{text}");
}

// ── Exit codes ──────────────────────────────────────────────────────

#[test]
fn test_unknown_action_is_usage_error() {
    let output = droidsweep_cmd()
        .args(["--bridge", DEAD_BRIDGE, "--no-log", "run", "fly"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Unknown action"));
}

#[test]
fn test_unknown_param_is_usage_error() {
    let output = droidsweep_cmd()
        .args(["--bridge", DEAD_BRIDGE, "--no-log", "run", "swipe", "-P", "speed=9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_malformed_param_is_rejected_by_parser() {
    let output = droidsweep_cmd()
        .args(["run", "tap", "-P", "no-equals-sign"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("KEY=VALUE"));
}

#[test]
fn test_unreachable_bridge_is_connection_error() {
    let output = droidsweep_cmd()
        .args(["--bridge", DEAD_BRIDGE, "--timeout", "2", "devices"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains(DEAD_BRIDGE));
}

#[test]
fn test_sweep_on_unreachable_bridge_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = droidsweep_cmd()
        .current_dir(dir.path())
        .args([
            "--bridge",
            DEAD_BRIDGE,
            "--timeout",
            "2",
            "--no-log",
            "sweep",
            "--actions",
            "listDevices,home",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    droidsweep_cmd()
        .args(["config", "path", "--config", "/tmp/elsewhere/droidsweep.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/elsewhere/droidsweep.toml"));
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path_str = path.to_str().unwrap();

    droidsweep_cmd()
        .args(["config", "init", "--defaults", "--config", path_str])
        .assert()
        .success();
    assert!(path.exists());

    droidsweep_cmd()
        .args(["config", "show", "--config", path_str])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[bridge]")
                .and(predicate::str::contains("max_concurrency = 8")),
        );

    // A second init without --force refuses to overwrite.
    let output = droidsweep_cmd()
        .args(["config", "init", "--defaults", "--config", path_str])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

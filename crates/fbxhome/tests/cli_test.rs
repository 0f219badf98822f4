//! Integration tests for the `fbxhome` CLI binary.
//!
//! Argument parsing, completions, input validation and local state
//! commands. Nothing here needs a reachable appliance: every failing
//! command is rejected before a session is opened.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `fbxhome` binary with env isolation.
///
/// Clears the `FBXHOME_*` variables the CLI reads and points config
/// directories at a nonexistent path.
fn fbxhome_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fbxhome");
    cmd.env("HOME", "/tmp/fbxhome-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/fbxhome-cli-test-nonexistent")
        .env_remove("FBXHOME_PROFILE")
        .env_remove("FBXHOME_HOST")
        .env_remove("FBXHOME_OUTPUT")
        .env_remove("FBXHOME_TIMEOUT")
        .env_remove("FBXHOME_CA_CERT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = fbxhome_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_flag() {
    fbxhome_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Freebox")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("remote"))
            .and(predicate::str::contains("reboot")),
    );
}

#[test]
fn test_version_flag() {
    fbxhome_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fbxhome"));
}

#[test]
fn test_completions_zsh() {
    fbxhome_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    fbxhome_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Input validation ────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = fbxhome_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_unknown_remote_code_is_rejected() {
    let output = fbxhome_cmd().args(["remote", "eject"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("eject"), "Expected the code in the error:\n{text}");
}

#[test]
fn test_repeat_above_limit_is_rejected() {
    let output = fbxhome_cmd()
        .args(["remote", "up", "--repeat", "11"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("exceeds"));
}

#[test]
fn test_reboot_requires_yes() {
    let output = fbxhome_cmd().arg("reboot").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("requires confirmation"));
}

#[test]
fn test_wifi_off_requires_yes() {
    let output = fbxhome_cmd().args(["wifi", "off"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("requires confirmation"));
}

#[test]
fn test_wifi_rejects_unknown_state() {
    let output = fbxhome_cmd().args(["wifi", "sideways"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("sideways"));
}

#[test]
fn test_wifi_on_reaches_authentication() {
    let output = fbxhome_cmd().args(["wifi", "on"]).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("signer"));
}

#[test]
fn test_devices_without_signer_is_an_auth_error() {
    let output = fbxhome_cmd().arg("devices").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("signer"));
}

#[test]
fn test_unknown_profile() {
    let output = fbxhome_cmd()
        .args(["--profile", "cottage", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("cottage"));
}

// ── Local state ─────────────────────────────────────────────────────

#[test]
fn test_invert_shutter_persists_option() {
    let dir = tempfile::tempdir().unwrap();
    fbxhome_cmd()
        .env("FBXHOME_PROFILES__DEFAULT__STATE_DIR", dir.path())
        .args(["invert-shutter", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Shutter 12: inverted"));

    let stored = std::fs::read_to_string(dir.path().join("fbxhome_config.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(doc["version"], 1);
    assert_eq!(doc["data"]["inverted_shutters"], serde_json::json!([12]));

    fbxhome_cmd()
        .env("FBXHOME_PROFILES__DEFAULT__STATE_DIR", dir.path())
        .args(["invert-shutter", "12", "--off"])
        .assert()
        .success();

    let stored = std::fs::read_to_string(dir.path().join("fbxhome_config.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(doc["data"]["inverted_shutters"], serde_json::json!([]));
}

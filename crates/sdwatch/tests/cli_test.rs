//! Integration tests for the `sdwatch` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! configuration handling, and connection error paths without a live
//! systemd manager.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `sdwatch` binary with env isolation.
///
/// Clears all `SDWATCH_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn sdwatch_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sdwatch");
    cmd.env("HOME", "/tmp/sdwatch-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/sdwatch-cli-test-nonexistent")
        .env_remove("SDWATCH_PROFILE")
        .env_remove("SDWATCH_BUS")
        .env_remove("SDWATCH_ADDRESS")
        .env_remove("SDWATCH_TIMEOUT")
        .env_remove("SDWATCH_OUTPUT")
        .env_remove("SDWATCH_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// An address nothing listens on.
const DEAD_ADDRESS: &str = "unix:path=/tmp/sdwatch-cli-test-nonexistent/bus";

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = sdwatch_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    sdwatch_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("systemd")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    sdwatch_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sdwatch"));
}

#[test]
fn test_invalid_subcommand() {
    sdwatch_cmd()
        .arg("reboot")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_invalid_output_format() {
    sdwatch_cmd()
        .args(["status", "--output", "table"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    sdwatch_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sdwatch"));
}

#[test]
fn test_completions_zsh() {
    sdwatch_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    sdwatch_cmd()
        .args(["config", "path", "--config", "/tmp/elsewhere/sdwatch.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/elsewhere/sdwatch.toml"));
}

#[test]
fn test_config_show_without_file_renders_defaults() {
    sdwatch_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_profile = \"system\""));
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path_str = path.to_str().unwrap();

    sdwatch_cmd()
        .args(["config", "init", "--config", path_str])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    assert!(path.exists());

    sdwatch_cmd()
        .args(["config", "show", "-o", "json-compact", "--config", path_str])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"user\""));

    // A second init refuses to clobber the file.
    sdwatch_cmd()
        .args(["config", "init", "--config", path_str])
        .assert()
        .failure()
        .code(2);

    sdwatch_cmd()
        .args(["config", "init", "--force", "--config", path_str])
        .assert()
        .success();
}

#[test]
fn test_config_profiles_lists_builtins() {
    sdwatch_cmd()
        .args(["config", "profiles", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("system").and(predicate::str::contains("user")));
}

#[test]
fn test_profile_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        format!("[profiles.box]\naddress = \"{DEAD_ADDRESS}\"\ntimeout = 2\n"),
    )
    .unwrap();

    sdwatch_cmd()
        .args(["config", "profiles", "--config", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("box"));

    // The profile's dead address is dialed, so this is a connection error.
    sdwatch_cmd()
        .args(["status", "--profile", "box", "--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .code(7);
}

// ── Connection errors ───────────────────────────────────────────────

#[test]
fn test_status_unreachable_bus() {
    let output = sdwatch_cmd()
        .args(["status", "--address", DEAD_ADDRESS])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    let text = combined_output(&output);
    assert!(
        text.contains("Could not connect"),
        "Expected connection error in output:\n{text}"
    );
}

#[test]
fn test_watch_unreachable_bus() {
    sdwatch_cmd()
        .args(["watch", "--address", DEAD_ADDRESS])
        .assert()
        .failure()
        .code(7);
}

#[test]
fn test_unknown_profile() {
    sdwatch_cmd()
        .args(["status", "--profile", "nas"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("nas"));
}

#[test]
fn test_zero_timeout_rejected() {
    sdwatch_cmd()
        .args(["status", "--timeout", "0", "--address", DEAD_ADDRESS])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("timeout"));
}

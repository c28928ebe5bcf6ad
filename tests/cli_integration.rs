//! Integration tests for the ris-puppet binary.
//!
//! These tests exercise argument parsing, exit codes and the `ERROR:`
//! reporting contract; workflow behavior is covered in
//! `workflow_integration.rs`.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for running ris-puppet with no ambient configuration.
fn ris_puppet(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ris-puppet").unwrap();
    cmd.env_remove("RIS_PUPPET_CONFIG")
        .env_remove("RUST_LOG")
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("xdg"));
    cmd
}

fn write_config(dir: &TempDir, control_repo_url: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        format!(
            r#"
control_repo_url = "{control_repo_url}"
default_environment = "development"
protected_environments = ["production"]
module_groups = ["puppet-modules-int"]
"#
        ),
    )
    .unwrap();
    path
}

#[test]
fn help_flag_works() {
    let home = TempDir::new().unwrap();
    ris_puppet(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("control repository"));
}

#[test]
fn version_flag_works() {
    let home = TempDir::new().unwrap();
    ris_puppet(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ris-puppet"));
}

#[test]
fn missing_config_is_reported_with_error_prefix() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.toml");
    ris_puppet(&home)
        .args(["environment", "list", "--config"])
        .arg(&missing)
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("ERROR: "));
}

#[test]
fn incomplete_config_names_missing_key() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("config.toml");
    fs::write(&path, "default_environment = \"development\"\n").unwrap();
    ris_puppet(&home)
        .args(["environment", "--config"])
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("ERROR:").and(predicate::str::contains("control_repo_url")));
}

#[test]
fn protected_environment_fails_without_touching_git() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "/nonexistent/control_repo.git");
    ris_puppet(&home)
        .args(["module", "deploy", "-e", "production", "--config"])
        .arg(&config)
        .arg("--cwd")
        .arg(home.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("ERROR:").and(predicate::str::contains("--force")));
}

#[test]
fn trace_prints_failing_command() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, &home.path().join("missing.git").display().to_string());
    ris_puppet(&home)
        .args(["environment", "list", "--trace", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("ERROR: git ls-remote failed"))
        .stderr(predicate::str::contains("command: git ls-remote --heads"));
}

#[test]
fn validate_outside_repository_fails() {
    let home = TempDir::new().unwrap();
    ris_puppet(&home)
        .args(["module", "validate", "--cwd"])
        .arg(home.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("ERROR: not a git repository"));
}

#[test]
fn completion_generates_script() {
    let home = TempDir::new().unwrap();
    ris_puppet(&home)
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ris-puppet"));
}

#[test]
fn invalid_environment_name_is_reported_with_error_prefix() {
    let home = TempDir::new().unwrap();
    ris_puppet(&home)
        .args(["module", "pin", "-e", "bad..name"])
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("ERROR: ").and(predicate::str::contains("bad..name")));
}

#[test]
fn missing_required_option_is_reported_with_error_prefix() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "/nonexistent/control_repo.git");
    let assert = ris_puppet(&home)
        .args(["environment", "create", "-e", "feature_x", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("ERROR: ").and(predicate::str::contains("--from")));
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert_eq!(stdout.lines().count(), 1, "{stdout}");
}

//! Tests for error reporting and exit codes.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use tempfile::TempDir;

fn graft(home: &Path) -> Command {
    let mut cmd = cargo::cargo_bin_cmd!("graft");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("GRAFT_GENERATORS_DIR")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_unknown_generator_is_not_found() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    graft(home.path())
        .current_dir(project.path())
        .args(["run", "--yes", "nope"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unknown generator 'nope'"));
}

#[test]
fn test_existing_file_with_other_content_is_a_conflict() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("README.md"), "# Hand written\n").unwrap();

    graft(home.path())
        .current_dir(project.path())
        .args(["run", "--yes", "readme", "--title", "Other"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("conflict"));

    assert_eq!(
        fs::read_to_string(project.path().join("README.md")).unwrap(),
        "# Hand written\n"
    );
}

#[test]
fn test_unknown_flag_is_user_error() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    graft(home.path())
        .current_dir(project.path())
        .args(["run", "--yes", "readme", "--colour", "red"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--colour"));
}

#[test]
fn test_missing_required_flag_is_user_error() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    graft(home.path())
        .current_dir(project.path())
        .args(["run", "--yes", "config-set", "--value", "1"])
        .assert()
        .code(2);
}

#[test]
fn test_unknown_config_key() {
    let home = TempDir::new().unwrap();
    graft(home.path())
        .args(["config", "get", "no.such.key"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_missing_subcommand_is_usage_error() {
    let home = TempDir::new().unwrap();
    graft(home.path()).assert().failure();
}

#[test]
fn test_non_interactive_run_without_yes_is_refused() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    // stdin is not a terminal under the test harness.
    graft(home.path())
        .current_dir(project.path())
        .args(["run", "readme"])
        .assert()
        .failure();

    assert!(!project.path().join("README.md").exists());
}

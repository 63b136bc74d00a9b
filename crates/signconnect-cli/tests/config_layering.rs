//! Integration tests for configuration layering.
//!
//! Tests the full priority chain: hardcoded defaults < XDG config < project config < CLI args

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use signconnect_test_support::SyntheticImageBuilder;

/// A `signconnect` command run from `cwd` with XDG directories under `home`.
fn signconnect(home: &Path, cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("signconnect").unwrap();
    cmd.current_dir(cwd)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"));
    cmd
}

fn frame(dir: &Path) -> PathBuf {
    let path = dir.join("frame.png");
    SyntheticImageBuilder::solid(16, 16, [1, 2, 3]).save(&path).unwrap();
    path
}

fn write_xdg_config(home: &Path, contents: &str) {
    let dir = home.join("config/signconnect");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_project_config_applies_format() {
    let home = tempfile::tempdir().unwrap();
    fs::write(
        home.path().join(".signconnect.toml"),
        r"
[output]
format = 'json'
",
    )
    .unwrap();

    signconnect(home.path(), home.path())
        .arg("predict")
        .arg(frame(home.path()))
        .assert()
        .code(1) // no models installed
        .stdout(predicate::str::starts_with("["));
}

#[test]
fn test_cli_overrides_project_config() {
    let home = tempfile::tempdir().unwrap();
    fs::write(
        home.path().join(".signconnect.toml"),
        r"
[output]
format = 'json'
",
    )
    .unwrap();

    signconnect(home.path(), home.path())
        .arg("predict")
        .arg("--format")
        .arg("jsonl")
        .arg(frame(home.path()))
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn test_project_config_found_in_parent_dir() {
    let home = tempfile::tempdir().unwrap();
    let nested = home.path().join("session/day1");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        home.path().join(".signconnect.toml"),
        r"
[models]
dir = '/srv/signconnect/models'
",
    )
    .unwrap();

    signconnect(home.path(), &nested)
        .arg("models")
        .arg("path")
        .assert()
        .success()
        .stdout(predicate::str::contains("/srv/signconnect/models"));
}

#[test]
fn test_project_config_overrides_xdg() {
    let home = tempfile::tempdir().unwrap();
    let project = home.path().join("project");
    fs::create_dir_all(&project).unwrap();
    write_xdg_config(
        home.path(),
        r"
[models]
dir = '/from/xdg'
",
    );
    fs::write(
        project.join(".signconnect.toml"),
        r"
[models]
dir = '/from/project'
",
    )
    .unwrap();

    signconnect(home.path(), &project)
        .arg("models")
        .arg("path")
        .assert()
        .success()
        .stdout(predicate::str::contains("/from/project"));
}

#[test]
fn test_cli_models_dir_beats_config() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(
        home.path(),
        r"
[models]
dir = '/from/xdg'
",
    );

    signconnect(home.path(), home.path())
        .arg("models")
        .arg("path")
        .arg("--models-dir")
        .arg("/from/cli")
        .assert()
        .success()
        .stdout(predicate::str::contains("/from/cli"));
}

#[test]
fn test_training_corpus_from_config() {
    let home = tempfile::tempdir().unwrap();
    fs::write(
        home.path().join(".signconnect.toml"),
        r"
[training]
corpus = ['corpus']

[models]
dir = 'models'
",
    )
    .unwrap();

    // The corpus comes from config, so the command gets past argument
    // checks and stops at the missing hand tracking models.
    signconnect(home.path(), home.path())
        .arg("train")
        .arg("--quiet")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Hand tracking models not available"));
}

#[test]
fn test_invalid_config_value_warns() {
    let home = tempfile::tempdir().unwrap();
    fs::write(
        home.path().join(".signconnect.toml"),
        r"
[detection]
min_detection_confidence = 3.0
",
    )
    .unwrap();

    signconnect(home.path(), home.path())
        .arg("models")
        .arg("path")
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "warning: detection.min_detection_confidence",
        ));
}

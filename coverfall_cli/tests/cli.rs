use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("preload"));
}

#[test]
fn test_completions_bash() {
    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.arg("completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("coverfall"));
}

#[test]
fn test_resolve_requires_an_identifying_field() {
    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.arg("resolve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to resolve"));
}

#[test]
fn test_batch_missing_file() {
    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.arg("batch")
        .arg("/nonexistent/books.jsonl")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_batch_rejects_malformed_record() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("books.jsonl");
    fs::write(&input, "not json\n").unwrap();

    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.arg("batch")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1"));
}

#[test]
fn test_probe_local_asset_path_needs_no_network() {
    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.arg("probe")
        .arg("/images/placeholder-book.svg")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn test_probe_unsupported_scheme_fails() {
    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.arg("probe")
        .arg("ftp://example.com/cover.jpg")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed"));
}

#[test]
fn test_preload_requires_urls() {
    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.arg("preload")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No URLs to preload"));
}

#[test]
fn test_preload_help_describes_the_probe_pass() {
    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.args(["preload", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Probe a batch of image URLs"));
}

#[test]
fn test_config_get_default_value() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp_dir.path())
        .arg("config")
        .arg("get")
        .arg("resolver.max_results")
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));
}

#[test]
fn test_config_set_then_get_round_trips() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp_dir.path())
        .arg("config")
        .arg("set")
        .arg("resolver.probe_timeout_secs")
        .arg("7")
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp_dir.path())
        .arg("config")
        .arg("get")
        .arg("resolver.probe_timeout_secs")
        .assert()
        .success()
        .stdout(predicate::str::contains("7"));
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp_dir.path())
        .arg("config")
        .arg("set")
        .arg("resolver.min_confidence")
        .arg("5.0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 0.0 and 1.0"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp_dir.path())
        .arg("config")
        .arg("init")
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp_dir.path())
        .arg("config")
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    let mut cmd = Command::cargo_bin("coverfall").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp_dir.path())
        .arg("config")
        .arg("init")
        .arg("--force")
        .assert()
        .success();
}

//! CLI tests for the `mltrack` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn mltrack() -> Command {
    let mut cmd = Command::cargo_bin("mltrack").unwrap();
    cmd.env_remove("MLTRACK_OWNER")
        .env_remove("MLTRACK_REPO")
        .env_remove("DAGSHUB_CLIENT_HOST")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_uri_defaults() {
    mltrack()
        .arg("uri")
        .assert()
        .success()
        .stdout("https://dagshub.com/mewawalaabdeali/MLOperation.mlflow\n");
}

#[test]
fn test_uri_with_overrides() {
    mltrack()
        .args(["uri", "--owner", "AbdeAli", "--repo", "demo", "--host", "http://localhost:3000/"])
        .assert()
        .success()
        .stdout("http://localhost:3000/AbdeAli/demo.mlflow\n");
}

#[test]
fn test_uri_host_from_env() {
    mltrack()
        .env("DAGSHUB_CLIENT_HOST", "https://hub.internal")
        .arg("uri")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("https://hub.internal/"));
}

#[test]
fn test_setup_rejects_empty_owner() {
    mltrack()
        .args(["setup", "--owner", "", "--host", "http://127.0.0.1:9"])
        .env("DAGSHUB_USER_TOKEN", "test")
        .assert()
        .failure()
        .stderr(predicate::str::contains("owner must not be empty"));
}

#[test]
fn test_setup_unreachable_host_fails() {
    mltrack()
        .args(["setup", "--host", "http://127.0.0.1:9"])
        .env("DAGSHUB_USER_TOKEN", "test")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Setup failed"));
}

#[test]
fn test_setup_missing_config_file() {
    mltrack()
        .args(["setup", "--config", "/nonexistent/mltrack.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_uri_repo_from_env() {
    mltrack()
        .env("MLTRACK_OWNER", "someone")
        .env("MLTRACK_REPO", "demo")
        .arg("uri")
        .assert()
        .success()
        .stdout("https://dagshub.com/someone/demo.mlflow\n");
}

#[test]
fn test_bare_command_runs_setup_with_env_target() {
    for args in [vec![], vec!["setup"]] {
        mltrack()
            .args(&args)
            .args(["--host", "http://127.0.0.1:9"])
            .env("MLTRACK_OWNER", "someone")
            .env("DAGSHUB_USER_TOKEN", "test")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Setup failed for someone/MLOperation"));
    }
}

#[test]
fn test_bare_command_accepts_setup_flags() {
    mltrack()
        .args(["--owner", "", "--host", "http://127.0.0.1:9"])
        .env("DAGSHUB_USER_TOKEN", "test")
        .assert()
        .failure()
        .stderr(predicate::str::contains("owner must not be empty"));
}

//! Binary-level tests for the `dossier` CLI.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = cargo_bin_cmd!("dossier");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("research report"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("init-prompts"));
}

#[test]
fn test_cli_run_help() {
    let mut cmd = cargo_bin_cmd!("dossier");
    cmd.args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--follow-guidelines"))
        .stdout(predicate::str::contains("--human-feedback"))
        .stdout(predicate::str::contains("--task-file"))
        .stdout(predicate::str::contains("--publish"));
}

#[test]
fn test_run_without_api_key_fails() {
    let mut cmd = cargo_bin_cmd!("dossier");
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("DOSSIER_API_KEY")
        .args(["run", "solid-state batteries"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key missing"));
}

#[test]
fn test_run_rejects_unknown_language() {
    let mut cmd = cargo_bin_cmd!("dossier");
    cmd.env("OPENAI_API_KEY", "test")
        .args(["run", "q", "--language", "fr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown language"));
}

#[test]
fn test_run_rejects_empty_query() {
    let mut cmd = cargo_bin_cmd!("dossier");
    cmd.env("OPENAI_API_KEY", "test")
        .args(["run", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Query cannot be empty"));
}

#[test]
fn test_init_prompts_into_dir() {
    let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let mut cmd = cargo_bin_cmd!("dossier");
    cmd.args(["init-prompts"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 10 prompt template(s)"));
    assert!(dir.path().join("reviewer.md").exists());
    assert!(dir.path().join("writer.zh.md").exists());

    let mut again = cargo_bin_cmd!("dossier");
    again
        .args(["--format", "json", "init-prompts"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 0"));
}

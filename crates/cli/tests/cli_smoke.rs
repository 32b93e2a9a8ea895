//! CLI smoke tests for gantry.
//!
//! These tests run the real binary against jobs in a temp directory and check
//! exit codes and the streamed trace.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the gantry binary.
fn gantry_cmd() -> Command {
  cargo_bin_cmd!("gantry")
}

/// Job whose script succeeds and prints a job variable.
const HELLO_JOB: &str = r#"{
  "id": 42,
  "token": "job-token",
  "steps": [{ "name": "script", "script": ["echo hello from $GREETING"] }],
  "variables": [{ "key": "GREETING", "value": "gantry" }]
}"#;

/// Job whose script exits non-zero.
const FAILING_JOB: &str = r#"{
  "id": 43,
  "steps": [{ "name": "script", "script": ["exit 3"] }]
}"#;

/// Job that echoes a non-public variable.
const SECRET_JOB: &str = r#"{
  "id": 44,
  "steps": [{ "name": "script", "script": ["echo deploying with $DEPLOY_KEY"] }],
  "variables": [{ "key": "DEPLOY_KEY", "value": "s3cr3t-value", "public": false }]
}"#;

/// Write a config with a single runner using `executor` and a job file.
fn workspace(executor: &str, job: &str) -> (TempDir, PathBuf, PathBuf) {
  let temp = TempDir::new().unwrap();
  let config = temp.path().join("config.toml");
  let builds = temp.path().join("builds");
  std::fs::write(
    &config,
    format!(
      "concurrent = 2\nprepare_retry_interval = \"0s\"\n\n[[runners]]\nname = \"local\"\nexecutor = \"{}\"\nshell = \"bash\"\nbuilds_dir = \"{}\"\n",
      executor,
      builds.display()
    ),
  )
  .unwrap();
  let job_path = temp.path().join("job.json");
  std::fs::write(&job_path, job).unwrap();
  (temp, config, job_path)
}

fn run_cmd(config: &Path, job: &Path) -> Command {
  let mut cmd = gantry_cmd();
  cmd.arg("run").arg(job).arg("--config").arg(config);
  cmd
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  gantry_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  gantry_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("gantry"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["run", "executors"] {
    gantry_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// Executors
// =============================================================================

#[test]
fn executors_lists_builtins() {
  gantry_cmd()
    .arg("executors")
    .assert()
    .success()
    .stdout(predicate::str::contains("shell").and(predicate::str::contains("bash")));
}

#[test]
fn executors_json_is_parseable() {
  let output = gantry_cmd().args(["executors", "--json"]).output().unwrap();
  assert!(output.status.success());

  let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(value["executors"], serde_json::json!(["shell"]));
  assert_eq!(value["shells"], serde_json::json!(["bash"]));
}

// =============================================================================
// Run
// =============================================================================

#[test]
fn run_streams_trace_and_succeeds() {
  let (temp, config, job) = workspace("shell", HELLO_JOB);

  run_cmd(&config, &job)
    .assert()
    .success()
    .stdout(predicate::str::contains("hello from gantry"))
    .stdout(predicate::str::contains("Job succeeded"));

  assert!(temp.path().join("builds").join("job-42").is_dir());
}

#[test]
fn failing_script_exits_with_job_failure() {
  let (_temp, config, job) = workspace("shell", FAILING_JOB);

  run_cmd(&config, &job)
    .assert()
    .code(1)
    .stdout(predicate::str::contains("ERROR: Job failed: exit code 3"));
}

#[test]
fn unknown_executor_exits_with_system_failure() {
  let (_temp, config, job) = workspace("docker", HELLO_JOB);

  run_cmd(&config, &job)
    .assert()
    .code(2)
    .stderr(predicate::str::contains("executor not found: docker"));
}

#[test]
fn unknown_runner_exits_with_system_failure() {
  let (_temp, config, job) = workspace("shell", HELLO_JOB);

  run_cmd(&config, &job)
    .args(["--runner", "missing"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("runner not found: missing"));
}

#[test]
fn missing_job_file_exits_with_system_failure() {
  let (temp, config, _job) = workspace("shell", HELLO_JOB);

  run_cmd(&config, &temp.path().join("nope.json"))
    .assert()
    .code(2)
    .stderr(predicate::str::contains("Failed to read job"));
}

#[test]
fn config_path_from_environment() {
  let (_temp, config, job) = workspace("shell", HELLO_JOB);

  gantry_cmd()
    .arg("run")
    .arg(&job)
    .env("GANTRY_CONFIG", &config)
    .assert()
    .success()
    .stdout(predicate::str::contains("hello from gantry"));
}

#[test]
fn non_public_variables_are_masked() {
  let (_temp, config, job) = workspace("shell", SECRET_JOB);

  run_cmd(&config, &job)
    .assert()
    .success()
    .stdout(predicate::str::contains("deploying with [MASKED]"))
    .stdout(predicate::str::contains("s3cr3t-value").not());
}

#[test]
fn runs_several_jobs() {
  let (temp, config, job) = workspace("shell", HELLO_JOB);
  let second = temp.path().join("second.json");
  std::fs::write(&second, SECRET_JOB).unwrap();

  run_cmd(&config, &job)
    .arg(&second)
    .assert()
    .success()
    .stdout(predicate::str::contains("hello from gantry"))
    .stdout(predicate::str::contains("deploying with [MASKED]"))
    .stderr(predicate::str::contains("Job 42 succeeded").and(predicate::str::contains("Job 44 succeeded")));

  assert!(temp.path().join("builds").join("job-42").is_dir());
  assert!(temp.path().join("builds").join("job-44").is_dir());
}

#[test]
fn one_failing_job_fails_the_run() {
  let (temp, config, job) = workspace("shell", HELLO_JOB);
  let failing = temp.path().join("failing.json");
  std::fs::write(&failing, FAILING_JOB).unwrap();

  run_cmd(&config, &job)
    .arg(&failing)
    .assert()
    .code(1)
    .stdout(predicate::str::contains("hello from gantry"))
    .stderr(predicate::str::contains("Job 43 failed"));
}

#[test]
fn bad_job_file_stops_before_any_job_runs() {
  let (temp, config, job) = workspace("shell", HELLO_JOB);

  run_cmd(&config, &job)
    .arg(temp.path().join("nope.json"))
    .assert()
    .code(2)
    .stdout(predicate::str::contains("hello from gantry").not());

  assert!(!temp.path().join("builds").join("job-42").exists());
}

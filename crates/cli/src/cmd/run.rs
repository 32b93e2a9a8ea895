//! Implementation of the `gantry run` command.
//!
//! Loads the agent config and one or more job documents, then runs the jobs
//! through the built-in executors with their traces streamed to stdout. At
//! most `concurrent` jobs run at the same time.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use gantry_lib::build::{Build, Orchestrator, RunError, RunOptions};
use gantry_lib::config::{Config, RunnerConfig};
use gantry_lib::job::JobResponse;
use gantry_lib::registry::Registry;
use gantry_lib::trace::Trace;

use crate::output::{format_duration, print_error, print_success, print_warning};

/// Exit code for a job that ran and failed.
const EXIT_JOB_FAILURE: u8 = 1;
/// Exit code for a run the agent could not complete.
const EXIT_SYSTEM_FAILURE: u8 = 2;

/// Outcome of one job: its id, how long it ran and how it ended.
type JobOutcome = (u64, Duration, Result<(), RunError>);

/// Execute the run command.
///
/// Without `--config`, the default config path is used when it exists.
/// Otherwise the jobs run on a single default `shell` runner. Every job file
/// is parsed before any job starts.
pub fn cmd_run(jobs: &[PathBuf], config: Option<&Path>, runner: Option<&str>) -> Result<ExitCode> {
  let config = Arc::new(load_config(config)?);
  let runner = config.runner(runner)?.clone();

  let jobs = jobs.iter().map(|path| load_job(path)).collect::<Result<Vec<_>>>()?;

  let orchestrator =
    Arc::new(Orchestrator::new(Arc::new(Registry::with_builtins())).with_options(RunOptions::from_config(&config)));
  let semaphore = Arc::new(Semaphore::new(config.concurrent.max(1)));

  debug!(jobs = jobs.len(), concurrent = config.concurrent, runner = %runner.name, "running jobs");

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcomes = rt.block_on(async {
    let mut join_set = JoinSet::new();

    for job in jobs {
      let orchestrator = Arc::clone(&orchestrator);
      let config = Arc::clone(&config);
      let semaphore = Arc::clone(&semaphore);
      let runner = runner.clone();

      join_set.spawn(async move {
        let _permit = semaphore.acquire().await.context("Job queue closed")?;

        let job_id = job.id;
        let mut build = Build::new(job, runner);
        let started = Instant::now();
        let result = orchestrator.run(&mut build, &config, &Trace::stdout()).await;

        Ok::<JobOutcome, anyhow::Error>((job_id, started.elapsed(), result))
      });
    }

    collect_outcomes(join_set).await
  });

  // System failures outrank job failures.
  let worst = outcomes.into_iter().filter_map(report).max();
  Ok(worst.map_or(ExitCode::SUCCESS, ExitCode::from))
}

fn load_job(path: &Path) -> Result<JobResponse> {
  let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read job {}", path.display()))?;
  let job = JobResponse::from_json(&text).with_context(|| format!("Failed to parse job {}", path.display()))?;
  debug!(job = job.id, path = %path.display(), "loaded job");
  Ok(job)
}

/// Wait for every job task. A task that died without an outcome counts as a
/// system failure.
async fn collect_outcomes(mut join_set: JoinSet<Result<JobOutcome>>) -> Vec<Result<JobOutcome>> {
  let mut outcomes = Vec::new();

  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok(outcome) => outcomes.push(outcome),
      Err(e) => {
        error!(error = %e, "job task panicked");
        outcomes.push(Err(e.into()));
      }
    }
  }

  outcomes
}

/// Print one job's outcome and return its failure exit code, if any.
fn report(outcome: Result<JobOutcome>) -> Option<u8> {
  let (job_id, elapsed, result) = match outcome {
    Ok(outcome) => outcome,
    Err(e) => {
      print_error(&format!("Job could not run: {:#}", e));
      return Some(EXIT_SYSTEM_FAILURE);
    }
  };
  let elapsed = format_duration(elapsed);

  match result {
    Ok(()) => {
      print_success(&format!("Job {} succeeded in {}", job_id, elapsed));
      None
    }
    Err(e) if e.is_job_failure() => {
      print_error(&format!("Job {} failed after {}: {}", job_id, elapsed, e));
      Some(EXIT_JOB_FAILURE)
    }
    Err(e) => {
      print_error(&format!("Job {} could not run: {}", job_id, e));
      Some(EXIT_SYSTEM_FAILURE)
    }
  }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
  if let Some(path) = path {
    return Ok(Config::load(path)?);
  }

  let path = Config::default_path();
  if path.exists() {
    return Ok(Config::load(&path)?);
  }

  print_warning(&format!(
    "No config at {}, using a default shell runner",
    path.display()
  ));
  Ok(Config {
    runners: vec![RunnerConfig::default()],
    ..Config::default()
  })
}

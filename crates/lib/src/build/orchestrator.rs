//! Build orchestration.
//!
//! The orchestrator drives one [`Build`] through its executor's lifecycle:
//!
//! 1. Resolve the executor provider by name
//! 2. Prepare a fresh executor, retrying infrastructure failures
//! 3. Run every stage in order, retryable stages through
//!    [`run_with_attempts`]
//! 4. Report the outcome to the executor with `finish`
//! 5. `cleanup` the executor
//!
//! Every executor that gets created is cleaned up exactly once, whichever way
//! the build ends. Only a prepared executor is told to `finish`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::consts::{PREPARE_ATTEMPTS, PREPARE_RETRY_INTERVAL};
use crate::executor::{Executor, ExecutorCommand, ExecutorProvider, PrepareOptions};
use crate::registry::Registry;
use crate::trace::Trace;

use super::attempts::{resolve_attempts, run_with_attempts};
use super::{Build, BuildStage, RunError};

/// Agent-side retry policy for executor preparation.
///
/// Deliberately separate from stage attempts: jobs cannot change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
  pub prepare_attempts: u32,
  pub prepare_retry_interval: Duration,
}

impl Default for RunOptions {
  fn default() -> Self {
    Self {
      prepare_attempts: PREPARE_ATTEMPTS,
      prepare_retry_interval: PREPARE_RETRY_INTERVAL,
    }
  }
}

impl RunOptions {
  /// Defaults, with the retry interval taken from `config` when it sets one.
  pub fn from_config(config: &Config) -> Self {
    Self {
      prepare_retry_interval: config.prepare_retry_interval.unwrap_or(PREPARE_RETRY_INTERVAL),
      ..Self::default()
    }
  }
}

/// Runs builds against the backends of a [`Registry`].
#[derive(Debug, Clone)]
pub struct Orchestrator {
  registry: Arc<Registry>,
  options: RunOptions,
}

impl Orchestrator {
  pub fn new(registry: Arc<Registry>) -> Self {
    Self {
      registry,
      options: RunOptions::default(),
    }
  }

  pub fn with_options(mut self, options: RunOptions) -> Self {
    self.options = options;
    self
  }

  /// Run `build` to completion.
  ///
  /// Returns the terminal error of the first stage that failed for good.
  /// Use [`RunError::is_job_failure`] to tell a failed job from a failed
  /// agent. Values of the build's non-public variables are masked in
  /// everything written to `trace`.
  pub async fn run(&self, build: &mut Build, config: &Config, trace: &Trace) -> Result<(), RunError> {
    let executor_name = build.runner.executor.clone();
    let provider = self
      .registry
      .executor(&executor_name)
      .ok_or_else(|| RunError::ExecutorNotFound(executor_name.clone()))?;

    build.refresh_variables();
    let build: &Build = build;
    let trace = &trace.masked(build.variables().secret_values());

    info!(job = build.job.id, executor = %executor_name, "starting build");

    let mut executor = self.prepare_executor(provider.as_ref(), build, config, trace).await?;

    let result = self.execute_stages(executor.as_mut(), build, trace).await;

    executor.finish(result.as_ref().err()).await;
    executor.cleanup().await;

    match &result {
      Ok(()) => {
        info!(job = build.job.id, "build succeeded");
        trace.line("Job succeeded");
      }
      Err(err) => {
        let kind = if err.is_job_failure() { "job" } else { "system" };
        error!(job = build.job.id, kind, error = %err, "build failed");
        trace.line(format!("ERROR: Job failed: {}", err));
      }
    }

    result
  }

  /// Create and prepare executors until one succeeds.
  ///
  /// A job failure stops immediately; other failures are retried up to
  /// `prepare_attempts` times, each with a fresh executor. Every discarded
  /// executor is cleaned up before the next attempt.
  async fn prepare_executor(
    &self,
    provider: &dyn ExecutorProvider,
    build: &Build,
    config: &Config,
    trace: &Trace,
  ) -> Result<Box<dyn Executor>, RunError> {
    let attempts = self.options.prepare_attempts.max(1);
    let interval = self.options.prepare_retry_interval;
    let mut attempt = 1;

    loop {
      let mut executor = provider.create();
      let prepared = executor.prepare(PrepareOptions { config, build, trace }).await;

      let err = match prepared {
        Ok(()) => {
          debug!(attempt, "executor prepared");
          return Ok(executor);
        }
        Err(err) => err,
      };

      executor.cleanup().await;
      trace.line(format!("ERROR: Preparation failed: {}", err));

      if err.is_job_failure() {
        warn!(attempt, error = %err, "preparation failed with job error, not retrying");
        return Err(err.into());
      }

      if attempt >= attempts {
        error!(attempts, error = %err, "preparation failed, giving up");
        return Err(err.into());
      }

      warn!(attempt, attempts, error = %err, "preparation failed, retrying");
      trace.line(format!(
        "Will be retried in {} ...",
        humantime::format_duration(interval)
      ));
      tokio::time::sleep(interval).await;
      attempt += 1;
    }
  }

  async fn execute_stages(&self, executor: &mut dyn Executor, build: &Build, trace: &Trace) -> Result<(), RunError> {
    for stage in BuildStage::ALL {
      self.execute_stage(executor, build, trace, stage).await?;
    }
    Ok(())
  }

  async fn execute_stage(
    &self,
    executor: &mut dyn Executor,
    build: &Build,
    trace: &Trace,
    stage: BuildStage,
  ) -> Result<(), RunError> {
    let attempts = resolve_attempts(stage, build.variables())?;

    let info = executor
      .shell()
      .ok_or_else(|| RunError::MissingShell(build.runner.executor.clone()))?;
    let shell = self
      .registry
      .shell(&info.shell)
      .ok_or_else(|| RunError::ShellNotFound(info.shell.clone()))?;

    let script = shell.generate_script(stage, &info, build)?;
    if script.trim().is_empty() {
      debug!(stage = %stage, "nothing to run, skipping stage");
      return Ok(());
    }

    debug!(stage = %stage, attempts, "executing stage");
    let command = ExecutorCommand::new(stage, script);
    run_with_attempts(executor, &command, attempts, trace).await?;
    Ok(())
  }
}

//! Stage attempts.
//!
//! Retryable stages (fetching sources, artifacts and caches) may be attempted
//! several times. The count comes from a job variable, so it is validated as
//! untrusted input: a value outside `[1, 10]` aborts the build instead of
//! being clamped.

use tracing::{info, warn};

use crate::consts::{DEFAULT_STAGE_ATTEMPTS, MAX_STAGE_ATTEMPTS, MIN_STAGE_ATTEMPTS};
use crate::executor::{Executor, ExecutorCommand};
use crate::job::JobVariables;
use crate::trace::Trace;

use super::{BuildStage, ExecutorError, RunError};

/// Attempt count for `stage`.
///
/// Stages without an attempts variable, and stages whose variable is absent
/// or not an integer, get one attempt.
pub fn resolve_attempts(stage: BuildStage, variables: &JobVariables) -> Result<u32, RunError> {
  let Some(value) = stage
    .attempts_variable()
    .and_then(|name| variables.get(name))
    .and_then(|raw| raw.parse::<i64>().ok())
  else {
    return Ok(DEFAULT_STAGE_ATTEMPTS);
  };

  if !(MIN_STAGE_ATTEMPTS..=MAX_STAGE_ATTEMPTS).contains(&value) {
    return Err(RunError::AttemptsOutOfRange { stage, value });
  }

  Ok(value as u32)
}

/// Run `command` on `executor` until it succeeds or `attempts` runs failed.
///
/// Attempts are strictly sequential and share the executor. The last
/// attempt's error is returned as-is.
pub async fn run_with_attempts(
  executor: &mut dyn Executor,
  command: &ExecutorCommand,
  attempts: u32,
  trace: &Trace,
) -> Result<(), ExecutorError> {
  let attempts = attempts.max(1);
  let mut attempt = 1;

  loop {
    match executor.run(command.clone()).await {
      Ok(()) => {
        if attempt > 1 {
          info!(stage = %command.stage, attempt, "stage succeeded after retry");
        }
        return Ok(());
      }
      Err(err) if attempt < attempts => {
        warn!(
          stage = %command.stage,
          attempt,
          attempts,
          error = %err,
          "stage attempt failed, retrying"
        );
        trace.line(format!(
          "WARNING: {} failed (attempt {} of {}): {}",
          command.stage, attempt, attempts, err
        ));
        attempt += 1;
      }
      Err(err) => return Err(err),
    }
  }
}

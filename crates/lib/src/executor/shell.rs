//! Local process executor.
//!
//! Runs each stage script with the configured shell as a child process of
//! the agent, inside the build's project directory. The directory is kept
//! after the build so the next job on the same project can fetch instead of
//! clone.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::build::{BuildError, ExecutorError, RunError};
use crate::consts::BASH_SHELL;
use crate::trace::Trace;

use super::{Executor, ExecutorCommand, ExecutorProvider, PrepareOptions, ShellScriptInfo, ShellType};

/// Creates [`ShellExecutor`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellProvider;

impl ExecutorProvider for ShellProvider {
  fn create(&self) -> Box<dyn Executor> {
    Box::new(ShellExecutor::default())
  }
}

/// Executor running scripts as local processes.
#[derive(Debug, Default)]
pub struct ShellExecutor {
  shell: Option<ShellScriptInfo>,
  project_dir: Option<PathBuf>,
  trace: Option<Trace>,
}

#[async_trait]
impl Executor for ShellExecutor {
  fn shell(&self) -> Option<ShellScriptInfo> {
    self.shell.clone()
  }

  async fn prepare(&mut self, options: PrepareOptions<'_>) -> Result<(), ExecutorError> {
    let shell = options.build.runner.shell.as_deref().unwrap_or(BASH_SHELL);
    let project_dir = options.build.project_dir();

    options
      .trace
      .line(format!("Using shell executor with {}...", shell));

    tokio::fs::create_dir_all(&project_dir).await.map_err(|e| {
      ExecutorError::system(format!(
        "failed to create build directory {}: {}",
        project_dir.display(),
        e
      ))
    })?;

    debug!(dir = ?project_dir, shell = %shell, "shell executor prepared");

    let shell_type = if options.build.runner.login_shell {
      ShellType::Login
    } else {
      ShellType::Normal
    };
    self.shell = Some(ShellScriptInfo {
      shell_type,
      ..ShellScriptInfo::new(shell)
    });
    self.project_dir = Some(project_dir);
    self.trace = Some(options.trace.clone());
    Ok(())
  }

  async fn run(&mut self, command: ExecutorCommand) -> Result<(), ExecutorError> {
    let (Some(shell), Some(project_dir)) = (&self.shell, &self.project_dir) else {
      return Err(ExecutorError::system("shell executor used before prepare"));
    };

    info!(stage = %command.stage, predefined = command.predefined, "running stage script");

    let mut cmd = Command::new(&shell.shell);
    if shell.shell_type == ShellType::Login {
      cmd.arg("-l");
    }
    let mut child = cmd
      .arg("-c")
      .arg(&command.script)
      .current_dir(project_dir)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| ExecutorError::system(format!("failed to start {}: {}", shell.shell, e)))?;

    let trace = self.trace.clone().unwrap_or_else(Trace::sink);
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (status, (), ()) = tokio::join!(
      child.wait(),
      copy_to_trace(stdout, &trace),
      copy_to_trace(stderr, &trace)
    );
    let status =
      status.map_err(|e| ExecutorError::system(format!("failed to wait for {}: {}", shell.shell, e)))?;

    if status.success() {
      return Ok(());
    }

    let err = match status.code() {
      Some(code) => BuildError::from_exit_code(code),
      None => BuildError::new("script terminated by signal"),
    };
    debug!(stage = %command.stage, error = %err, "stage script failed");
    Err(err.into())
  }

  async fn finish(&mut self, outcome: Option<&RunError>) {
    match outcome {
      None => debug!("shell executor finished successfully"),
      Some(err) => warn!(error = %err, "shell executor finished with error"),
    }
  }

  async fn cleanup(&mut self) {
    debug!(dir = ?self.project_dir, "shell executor cleanup");
    self.trace = None;
  }
}

/// Copy a child pipe into the trace line by line while the script runs.
///
/// Trace write failures are logged once and otherwise ignored so the pipe
/// keeps draining; the stage result comes from the exit status alone.
async fn copy_to_trace<R>(pipe: Option<R>, trace: &Trace)
where
  R: AsyncRead + Unpin,
{
  let Some(pipe) = pipe else {
    return;
  };
  let mut reader = BufReader::new(pipe);
  let mut line = Vec::new();
  let mut write_failed = false;

  loop {
    line.clear();
    match reader.read_until(b'\n', &mut line).await {
      Ok(0) => break,
      Ok(_) => {
        if let Err(e) = trace.write_bytes(&line)
          && !write_failed
        {
          warn!(error = %e, "failed to write script output to trace");
          write_failed = true;
        }
      }
      Err(e) => {
        warn!(error = %e, "failed to read script output");
        break;
      }
    }
  }
}

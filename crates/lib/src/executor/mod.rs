//! Executor backends.
//!
//! An executor provisions the environment a job runs in (a local directory,
//! a container, a virtual machine) and runs the scripts the orchestrator
//! hands it. The orchestrator only ever talks to backends through
//! [`Executor`]; backends are selected by name through the
//! [`Registry`](crate::registry::Registry).

pub mod shell;

use async_trait::async_trait;

use crate::build::{Build, BuildStage, ExecutorError, RunError};
use crate::config::Config;
use crate::trace::Trace;

pub use shell::{ShellExecutor, ShellProvider};

/// How the interpreter is started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShellType {
  #[default]
  Normal,
  /// Start as a login shell so profile scripts are sourced.
  Login,
}

/// Identifies the script generator an executor expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellScriptInfo {
  /// Name of a registered [`Shell`](crate::shell::Shell).
  pub shell: String,
  pub shell_type: ShellType,
}

impl ShellScriptInfo {
  pub fn new(shell: impl Into<String>) -> Self {
    Self {
      shell: shell.into(),
      shell_type: ShellType::Normal,
    }
  }
}

/// Everything an executor may look at while preparing.
#[derive(Debug, Clone, Copy)]
pub struct PrepareOptions<'a> {
  pub config: &'a Config,
  pub build: &'a Build,
  pub trace: &'a Trace,
}

/// One rendered stage script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorCommand {
  pub stage: BuildStage,
  pub script: String,
  /// Set for agent-provided stages, clear for the user's own script steps.
  pub predefined: bool,
}

impl ExecutorCommand {
  pub fn new(stage: BuildStage, script: impl Into<String>) -> Self {
    Self {
      stage,
      script: script.into(),
      predefined: stage.is_predefined(),
    }
  }
}

/// A backend instance, owned by exactly one build.
///
/// Lifecycle: `prepare` once; on success any number of sequential `run`
/// calls, then `finish` once; `cleanup` exactly once in every case, including
/// after a failed `prepare`.
#[async_trait]
pub trait Executor: Send {
  /// The shell this executor generates scripts for. Pure and non-blocking.
  fn shell(&self) -> Option<ShellScriptInfo>;

  /// Acquire whatever the backend needs. Return a
  /// [`BuildError`](crate::build::BuildError) for faults retrying cannot fix.
  async fn prepare(&mut self, options: PrepareOptions<'_>) -> Result<(), ExecutorError>;

  /// Run one stage script to completion.
  async fn run(&mut self, command: ExecutorCommand) -> Result<(), ExecutorError>;

  /// Observe the build's terminal outcome. `None` means success.
  async fn finish(&mut self, outcome: Option<&RunError>);

  /// Release every resource. Must tolerate a `prepare` that never succeeded.
  async fn cleanup(&mut self);
}

/// Factory registered under a backend name.
pub trait ExecutorProvider: Send + Sync {
  /// A fresh, unprepared executor.
  fn create(&self) -> Box<dyn Executor>;
}

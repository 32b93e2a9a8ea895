//! Types for running a build.
//!
//! This module defines the stage list and the error taxonomy the retry
//! policies key off: a [`BuildError`] means the job itself is at fault, every
//! other error is treated as an infrastructure failure.

use thiserror::Error;

use crate::consts;
use crate::shell::ShellError;

/// One phase of a job, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStage {
  PrepareScript,
  GetSources,
  DownloadArtifacts,
  RestoreCache,
  BuildScript,
  AfterScript,
  ArchiveCache,
  UploadArtifacts,
}

impl BuildStage {
  /// Every stage, in the order a build runs them.
  pub const ALL: [BuildStage; 8] = [
    BuildStage::PrepareScript,
    BuildStage::GetSources,
    BuildStage::DownloadArtifacts,
    BuildStage::RestoreCache,
    BuildStage::BuildScript,
    BuildStage::AfterScript,
    BuildStage::ArchiveCache,
    BuildStage::UploadArtifacts,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      BuildStage::PrepareScript => "prepare_script",
      BuildStage::GetSources => "get_sources",
      BuildStage::DownloadArtifacts => "download_artifacts",
      BuildStage::RestoreCache => "restore_cache",
      BuildStage::BuildScript => "build_script",
      BuildStage::AfterScript => "after_script",
      BuildStage::ArchiveCache => "archive_cache",
      BuildStage::UploadArtifacts => "upload_artifacts",
    }
  }

  /// Job variable holding this stage's attempt count. `None` for stages that
  /// run exactly once.
  pub fn attempts_variable(self) -> Option<&'static str> {
    match self {
      BuildStage::GetSources => Some(consts::GET_SOURCES_ATTEMPTS),
      BuildStage::DownloadArtifacts => Some(consts::ARTIFACT_DOWNLOAD_ATTEMPTS),
      BuildStage::RestoreCache => Some(consts::RESTORE_CACHE_ATTEMPTS),
      _ => None,
    }
  }

  pub fn is_retryable(self) -> bool {
    self.attempts_variable().is_some()
  }

  /// Whether the agent, not the user, provides this stage's commands.
  pub fn is_predefined(self) -> bool {
    !matches!(self, BuildStage::BuildScript | BuildStage::AfterScript)
  }
}

impl std::fmt::Display for BuildStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The job itself failed: bad script, bad configuration, nonzero exit.
///
/// Never retried during executor preparation and reported to the caller as a
/// failed job rather than an agent incident.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BuildError {
  pub message: String,
  pub exit_code: Option<i32>,
}

impl BuildError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      exit_code: None,
    }
  }

  /// A script that exited with a nonzero status.
  pub fn from_exit_code(code: i32) -> Self {
    Self {
      message: format!("exit code {}", code),
      exit_code: Some(code),
    }
  }
}

/// Errors reported by executor backends.
#[derive(Debug, Error)]
pub enum ExecutorError {
  /// Job-level failure.
  #[error(transparent)]
  Build(#[from] BuildError),

  /// Infrastructure failure described by the backend.
  #[error("{0}")]
  System(String),

  /// I/O error while provisioning or running.
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl ExecutorError {
  pub fn system(message: impl Into<String>) -> Self {
    ExecutorError::System(message.into())
  }

  pub fn is_job_failure(&self) -> bool {
    matches!(self, ExecutorError::Build(_))
  }
}

/// Errors that end a build run.
#[derive(Debug, Error)]
pub enum RunError {
  /// No executor provider registered under the runner's executor name.
  #[error("executor not found: {0}")]
  ExecutorNotFound(String),

  /// The prepared executor did not report which shell it expects.
  #[error("executor {0} did not report a shell")]
  MissingShell(String),

  /// The executor asked for a shell nobody registered.
  #[error("shell not found: {0}")]
  ShellNotFound(String),

  /// A job variable requested an attempt count outside the allowed range.
  #[error("Number of attempts out of the range [1, 10] for stage: {stage}")]
  AttemptsOutOfRange { stage: BuildStage, value: i64 },

  /// Script generation failed.
  #[error(transparent)]
  Shell(#[from] ShellError),

  /// The executor failed. The message is the backend's, unchanged.
  #[error(transparent)]
  Executor(#[from] ExecutorError),
}

impl RunError {
  /// True when the job is at fault rather than the agent or its environment.
  pub fn is_job_failure(&self) -> bool {
    matches!(self, RunError::Executor(e) if e.is_job_failure())
  }

  pub fn build_error(&self) -> Option<&BuildError> {
    match self {
      RunError::Executor(ExecutorError::Build(e)) => Some(e),
      _ => None,
    }
  }
}

impl From<BuildError> for RunError {
  fn from(err: BuildError) -> Self {
    RunError::Executor(ExecutorError::Build(err))
  }
}

//! Script generators.
//!
//! A [`Shell`] turns one stage of a build into a script for a particular
//! interpreter. Executors report which shell they expect through
//! [`ShellScriptInfo`]; the orchestrator looks the generator up by that name.

pub mod bash;

use thiserror::Error;

use crate::build::{Build, BuildStage};
use crate::executor::ShellScriptInfo;

pub use bash::BashShell;

/// Errors produced while rendering a stage script.
#[derive(Debug, Error)]
pub enum ShellError {
  #[error("cannot render {stage} script: {message}")]
  Render { stage: BuildStage, message: String },
}

/// Renders stage scripts for one interpreter.
pub trait Shell: Send + Sync {
  /// Registry key, matched against [`ShellScriptInfo::shell`].
  fn name(&self) -> &str;

  /// Script for `stage`. An empty string means the stage has nothing to do
  /// and is skipped.
  fn generate_script(&self, stage: BuildStage, info: &ShellScriptInfo, build: &Build) -> Result<String, ShellError>;
}

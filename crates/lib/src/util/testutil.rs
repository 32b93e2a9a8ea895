//! Test utilities for gantry-lib.
//!
//! [`ScriptedProvider`] creates executors whose `prepare` and `run` results
//! are scripted in advance and whose every call is recorded in a shared
//! [`Journal`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::build::{Build, BuildError, BuildStage, ExecutorError, RunError};
use crate::config::RunnerConfig;
use crate::executor::{Executor, ExecutorCommand, ExecutorProvider, PrepareOptions, ShellScriptInfo};
use crate::job::{GitInfo, JobResponse, Step, StepName};
use crate::shell::{Shell, ShellError};

/// Shell name reported by scripted executors.
pub const SCRIPT_SHELL: &str = "script-shell";

/// Scripted result of one `prepare` or `run` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Succeed,
  /// Infrastructure failure with this message.
  Fail(&'static str),
  /// Job failure with this message.
  FailJob(&'static str),
}

impl Outcome {
  fn into_result(self) -> Result<(), ExecutorError> {
    match self {
      Outcome::Succeed => Ok(()),
      Outcome::Fail(message) => Err(ExecutorError::system(message)),
      Outcome::FailJob(message) => Err(BuildError::new(message).into()),
    }
  }
}

#[derive(Debug, Default)]
struct JournalState {
  prepare_script: VecDeque<Outcome>,
  run_script: VecDeque<Outcome>,
  created: usize,
  prepares: Vec<usize>,
  runs: Vec<(usize, BuildStage)>,
  finishes: Vec<(usize, Option<String>)>,
  cleanups: Vec<usize>,
}

/// Shared record of everything scripted executors were asked to do.
///
/// Executors are numbered from 0 in creation order.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<JournalState>>);

impl Journal {
  fn state(&self) -> MutexGuard<'_, JournalState> {
    self.0.lock().unwrap()
  }

  /// Results for successive `prepare` calls. Calls past the end succeed.
  pub fn on_prepare(&self, outcomes: impl IntoIterator<Item = Outcome>) {
    self.state().prepare_script.extend(outcomes);
  }

  /// Results for successive `run` calls. Calls past the end succeed.
  pub fn on_run(&self, outcomes: impl IntoIterator<Item = Outcome>) {
    self.state().run_script.extend(outcomes);
  }

  pub fn created(&self) -> usize {
    self.state().created
  }

  pub fn prepares(&self) -> Vec<usize> {
    self.state().prepares.clone()
  }

  /// `(executor, stage)` for every `run` call.
  pub fn runs(&self) -> Vec<(usize, BuildStage)> {
    self.state().runs.clone()
  }

  pub fn run_count(&self) -> usize {
    self.state().runs.len()
  }

  /// Stages in the order they were run, repeats included.
  pub fn stages(&self) -> Vec<BuildStage> {
    self.state().runs.iter().map(|(_, stage)| *stage).collect()
  }

  /// `(executor, error message)` for every `finish` call.
  pub fn finishes(&self) -> Vec<(usize, Option<String>)> {
    self.state().finishes.clone()
  }

  /// Executor ids in `cleanup` call order.
  pub fn cleanups(&self) -> Vec<usize> {
    self.state().cleanups.clone()
  }
}

/// Provider of scripted executors.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
  journal: Journal,
}

impl ScriptedProvider {
  pub fn new() -> (Self, Journal) {
    let journal = Journal::default();
    (
      Self {
        journal: journal.clone(),
      },
      journal,
    )
  }
}

impl ExecutorProvider for ScriptedProvider {
  fn create(&self) -> Box<dyn Executor> {
    let id = {
      let mut state = self.journal.state();
      state.created += 1;
      state.created - 1
    };
    Box::new(ScriptedExecutor {
      id,
      journal: self.journal.clone(),
    })
  }
}

struct ScriptedExecutor {
  id: usize,
  journal: Journal,
}

#[async_trait]
impl Executor for ScriptedExecutor {
  fn shell(&self) -> Option<ShellScriptInfo> {
    Some(ShellScriptInfo::new(SCRIPT_SHELL))
  }

  async fn prepare(&mut self, _options: PrepareOptions<'_>) -> Result<(), ExecutorError> {
    let mut state = self.journal.state();
    state.prepares.push(self.id);
    state.prepare_script.pop_front().unwrap_or(Outcome::Succeed).into_result()
  }

  async fn run(&mut self, command: ExecutorCommand) -> Result<(), ExecutorError> {
    let mut state = self.journal.state();
    state.runs.push((self.id, command.stage));
    state.run_script.pop_front().unwrap_or(Outcome::Succeed).into_result()
  }

  async fn finish(&mut self, outcome: Option<&RunError>) {
    let message = outcome.map(|e| e.to_string());
    self.journal.state().finishes.push((self.id, message));
  }

  async fn cleanup(&mut self) {
    self.journal.state().cleanups.push(self.id);
  }
}

/// Shell rendering the literal `script` for every stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticShell;

impl Shell for StaticShell {
  fn name(&self) -> &str {
    SCRIPT_SHELL
  }

  fn generate_script(&self, _stage: BuildStage, _info: &ShellScriptInfo, _build: &Build) -> Result<String, ShellError> {
    Ok("script".to_string())
  }
}

/// A build of a small successful job, bound to `executor`.
pub fn successful_build(executor: &str) -> Build {
  let job = JobResponse {
    id: 1,
    token: "job-token".to_string(),
    git_info: GitInfo {
      repo_url: "https://example.com/group/project.git".to_string(),
      ref_name: "main".to_string(),
      sha: "91956efe32fb7bef54f378d90c9bd74c19025872".to_string(),
      ..Default::default()
    },
    steps: vec![Step {
      name: StepName::Script,
      script: vec!["echo Hello World".to_string()],
    }],
    ..Default::default()
  };
  let runner = RunnerConfig {
    executor: executor.to_string(),
    ..Default::default()
  };
  Build::new(job, runner)
}

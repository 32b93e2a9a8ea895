//! Builds: one job bound to one runner.
//!
//! A [`Build`] pairs the job received from the coordinator with the runner
//! configuration that selects its executor, and carries the variable set the
//! stages see.
//!
//! # Submodules
//!
//! - [`attempts`] - Attempt count resolution and the stage retry loop
//! - [`orchestrator`] - Executor lifecycle and stage sequencing
//! - [`remote`] - Credential-embedded clone URLs

pub mod attempts;
pub mod orchestrator;
pub mod remote;
mod types;

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::config::RunnerConfig;
use crate::consts::{CI_JOB_TOKEN, CI_PROJECT_PATH, DEFAULT_BUILDS_DIR};
use crate::job::{JobResponse, JobVariable, JobVariables, RefType};

pub use orchestrator::{Orchestrator, RunOptions};
pub use remote::remote_url;
pub use types::*;

/// The unit of work handed to the [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct Build {
  pub job: JobResponse,
  pub runner: RunnerConfig,
  all_variables: JobVariables,
}

impl Build {
  pub fn new(job: JobResponse, runner: RunnerConfig) -> Self {
    let mut build = Self {
      job,
      runner,
      all_variables: JobVariables::new(),
    };
    build.refresh_variables();
    build
  }

  /// The accumulated variable set: job variables, then runner variables, then
  /// variables computed by the agent. Later entries shadow earlier ones.
  pub fn variables(&self) -> &JobVariables {
    &self.all_variables
  }

  /// Recompute [`Build::variables`] after the job or runner changed.
  pub fn refresh_variables(&mut self) {
    let mut variables = self.job.variables.clone();
    variables.extend(self.runner.variables());

    variables.push(JobVariable::new("CI", "true"));
    variables.push(JobVariable::new("CI_SERVER", "yes"));
    variables.push(JobVariable::new("CI_JOB_ID", self.job.id.to_string()));
    if !self.job.token.is_empty() {
      variables.push(JobVariable::secret(CI_JOB_TOKEN, self.job.token.clone()));
    }

    let git = &self.job.git_info;
    variables.push(JobVariable::new("CI_COMMIT_SHA", git.sha.clone()));
    variables.push(JobVariable::new("CI_COMMIT_BEFORE_SHA", git.before_sha.clone()));
    variables.push(JobVariable::new("CI_COMMIT_REF_NAME", git.ref_name.clone()));
    variables.push(JobVariable::new("CI_RUNNER_DESCRIPTION", self.runner.name.clone()));
    if !git.ref_name.is_empty() {
      let key = match git.ref_type {
        RefType::Branch => "CI_COMMIT_BRANCH",
        RefType::Tag => "CI_COMMIT_TAG",
      };
      variables.push(JobVariable::new(key, git.ref_name.clone()));
    }

    let repository_url = remote_url(self.runner.clone_url.as_deref(), &git.repo_url, &variables);
    variables.push(JobVariable::new("CI_REPOSITORY_URL", repository_url));

    let project_dir = project_dir(&self.runner, &self.job, &variables);
    variables.push(JobVariable::new(
      "CI_PROJECT_DIR",
      project_dir.to_string_lossy().into_owned(),
    ));

    self.all_variables = variables;
  }

  /// Clone URL for this build's sources.
  pub fn remote_url(&self) -> String {
    remote_url(
      self.runner.clone_url.as_deref(),
      &self.job.git_info.repo_url,
      &self.all_variables,
    )
  }

  /// Directory the job's sources are checked out into.
  pub fn project_dir(&self) -> PathBuf {
    project_dir(&self.runner, &self.job, &self.all_variables)
  }
}

/// `<builds_dir>/<project path>`, or `<builds_dir>/job-<id>` for jobs that do
/// not name their project or name one that would leave the builds dir.
fn project_dir(runner: &RunnerConfig, job: &JobResponse, variables: &JobVariables) -> PathBuf {
  let builds_dir = runner
    .builds_dir
    .clone()
    .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILDS_DIR));

  match variables.get(CI_PROJECT_PATH).filter(|p| !p.is_empty()) {
    Some(path) if is_relative_subpath(path) => builds_dir.join(path),
    Some(path) => {
      warn!(job = job.id, project_path = %path, "project path escapes the builds dir, using job directory");
      builds_dir.join(format!("job-{}", job.id))
    }
    None => builds_dir.join(format!("job-{}", job.id)),
  }
}

/// Only plain path segments: no root, prefix, `.` or `..`.
fn is_relative_subpath(path: &str) -> bool {
  Path::new(path)
    .components()
    .all(|c| matches!(c, Component::Normal(_)))
}

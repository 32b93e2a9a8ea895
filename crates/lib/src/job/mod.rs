//! Job definitions.
//!
//! A job is what the coordinator hands to the agent: an id and token, where
//! the sources live, the user's script steps and the job variables. The
//! structure deserializes from the JSON document the coordinator serves.

pub mod variables;

use serde::{Deserialize, Serialize};

pub use variables::{JobVariable, JobVariables};

/// Kind of git ref a job was created for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
  #[default]
  Branch,
  Tag,
}

/// Where the job's sources come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
  /// Repository URL the coordinator advertises. Used when the runner has no
  /// clone URL of its own.
  #[serde(default)]
  pub repo_url: String,
  #[serde(default, rename = "ref")]
  pub ref_name: String,
  #[serde(default)]
  pub sha: String,
  #[serde(default)]
  pub before_sha: String,
  #[serde(default)]
  pub ref_type: RefType,
}

/// Which user step a [`Step`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
  Script,
  AfterScript,
}

/// A list of user commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
  pub name: StepName,
  #[serde(default)]
  pub script: Vec<String>,
}

/// A job as received from the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResponse {
  pub id: u64,
  #[serde(default)]
  pub token: String,
  #[serde(default)]
  pub git_info: GitInfo,
  #[serde(default)]
  pub steps: Vec<Step>,
  #[serde(default)]
  pub variables: JobVariables,
}

impl JobResponse {
  /// Parse the JSON document the coordinator serves.
  pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(text)
  }

  /// Commands of the given step, empty when the job has no such step.
  pub fn step_script(&self, name: StepName) -> &[String] {
    self
      .steps
      .iter()
      .find(|s| s.name == name)
      .map(|s| s.script.as_slice())
      .unwrap_or_default()
  }
}

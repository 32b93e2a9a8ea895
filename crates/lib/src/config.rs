//! Runner configuration.
//!
//! The agent reads a TOML file with global settings and one `[[runners]]`
//! table per runner. Each runner selects an executor backend by name.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::consts::{CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE, SHELL_EXECUTOR};
use crate::job::JobVariables;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("runner not found: {0}")]
  RunnerNotFound(String),

  #[error("config defines no runners")]
  NoRunners,
}

/// Global agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
  /// Maximum number of builds the agent runs at once.
  #[serde(default = "default_concurrent")]
  pub concurrent: usize,

  /// Delay between executor preparation attempts. Defaults to three seconds.
  #[serde(default, deserialize_with = "deserialize_duration", skip_serializing)]
  pub prepare_retry_interval: Option<Duration>,

  #[serde(default)]
  pub runners: Vec<RunnerConfig>,
}

fn default_concurrent() -> usize {
  1
}

impl Default for Config {
  fn default() -> Self {
    Self {
      concurrent: default_concurrent(),
      prepare_retry_interval: None,
      runners: Vec::new(),
    }
  }
}

/// Settings of a single runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
  #[serde(default)]
  pub name: String,

  /// Registered executor backend, e.g. `shell`.
  #[serde(default = "default_executor")]
  pub executor: String,

  /// Shell the executor should generate scripts for. Backends pick their own
  /// default when unset.
  #[serde(default)]
  pub shell: Option<String>,

  /// Start the shell as a login shell so profile scripts are sourced.
  #[serde(default)]
  pub login_shell: bool,

  /// Base URL sources are cloned from instead of the job's repository URL.
  #[serde(default)]
  pub clone_url: Option<String>,

  #[serde(default)]
  pub builds_dir: Option<PathBuf>,

  /// Extra `KEY=VALUE` variables for every job on this runner.
  #[serde(default)]
  pub environment: Vec<String>,
}

fn default_executor() -> String {
  SHELL_EXECUTOR.to_string()
}

impl Default for RunnerConfig {
  fn default() -> Self {
    Self {
      name: String::new(),
      executor: default_executor(),
      shell: None,
      login_shell: false,
      clone_url: None,
      builds_dir: None,
      environment: Vec::new(),
    }
  }
}

impl RunnerConfig {
  /// The runner's `environment` entries as job variables.
  pub fn variables(&self) -> JobVariables {
    JobVariables::from_entries(self.environment.iter().map(String::as_str))
  }
}

impl Config {
  pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(text)?)
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&text)
  }

  /// `$GANTRY_CONFIG` when set, otherwise `config.toml` in the working
  /// directory.
  pub fn default_path() -> PathBuf {
    match std::env::var_os(CONFIG_PATH_ENV) {
      Some(path) if !path.is_empty() => PathBuf::from(path),
      _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
  }

  /// The runner called `name`, or the first runner when no name is given.
  pub fn runner(&self, name: Option<&str>) -> Result<&RunnerConfig, ConfigError> {
    match name {
      Some(name) => self
        .runners
        .iter()
        .find(|r| r.name == name)
        .ok_or_else(|| ConfigError::RunnerNotFound(name.to_string())),
      None => self.runners.first().ok_or(ConfigError::NoRunners),
    }
  }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  raw
    .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
    .transpose()
}

//! Job variables.
//!
//! Variables arrive from three places: the job definition, the runner's
//! `environment` setting, and values computed by the agent. They are kept in
//! one ordered list where a later entry shadows an earlier one with the same
//! key.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single `KEY=VALUE` pair attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobVariable {
  pub key: String,
  pub value: String,
  /// Whether the value may be shown in the job trace. Values of non-public
  /// variables are masked in everything the build writes.
  #[serde(default = "default_public")]
  pub public: bool,
}

fn default_public() -> bool {
  true
}

impl JobVariable {
  pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
      public: true,
    }
  }

  /// A variable whose value must never appear in the trace.
  pub fn secret(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      public: false,
      ..Self::new(key, value)
    }
  }

  /// Parse a `KEY=VALUE` entry. Returns `None` when there is no `=`.
  pub fn parse(entry: &str) -> Option<Self> {
    let (key, value) = entry.split_once('=')?;
    if key.is_empty() {
      return None;
    }
    Some(Self::new(key, value))
  }
}

/// Ordered variable list with last-wins lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobVariables(Vec<JobVariable>);

impl JobVariables {
  pub fn new() -> Self {
    Self::default()
  }

  /// Look up a key. When the key occurs more than once, the last entry wins.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.iter().rev().find(|v| v.key == key).map(|v| v.value.as_str())
  }

  pub fn push(&mut self, variable: JobVariable) {
    self.0.push(variable);
  }

  pub fn extend(&mut self, other: impl IntoIterator<Item = JobVariable>) {
    self.0.extend(other);
  }

  pub fn iter(&self) -> impl Iterator<Item = &JobVariable> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Build a list from `KEY=VALUE` entries, skipping malformed ones.
  pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a str>) -> Self {
    let mut variables = Self::new();
    for entry in entries {
      match JobVariable::parse(entry) {
        Some(variable) => variables.push(variable),
        None => warn!(entry = %entry, "ignoring malformed environment entry"),
      }
    }
    variables
  }

  /// Values to mask in the trace: every non-empty value of a non-public
  /// variable, longest first.
  pub fn secret_values(&self) -> Vec<String> {
    let mut values: Vec<String> = self
      .0
      .iter()
      .filter(|v| !v.public && !v.value.is_empty())
      .map(|v| v.value.clone())
      .collect();
    values.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    values.dedup();
    values
  }

  /// Effective value per key, in first-seen key order.
  ///
  /// Shadowed entries are dropped, so exporting the result yields the same
  /// values `get` would return.
  pub fn effective(&self) -> Vec<(&str, &str)> {
    let mut out: Vec<(&str, &str)> = Vec::new();
    for variable in &self.0 {
      match out.iter_mut().find(|(k, _)| *k == variable.key) {
        Some(slot) => slot.1 = variable.value.as_str(),
        None => out.push((variable.key.as_str(), variable.value.as_str())),
      }
    }
    out
  }
}

impl FromIterator<JobVariable> for JobVariables {
  fn from_iter<I: IntoIterator<Item = JobVariable>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl IntoIterator for JobVariables {
  type Item = JobVariable;
  type IntoIter = std::vec::IntoIter<JobVariable>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

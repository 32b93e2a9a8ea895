//! Bash script generation.

use std::fmt::Write;

use tracing::debug;

use crate::build::{Build, BuildStage};
use crate::consts::BASH_SHELL;
use crate::executor::ShellScriptInfo;
use crate::job::StepName;

use super::{Shell, ShellError};

/// Generator for bash and other POSIX-ish shells that understand
/// `set -o pipefail`.
#[derive(Debug, Clone)]
pub struct BashShell {
  name: String,
}

impl BashShell {
  pub fn new() -> Self {
    Self::named(BASH_SHELL)
  }

  /// Register the same generator under another interpreter name.
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

impl Default for BashShell {
  fn default() -> Self {
    Self::new()
  }
}

impl Shell for BashShell {
  fn name(&self) -> &str {
    &self.name
  }

  fn generate_script(&self, stage: BuildStage, _info: &ShellScriptInfo, build: &Build) -> Result<String, ShellError> {
    let body = match stage {
      BuildStage::PrepareScript => "echo \"Running on $(hostname)...\"\n".to_string(),
      BuildStage::GetSources => get_sources(build)?,
      BuildStage::BuildScript => user_commands(build.job.step_script(StepName::Script)),
      BuildStage::AfterScript => user_commands(build.job.step_script(StepName::AfterScript)),
      // Cache and artifact transfer are handled outside the agent core.
      BuildStage::DownloadArtifacts
      | BuildStage::RestoreCache
      | BuildStage::ArchiveCache
      | BuildStage::UploadArtifacts => String::new(),
    };

    if body.is_empty() {
      return Ok(body);
    }

    let mut script = String::from("set -eo pipefail\nset +o noclobber\n");
    for (key, value) in build.variables().effective() {
      if is_identifier(key) {
        let _ = writeln!(script, "export {}={}", key, quote(value));
      } else {
        debug!(key = %key, "not exporting variable with invalid name");
      }
    }
    script.push_str(&body);
    Ok(script)
  }
}

fn get_sources(build: &Build) -> Result<String, ShellError> {
  let remote = build.remote_url();
  if remote.is_empty() {
    return Ok(String::new());
  }

  let git = &build.job.git_info;
  let target = if !git.sha.is_empty() { &git.sha } else { &git.ref_name };
  if target.is_empty() {
    return Err(ShellError::Render {
      stage: BuildStage::GetSources,
      message: "job names neither a commit nor a ref".to_string(),
    });
  }

  let remote = quote(&remote);
  let mut script = String::new();
  let _ = writeln!(script, "echo 'Fetching changes...'");
  let _ = writeln!(script, "if [ -d .git ]; then");
  let _ = writeln!(script, "  git remote set-url origin {}", remote);
  let _ = writeln!(script, "  git fetch origin --prune");
  let _ = writeln!(script, "else");
  let _ = writeln!(script, "  git clone -q {} .", remote);
  let _ = writeln!(script, "fi");
  let _ = writeln!(script, "echo {}", quote(&format!("Checking out {}...", short(target))));
  let _ = writeln!(script, "git checkout -f -q {}", quote(target));
  Ok(script)
}

fn user_commands(lines: &[String]) -> String {
  let mut script = String::new();
  for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
    let _ = writeln!(script, "echo {}", quote(&format!("$ {}", line)));
    let _ = writeln!(script, "{}", line);
  }
  script
}

/// Single-quote `value` for the shell.
fn quote(value: &str) -> String {
  format!("'{}'", value.replace('\'', "'\\''"))
}

fn short(sha: &str) -> &str {
  sha.get(..8).unwrap_or(sha)
}

fn is_identifier(key: &str) -> bool {
  let mut chars = key.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

//! Backend registry.
//!
//! Maps executor names to their providers and shell names to their script
//! generators. Backends register during startup; builds only read. The
//! registry is an explicit value handed to the
//! [`Orchestrator`](crate::build::Orchestrator) so tests can use their own.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::consts::SHELL_EXECUTOR;
use crate::executor::{ExecutorProvider, ShellProvider};
use crate::shell::{BashShell, Shell};

/// Name-keyed executor providers and shells.
#[derive(Default)]
pub struct Registry {
  executors: RwLock<HashMap<String, Arc<dyn ExecutorProvider>>>,
  shells: RwLock<HashMap<String, Arc<dyn Shell>>>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry holding the `shell` executor and the `bash` shell.
  pub fn with_builtins() -> Self {
    let registry = Self::new();
    registry.register_executor(SHELL_EXECUTOR, Arc::new(ShellProvider));
    registry.register_shell(Arc::new(BashShell::new()));
    registry
  }

  /// Install `provider` under `name`, replacing any previous provider.
  pub fn register_executor(&self, name: impl Into<String>, provider: Arc<dyn ExecutorProvider>) {
    let name = name.into();
    let mut executors = self.executors.write().unwrap_or_else(PoisonError::into_inner);
    if executors.insert(name.clone(), provider).is_some() {
      warn!(executor = %name, "replacing registered executor");
    } else {
      debug!(executor = %name, "registered executor");
    }
  }

  /// Install `shell` under the name it reports, replacing any previous one.
  pub fn register_shell(&self, shell: Arc<dyn Shell>) {
    let name = shell.name().to_string();
    let mut shells = self.shells.write().unwrap_or_else(PoisonError::into_inner);
    if shells.insert(name.clone(), shell).is_some() {
      warn!(shell = %name, "replacing registered shell");
    } else {
      debug!(shell = %name, "registered shell");
    }
  }

  pub fn executor(&self, name: &str) -> Option<Arc<dyn ExecutorProvider>> {
    let executors = self.executors.read().unwrap_or_else(PoisonError::into_inner);
    executors.get(name).cloned()
  }

  pub fn shell(&self, name: &str) -> Option<Arc<dyn Shell>> {
    let shells = self.shells.read().unwrap_or_else(PoisonError::into_inner);
    shells.get(name).cloned()
  }

  /// Registered executor names, sorted.
  pub fn executor_names(&self) -> Vec<String> {
    let executors = self.executors.read().unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<_> = executors.keys().cloned().collect();
    names.sort();
    names
  }

  /// Registered shell names, sorted.
  pub fn shell_names(&self) -> Vec<String> {
    let shells = self.shells.read().unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<_> = shells.keys().cloned().collect();
    names.sort();
    names
  }
}

impl std::fmt::Debug for Registry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Registry")
      .field("executors", &self.executor_names())
      .field("shells", &self.shell_names())
      .finish()
  }
}

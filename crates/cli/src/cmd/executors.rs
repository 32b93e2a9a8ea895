use anyhow::Result;

use gantry_lib::registry::Registry;

use crate::output::{print_info, print_json, symbols};

pub fn cmd_executors(json: bool) -> Result<()> {
  let registry = Registry::with_builtins();
  let executors = registry.executor_names();
  let shells = registry.shell_names();

  if json {
    return print_json(&serde_json::json!({ "executors": executors, "shells": shells }));
  }

  print_info("Executors:");
  for name in &executors {
    println!("  {} {}", symbols::ARROW, name);
  }
  print_info("Shells:");
  for name in &shells {
    println!("  {} {}", symbols::ARROW, name);
  }
  Ok(())
}

mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{cmd_executors, cmd_run};
use output::print_error;

/// gantry - CI build agent
#[derive(Parser)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one or more job definitions
  Run {
    /// Paths to job JSON documents, run at most `concurrent` at a time
    #[arg(required = true)]
    jobs: Vec<PathBuf>,

    /// Path to the agent config (default: $GANTRY_CONFIG or config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Runner to execute the job with (default: first runner in the config)
    #[arg(short, long)]
    runner: Option<String>,
  },

  /// List registered executors and shells
  Executors {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Run { jobs, config, runner } => cmd_run(&jobs, config.as_deref(), runner.as_deref()),
    Commands::Executors { json } => cmd_executors(json).map(|()| ExitCode::SUCCESS),
  };

  match result {
    Ok(code) => code,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::from(2)
    }
  }
}

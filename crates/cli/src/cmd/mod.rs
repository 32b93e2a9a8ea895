mod executors;
mod run;

pub use executors::cmd_executors;
pub use run::cmd_run;

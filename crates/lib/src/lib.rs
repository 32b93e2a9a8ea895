//! gantry-lib: Job execution core for the Gantry build agent
//!
//! This crate runs one CI job through a pluggable executor backend:
//! - `Build`: a job bound to the runner that executes it
//! - `Orchestrator`: prepares an executor, runs every stage, finishes and cleans up
//! - `Executor` / `Shell`: the backend and script-generation seams
//! - `Registry`: name-keyed lookup of executor providers and shells

pub mod build;
pub mod config;
pub mod consts;
pub mod executor;
pub mod job;
pub mod registry;
pub mod shell;
pub mod trace;
pub mod util;

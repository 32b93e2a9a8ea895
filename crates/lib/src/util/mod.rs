//! Shared utilities.
//!
//! Currently only test helpers: scripted executors and shells for exercising
//! the orchestrator without real backends.

#[cfg(test)]
pub mod testutil;

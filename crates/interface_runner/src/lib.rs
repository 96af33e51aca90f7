//! Arbitration Runner
//!
//! Host-side wiring for the arbitration workflow: configuration, the HTTP
//! gateway adapter, an optional reference catalog, and a single-case run
//! loop that a shutdown signal can cancel.

pub mod config;
pub mod runner;

pub use config::RunnerConfig;
pub use runner::{load_case, load_catalog, run_case, RunReport};

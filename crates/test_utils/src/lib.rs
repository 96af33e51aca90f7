//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! claims arbitration test suite.
//!
//! # Modules
//!
//! - `gateway`: Scripted agent gateway with call log and hold latches
//! - `fixtures`: Pre-built role payloads, inputs and catalogs
//! - `builders`: Builder patterns for test data construction
//! - `assertions`: Custom assertion helpers for case records
//! - `generators`: Property-based test data generators

pub mod gateway;
pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use gateway::*;
pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;

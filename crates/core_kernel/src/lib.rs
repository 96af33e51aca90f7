//! Core Kernel - Foundational types for the claims arbitration system
//!
//! This crate provides the building blocks shared by the domain and adapter crates:
//! - Strongly typed identifiers
//! - The kernel error type
//! - Port infrastructure for swappable adapters (errors, health checks, auth config)

pub mod identifiers;
pub mod error;
pub mod ports;

pub use identifiers::{CaseId, EventId};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, ExternalAuthConfig,
    AdapterHealth, HealthCheckResult, HealthCheckable,
};

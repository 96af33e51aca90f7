//! Infrastructure adapters for the agent gateway port
//!
//! `HttpAgentGateway` reaches the role functions (builder, insurance
//! reviewer, judge, doctor appeal, insurance counter) over HTTP. The domain
//! only sees it through `domain_arbitration::AgentGateway`.

pub mod config;
pub mod http;

pub use config::{EndpointPaths, GatewayConfig};
pub use http::{decode_envelope, map_status, HttpAgentGateway};

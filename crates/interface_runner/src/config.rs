//! Runner configuration

use serde::Deserialize;

use core_kernel::ExternalAuthConfig;
use domain_arbitration::WorkflowConfig;
use infra_gateway::GatewayConfig;

/// Runner configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Base URL of the role functions
    pub gateway_url: String,
    /// Bearer token for the role functions
    pub gateway_token: Option<String>,
    /// HTTP client timeout in seconds
    pub request_timeout_secs: u64,
    /// Per-call bound enforced by the controller; 0 disables it
    pub call_timeout_ms: u64,
    pub event_buffer: usize,
    /// Optional JSON file with `patients` and `procedures` to validate against
    pub catalog_path: Option<String>,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let gateway = GatewayConfig::default();
        let workflow = WorkflowConfig::default();
        Self {
            gateway_url: gateway.base_url,
            gateway_token: None,
            request_timeout_secs: gateway.request_timeout_secs,
            call_timeout_ms: workflow.call_timeout_ms.unwrap_or(0),
            event_buffer: workflow.event_buffer,
            catalog_path: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl RunnerConfig {
    /// Loads configuration from `ARBITRATION_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("ARBITRATION"))
            .build()?
            .try_deserialize()
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        let auth = match &self.gateway_token {
            Some(token) if !token.is_empty() => ExternalAuthConfig::BearerToken {
                token: token.clone(),
            },
            _ => ExternalAuthConfig::None,
        };
        GatewayConfig {
            base_url: self.gateway_url.clone(),
            auth,
            request_timeout_secs: self.request_timeout_secs,
            ..Default::default()
        }
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            call_timeout_ms: Some(self.call_timeout_ms),
            event_buffer: self.event_buffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_follow_component_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.gateway_config().base_url, GatewayConfig::default().base_url);
        assert_eq!(
            config.workflow_config().call_timeout(),
            Some(Duration::from_secs(120))
        );
        assert!(matches!(config.gateway_config().auth, ExternalAuthConfig::None));
    }

    #[test]
    fn test_token_becomes_bearer_auth() {
        let config = RunnerConfig {
            gateway_token: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.gateway_config().auth,
            ExternalAuthConfig::BearerToken { ref token } if token == "abc"
        ));
    }

    #[test]
    fn test_zero_call_timeout_disables_bound() {
        let config = RunnerConfig {
            call_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.workflow_config().call_timeout(), None);
    }
}

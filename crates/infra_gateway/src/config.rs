//! Gateway adapter configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use core_kernel::{CoreError, ExternalAuthConfig};
use domain_arbitration::AgentRole;

/// Endpoint path of each role function, relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub builder: String,
    pub insurance_reviewer: String,
    pub judge: String,
    pub doctor_appeal: String,
    pub insurance_counter: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            builder: "builder_agent".to_string(),
            insurance_reviewer: "insurance_agent_with_policy".to_string(),
            judge: "ai_judge_decision".to_string(),
            doctor_appeal: "doctor_appeal_generator".to_string(),
            insurance_counter: "insurance_counter_appeal".to_string(),
        }
    }
}

impl EndpointPaths {
    pub fn path_for(&self, role: AgentRole) -> &str {
        match role {
            AgentRole::Builder => &self.builder,
            AgentRole::InsuranceReviewer => &self.insurance_reviewer,
            AgentRole::Judge => &self.judge,
            AgentRole::DoctorAppeal => &self.doctor_appeal,
            AgentRole::InsuranceCounter => &self.insurance_counter,
        }
    }
}

/// Configuration for the HTTP agent gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL the role endpoints hang off (e.g., "https://agents.example.com/api")
    pub base_url: String,

    /// Credentials sent with every request
    pub auth: ExternalAuthConfig,

    /// Client-side request timeout in seconds
    pub request_timeout_secs: u64,

    pub endpoints: EndpointPaths,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            auth: ExternalAuthConfig::None,
            request_timeout_secs: 120,
            endpoints: EndpointPaths::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_auth(mut self, auth: ExternalAuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Full URL of a role endpoint
    pub fn endpoint_url(&self, role: AgentRole) -> String {
        self.url_for(self.endpoints.path_for(role))
    }

    pub fn health_url(&self) -> String {
        self.url_for("health")
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Checks the configuration is usable
    pub fn validate(&self) -> Result<(), CoreError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(CoreError::configuration("gateway base_url is empty"));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(CoreError::configuration(format!(
                "gateway base_url '{}' must start with http:// or https://",
                base
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::configuration("gateway request_timeout_secs must be positive"));
        }
        for role in AgentRole::ALL {
            if self.endpoints.path_for(role).trim().is_empty() {
                return Err(CoreError::configuration(format!(
                    "no endpoint path configured for {}",
                    role
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let config = GatewayConfig::new("https://agents.example.com/api/");
        assert_eq!(
            config.endpoint_url(AgentRole::Judge),
            "https://agents.example.com/api/ai_judge_decision"
        );
        assert_eq!(
            config.endpoint_url(AgentRole::InsuranceReviewer),
            "https://agents.example.com/api/insurance_agent_with_policy"
        );
        assert_eq!(config.health_url(), "https://agents.example.com/api/health");
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        assert!(GatewayConfig::new("").validate().is_err());
        assert!(GatewayConfig::new("agents.example.com").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_endpoint() {
        let mut config = GatewayConfig::default();
        config.endpoints.doctor_appeal = " ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("doctor_appeal"));
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{"base_url":"http://agents:9000","endpoints":{"judge":"judge_v2"}}"#,
        )
        .unwrap();
        assert_eq!(config.endpoint_url(AgentRole::Judge), "http://agents:9000/judge_v2");
        assert_eq!(config.endpoints.builder, "builder_agent");
        assert!(matches!(config.auth, ExternalAuthConfig::None));
    }
}

//! HTTP Agent Gateway
//!
//! Calls each role function as a JSON POST against `{base_url}/{endpoint}`.
//! The adapter is a plain request/response translator: it never retries and
//! never caches, and every failure is returned as a `PortError`.
//!
//! # Response envelope
//!
//! A 2xx body is decoded as follows:
//!
//! - `{"result": "<text>"}` yields the text
//! - `{"result": <json>}` yields the JSON re-serialised
//! - a bare JSON string yields the string
//! - anything else is passed through unchanged, so that the workflow can
//!   decide what an unstructured payload means
//!
//! # Error Handling
//!
//! HTTP status codes are mapped to `PortError` variants:
//! - 404 -> `PortError::NotFound`
//! - 401/403 -> `PortError::Unauthorized`
//! - 429 -> `PortError::RateLimited`
//! - 5xx -> `PortError::ServiceUnavailable`
//! - Timeouts -> `PortError::Timeout`
//! - Other -> `PortError::Internal`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::RETRY_AFTER;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use core_kernel::{
    AdapterHealth, CoreError, DomainPort, ExternalAuthConfig, HealthCheckResult, HealthCheckable,
    PortError,
};
use domain_arbitration::{AgentGateway, AgentRole};

use crate::config::GatewayConfig;

const ADAPTER_ID: &str = "http-agent-gateway";

/// Retry-After fallback when a 429 carries no usable header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Longest response excerpt quoted in an error message
const BODY_EXCERPT_CHARS: usize = 200;

/// Agent gateway backed by remote HTTP role functions
///
/// # Example
///
/// ```rust,ignore
/// use infra_gateway::{GatewayConfig, HttpAgentGateway};
///
/// let gateway = HttpAgentGateway::new(GatewayConfig::new("https://agents.example.com/api"))?;
/// let claim = gateway.build_claim("P001", "70553", "Persistent headaches").await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpAgentGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpAgentGateway {
    /// Creates the adapter, validating the configuration
    pub fn new(config: GatewayConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CoreError::configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn call(&self, role: AgentRole, body: Value) -> Result<String, PortError> {
        let url = self.config.endpoint_url(role);
        let started = Instant::now();
        debug!(role = %role, url = %url, "POST role function");

        let request = apply_auth(self.client.post(&url).json(&body), &self.config.auth);
        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(e, role.operation(), self.config.request_timeout()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, role.operation(), self.config.request_timeout()))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if !status.is_success() {
            warn!(role = %role, status = status.as_u16(), elapsed_ms, "Role function returned an error status");
            return Err(map_status(status, role.operation(), retry_after, &text));
        }

        debug!(role = %role, status = status.as_u16(), elapsed_ms, bytes = text.len(), "Role function answered");
        Ok(decode_envelope(&text))
    }
}

/// Attaches the configured credentials to a request
fn apply_auth(request: RequestBuilder, auth: &ExternalAuthConfig) -> RequestBuilder {
    match auth {
        ExternalAuthConfig::None => request,
        ExternalAuthConfig::ApiKey { header_name, key } => request.header(header_name.as_str(), key.as_str()),
        ExternalAuthConfig::BearerToken { token } => request.bearer_auth(token),
        ExternalAuthConfig::Basic { username, password } => {
            request.basic_auth(username, Some(password))
        }
    }
}

/// Extracts the role payload from a successful response body
pub fn decode_envelope(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut map)) => match map.remove("result") {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Ok(Value::String(text)) => text,
        _ => body.to_string(),
    }
}

/// Maps a non-success status to a port error
pub fn map_status(
    status: StatusCode,
    operation: &str,
    retry_after_secs: Option<u64>,
    body: &str,
) -> PortError {
    match status {
        StatusCode::NOT_FOUND => PortError::not_found("endpoint", operation),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized {
            message: format!("{} rejected credentials ({})", operation, status),
        },
        StatusCode::TOO_MANY_REQUESTS => PortError::RateLimited {
            retry_after_secs: retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        s if s.is_server_error() => PortError::ServiceUnavailable {
            service: format!("{} ({})", operation, status),
        },
        _ => PortError::internal(format!(
            "{} returned {}: {}",
            operation,
            status,
            excerpt(body)
        )),
    }
}

fn map_transport_error(err: reqwest::Error, operation: &str, timeout: Duration) -> PortError {
    if err.is_timeout() {
        PortError::timeout(operation, timeout)
    } else if err.is_connect() {
        PortError::Connection {
            message: format!("{} unreachable", operation),
            source: Some(Box::new(err)),
        }
    } else if err.is_decode() || err.is_body() {
        PortError::transformation(format!("{} response unreadable: {}", operation, err))
    } else {
        PortError::Internal {
            message: format!("{} request failed", operation),
            source: Some(Box::new(err)),
        }
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{}...", cut)
    }
}

impl DomainPort for HttpAgentGateway {}

#[async_trait]
impl AgentGateway for HttpAgentGateway {
    async fn build_claim(
        &self,
        patient_id: &str,
        procedure_code: &str,
        clinical_notes: &str,
    ) -> Result<String, PortError> {
        self.call(
            AgentRole::Builder,
            json!({
                "patient_id": patient_id,
                "procedure_code": procedure_code,
                "clinical_notes": clinical_notes,
            }),
        )
        .await
    }

    async fn review_claim(&self, claim: &str, procedure_code: &str) -> Result<String, PortError> {
        self.call(
            AgentRole::InsuranceReviewer,
            json!({
                "claim_json": claim,
                "procedure_code": procedure_code,
            }),
        )
        .await
    }

    async fn judge(
        &self,
        claim: &str,
        insurance_case: &str,
        patient_id: &str,
        procedure_code: &str,
    ) -> Result<String, PortError> {
        self.call(
            AgentRole::Judge,
            json!({
                "claim_json": claim,
                "insurance_case_json": insurance_case,
                "patient_id": patient_id,
                "procedure_code": procedure_code,
            }),
        )
        .await
    }

    async fn doctor_appeal(
        &self,
        claim: &str,
        insurance_case: &str,
        judge_decision: &str,
        round: u8,
    ) -> Result<String, PortError> {
        self.call(
            AgentRole::DoctorAppeal,
            json!({
                "claim_json": claim,
                "insurance_case_json": insurance_case,
                "judge_decision_json": judge_decision,
                "round": round,
            }),
        )
        .await
    }

    async fn insurance_counter(
        &self,
        doctor_appeal: &str,
        insurance_case: &str,
        round: u8,
    ) -> Result<String, PortError> {
        self.call(
            AgentRole::InsuranceCounter,
            json!({
                "doctor_appeal_json": doctor_appeal,
                "insurance_case_json": insurance_case,
                "round": round,
            }),
        )
        .await
    }
}

#[async_trait]
impl HealthCheckable for HttpAgentGateway {
    /// Calls `{base_url}/health`
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = apply_auth(self.client.get(self.config.health_url()), &self.config.auth)
            .send()
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(response) if response.status().is_success() => (AdapterHealth::Healthy, None),
            Ok(response) => (
                AdapterHealth::Degraded,
                Some(format!("health endpoint returned {}", response.status())),
            ),
            Err(e) => (AdapterHealth::Unhealthy, Some(e.to_string())),
        };

        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_result_string() {
        assert_eq!(
            decode_envelope(r#"{"result":"{\"final_decision\":\"DENIED\"}"}"#),
            r#"{"final_decision":"DENIED"}"#
        );
    }

    #[test]
    fn test_decode_result_object() {
        let text = decode_envelope(r#"{"result":{"final_decision":"APPROVED"}}"#);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["final_decision"], "APPROVED");
    }

    #[test]
    fn test_decode_bare_string_and_passthrough() {
        assert_eq!(decode_envelope(r#""plain answer""#), "plain answer");
        assert_eq!(decode_envelope("not json at all"), "not json at all");
        assert_eq!(
            decode_envelope(r#"{"final_decision":"APPROVED"}"#),
            r#"{"final_decision":"APPROVED"}"#
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND, "judge", None, ""),
            PortError::NotFound { .. }
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, "judge", None, ""),
            PortError::Unauthorized { .. }
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, "judge", Some(7), ""),
            PortError::RateLimited { retry_after_secs: 7 }
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, "judge", None, ""),
            PortError::RateLimited { retry_after_secs: DEFAULT_RETRY_AFTER_SECS }
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, "judge", None, ""),
            PortError::ServiceUnavailable { .. }
        ));
        let other = map_status(StatusCode::BAD_REQUEST, "judge", None, "missing claim_json");
        assert!(matches!(other, PortError::Internal { .. }));
        assert!(other.to_string().contains("missing claim_json"));
    }

    #[test]
    fn test_excerpt_truncates_long_bodies() {
        let long = "x".repeat(BODY_EXCERPT_CHARS + 50);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), BODY_EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(HttpAgentGateway::new(GatewayConfig::new("ftp://agents")).is_err());
    }
}

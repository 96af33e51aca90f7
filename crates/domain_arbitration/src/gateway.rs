//! Agent Gateway port
//!
//! Uniform call interface to the external role functions. Implementations
//! are stateless request/response adapters: no retries, no caching, and any
//! failure is returned immediately as a `PortError`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_arbitration::{AgentGateway, WorkflowController, WorkflowConfig};
//! use std::sync::Arc;
//!
//! let gateway: Arc<dyn AgentGateway> = Arc::new(HttpAgentGateway::new(config)?);
//! let controller = WorkflowController::new(gateway, WorkflowConfig::default());
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, PortError};

/// The external role behind a gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Builder,
    InsuranceReviewer,
    Judge,
    DoctorAppeal,
    InsuranceCounter,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        AgentRole::Builder,
        AgentRole::InsuranceReviewer,
        AgentRole::Judge,
        AgentRole::DoctorAppeal,
        AgentRole::InsuranceCounter,
    ];

    /// Gateway operation name, used in logs and timeout errors
    pub fn operation(self) -> &'static str {
        match self {
            AgentRole::Builder => "build_claim",
            AgentRole::InsuranceReviewer => "review_claim",
            AgentRole::Judge => "judge",
            AgentRole::DoctorAppeal => "doctor_appeal",
            AgentRole::InsuranceCounter => "insurance_counter",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Builder => "builder",
            AgentRole::InsuranceReviewer => "insurance_reviewer",
            AgentRole::Judge => "judge",
            AgentRole::DoctorAppeal => "doctor_appeal",
            AgentRole::InsuranceCounter => "insurance_counter",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port to the role functions of the arbitration process.
///
/// Each method returns the role's raw textual payload (normally JSON).
/// From the controller's perspective every call is a pure function of its
/// arguments.
#[async_trait]
pub trait AgentGateway: DomainPort {
    /// Builder role: drafts the claim from the case inputs
    async fn build_claim(
        &self,
        patient_id: &str,
        procedure_code: &str,
        clinical_notes: &str,
    ) -> Result<String, PortError>;

    /// Insurance reviewer role: builds the insurer's case against the claim
    async fn review_claim(&self, claim: &str, procedure_code: &str) -> Result<String, PortError>;

    /// Judge role: rules on the claim given both sides
    async fn judge(
        &self,
        claim: &str,
        insurance_case: &str,
        patient_id: &str,
        procedure_code: &str,
    ) -> Result<String, PortError>;

    /// Doctor side of an appeal round
    async fn doctor_appeal(
        &self,
        claim: &str,
        insurance_case: &str,
        judge_decision: &str,
        round: u8,
    ) -> Result<String, PortError>;

    /// Insurer side of an appeal round
    async fn insurance_counter(
        &self,
        doctor_appeal: &str,
        insurance_case: &str,
        round: u8,
    ) -> Result<String, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_are_distinct() {
        let mut ops: Vec<_> = AgentRole::ALL.iter().map(|r| r.operation()).collect();
        ops.sort_unstable();
        ops.dedup();
        assert_eq!(ops.len(), AgentRole::ALL.len());
    }

    #[test]
    fn test_role_serde_matches_display() {
        for role in AgentRole::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role));
        }
    }
}

//! Arbitration domain errors

use thiserror::Error;

use core_kernel::PortError;

use crate::gateway::AgentRole;
use crate::stage::WorkflowStage;

/// A role call through the agent gateway failed or timed out
#[derive(Debug, Error)]
#[error("{role} call failed: {source}")]
pub struct GatewayError {
    pub role: AgentRole,
    #[source]
    pub source: PortError,
}

impl GatewayError {
    pub fn new(role: AgentRole, source: PortError) -> Self {
        Self { role, source }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.source, PortError::Timeout { .. })
    }
}

/// Errors surfaced by the workflow controller
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Case inputs were missing or malformed; nothing changed
    #[error("Invalid case inputs: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A builder, reviewer or judge call failed; the case is now FAILED
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The judge answered but its payload is not a usable decision;
    /// the case halts at JUDGING with the raw text kept on the record
    #[error("Judge decision could not be parsed: {reason}")]
    DecisionUnparseable {
        reason: String,
        raw: String,
    },

    /// A stage was advanced without its preconditions
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Workflow is in stage {stage}; reset before starting a new case")]
    StageConflict {
        stage: WorkflowStage,
    },

    /// The run was cancelled by a reset; late results were discarded
    #[error("Run superseded by reset (generation {generation})")]
    Superseded {
        generation: u64,
    },

    #[error("Reference catalog unavailable: {0}")]
    Catalog(#[source] PortError),
}

impl WorkflowError {
    pub fn invariant(message: impl Into<String>) -> Self {
        WorkflowError::InvariantViolation(message.into())
    }

    /// Returns true if the case record was left untouched by this error
    pub fn left_state_unchanged(&self) -> bool {
        matches!(
            self,
            WorkflowError::Validation(_)
                | WorkflowError::StageConflict { .. }
                | WorkflowError::Catalog(_)
        )
    }
}

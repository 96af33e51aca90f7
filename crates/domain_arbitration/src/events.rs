//! Workflow events
//!
//! The controller emits one event after each committed mutation of the case
//! record. A status display subscribes, and on each event reads a fresh
//! snapshot. Events are notifications, not a source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CaseId, EventId};

use crate::appeal::AppealKind;
use crate::payload::Verdict;
use crate::stage::WorkflowStage;

/// What changed on the case record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEventKind {
    /// The case moved between stages
    StageChanged {
        from: WorkflowStage,
        to: WorkflowStage,
    },

    /// Builder output stored
    ClaimGenerated {
        structured: bool,
    },

    /// Reviewer output stored
    InsuranceCaseRecorded {
        structured: bool,
        strength_score: Option<f64>,
    },

    /// Judge output parsed and stored
    DecisionRecorded {
        verdict: Verdict,
        confidence_score: Option<f64>,
    },

    /// Judge output kept raw; the case halts at JUDGING
    DecisionUnparseable {
        reason: String,
    },

    /// A doctor appeal or insurer counter was appended
    AppealRecorded {
        round: u8,
        kind: AppealKind,
        structured: bool,
    },

    /// The appeals exchange stopped early
    AppealsHalted {
        round: u8,
        kind: AppealKind,
        reason: String,
    },

    /// A stage failed and the case is now FAILED
    StageFailed {
        stage: WorkflowStage,
        message: String,
    },

    /// The record was cleared back to AWAITING_INPUT
    Reset,
}

/// Event envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub id: EventId,
    pub case_id: Option<CaseId>,
    /// Record generation the mutation belongs to
    pub generation: u64,
    pub kind: WorkflowEventKind,
    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent {
    pub fn new(case_id: Option<CaseId>, generation: u64, kind: WorkflowEventKind) -> Self {
        Self {
            id: EventId::new_v7(),
            case_id,
            generation,
            kind,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_is_tagged() {
        let kind = WorkflowEventKind::StageChanged {
            from: WorkflowStage::Judging,
            to: WorkflowStage::Appealing,
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["event"], "stage_changed");
        assert_eq!(json["to"], "APPEALING");
    }
}

//! Workflow stages

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a case in the arbitration state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    /// Waiting for patient, procedure and clinical notes
    #[default]
    AwaitingInput,
    /// Builder role is generating the claim
    Building,
    /// Insurance reviewer is building its case
    Reviewing,
    /// Judge is deciding, or its payload could not be parsed
    Judging,
    /// Doctor and insurer are exchanging appeals on a denial
    Appealing,
    /// Terminal: a verdict stands
    Resolved,
    /// Terminal: a role call failed before a verdict was reached
    Failed,
}

impl WorkflowStage {
    /// Returns true for stages no transition other than reset leaves
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStage::Resolved | WorkflowStage::Failed)
    }

    /// Checks if transition is valid
    ///
    /// Reset back to `AwaitingInput` is always allowed.
    pub fn can_transition_to(self, target: WorkflowStage) -> bool {
        use WorkflowStage::*;
        matches!(
            (self, target),
            (AwaitingInput, Building) |
            (Building, Reviewing) |
            (Reviewing, Judging) |
            (Judging, Appealing) |
            (Judging, Resolved) |
            (Appealing, Resolved) |
            (Building, Failed) |
            (Reviewing, Failed) |
            (Judging, Failed) |
            (Appealing, Failed) |
            (_, AwaitingInput)
        )
    }

    /// Progress step on the eight-step provider workflow
    /// (Patient, Procedure, Notes, Claim Gen, Insurance, Judge, Appeals, Final).
    ///
    /// `Failed` has no step of its own; callers use the stage that failed.
    pub fn step_number(self) -> u8 {
        match self {
            WorkflowStage::AwaitingInput => 1,
            WorkflowStage::Building => 3,
            WorkflowStage::Reviewing => 4,
            WorkflowStage::Judging => 5,
            WorkflowStage::Appealing => 7,
            WorkflowStage::Resolved => 8,
            WorkflowStage::Failed => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::AwaitingInput => "AWAITING_INPUT",
            WorkflowStage::Building => "BUILDING",
            WorkflowStage::Reviewing => "REVIEWING",
            WorkflowStage::Judging => "JUDGING",
            WorkflowStage::Appealing => "APPEALING",
            WorkflowStage::Resolved => "RESOLVED",
            WorkflowStage::Failed => "FAILED",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

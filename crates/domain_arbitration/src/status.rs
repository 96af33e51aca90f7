//! Case status summary
//!
//! Dashboard view derived from a case record. Pure: nothing here mutates the
//! record or talks to a port.

use serde::Serialize;

use crate::appeal::MAX_APPEAL_ROUNDS;
use crate::case::CaseRecord;
use crate::payload::Verdict;
use crate::stage::WorkflowStage;

/// Whether the builder has produced a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Generated,
    Pending,
}

/// Whether the insurer has presented its case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Analyzed,
    Pending,
}

/// Summary of a case for a status display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseSummary {
    pub stage: WorkflowStage,
    /// Step 1..=8 of the provider workflow
    pub step: u8,
    pub claim_status: ClaimStatus,
    pub review_status: ReviewStatus,
    /// `"Round n/3"`, counting completed rounds
    pub appeals_progress: String,
    pub strength_score: Option<f64>,
    pub issues_found: usize,
    pub policy_citations: usize,
    pub final_decision: Option<Verdict>,
    /// Stage the case failed in, if it failed
    pub failed_stage: Option<WorkflowStage>,
}

impl CaseSummary {
    pub fn from_record(record: &CaseRecord) -> Self {
        let stage = record.current_stage();
        let failed_stage = record.failure().map(|f| f.stage);

        let step = match stage {
            WorkflowStage::AwaitingInput => input_step(record),
            WorkflowStage::Failed => failed_stage.map_or(1, |s| s.step_number()),
            other => other.step_number(),
        };

        let claim_status = if record.generated_claim().is_some() {
            ClaimStatus::Generated
        } else {
            ClaimStatus::Pending
        };

        let case = record.insurance_case();
        let review_status = if case.is_some() {
            ReviewStatus::Analyzed
        } else {
            ReviewStatus::Pending
        };

        Self {
            stage,
            step,
            claim_status,
            review_status,
            appeals_progress: format!("Round {}/{}", record.appeal_round(), MAX_APPEAL_ROUNDS),
            strength_score: case.and_then(|c| c.strength_score),
            issues_found: case.map_or(0, |c| c.denial_reasons.len()),
            policy_citations: case.map_or(0, |c| c.policy_citations.len()),
            final_decision: record.final_decision(),
            failed_stage,
        }
    }
}

/// Patient, procedure and notes are steps 1 to 3
fn input_step(record: &CaseRecord) -> u8 {
    if record.patient_id().trim().is_empty() {
        1
    } else if record.procedure_code().trim().is_empty() {
        2
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::CaseInputs;
    use crate::payload::{GeneratedClaim, InsuranceCase};

    #[test]
    fn test_empty_record_starts_at_patient_step() {
        let summary = CaseSummary::from_record(&CaseRecord::default());
        assert_eq!(summary.step, 1);
        assert_eq!(summary.claim_status, ClaimStatus::Pending);
        assert_eq!(summary.review_status, ReviewStatus::Pending);
        assert_eq!(summary.appeals_progress, "Round 0/3");
        assert!(summary.final_decision.is_none());
    }

    #[test]
    fn test_input_steps_follow_what_is_filled_in() {
        let record = CaseRecord::create(CaseInputs::new("P001", "", ""));
        assert_eq!(CaseSummary::from_record(&record).step, 2);

        let record = CaseRecord::create(CaseInputs::new("P001", "70553", ""));
        assert_eq!(CaseSummary::from_record(&record).step, 3);
    }

    #[test]
    fn test_insurer_case_counts() {
        let mut record = CaseRecord::create(CaseInputs::new("P001", "70553", "notes"));
        record.advance(WorkflowStage::Building).unwrap();
        record.set_generated_claim(GeneratedClaim::from_payload("{}")).unwrap();
        record.advance(WorkflowStage::Reviewing).unwrap();
        let (case, _) = InsuranceCase::from_payload(
            r#"{"strength_score":0.72,"denial_reasons":["a","b"],"policy_citations":["P-1"]}"#,
        );
        record.set_insurance_case(case).unwrap();
        record.advance(WorkflowStage::Judging).unwrap();

        let summary = CaseSummary::from_record(&record);
        assert_eq!(summary.step, 5);
        assert_eq!(summary.claim_status, ClaimStatus::Generated);
        assert_eq!(summary.review_status, ReviewStatus::Analyzed);
        assert_eq!(summary.strength_score, Some(0.72));
        assert_eq!(summary.issues_found, 2);
        assert_eq!(summary.policy_citations, 1);
    }

    #[test]
    fn test_failed_case_reports_failing_step() {
        let mut record = CaseRecord::create(CaseInputs::new("P001", "70553", "notes"));
        record.advance(WorkflowStage::Building).unwrap();
        record.fail("builder down").unwrap();

        let summary = CaseSummary::from_record(&record);
        assert_eq!(summary.stage, WorkflowStage::Failed);
        assert_eq!(summary.failed_stage, Some(WorkflowStage::Building));
        assert_eq!(summary.step, WorkflowStage::Building.step_number());
    }
}

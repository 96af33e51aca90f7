//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for case records that give
//! more meaningful error messages than standard assertions.

use domain_arbitration::{AppealKind, CaseRecord, WorkflowStage, MAX_APPEAL_ROUNDS};

/// Asserts that the appeal transcript alternates doctor appeal and counter,
/// round by round, within the round bound and consistent with the round counter
///
/// # Panics
///
/// Panics on the first entry that is out of order
pub fn assert_transcript_well_formed(record: &CaseRecord) {
    let history = record.appeal_history();
    for (index, entry) in history.iter().enumerate() {
        let expected_round = (index / 2) as u8 + 1;
        let expected_kind = if index % 2 == 0 {
            AppealKind::DoctorAppeal
        } else {
            AppealKind::InsuranceCounter
        };
        assert_eq!(
            (entry.round, entry.kind),
            (expected_round, expected_kind),
            "Appeal entry {} out of order",
            index
        );
        assert!(
            entry.round <= MAX_APPEAL_ROUNDS,
            "Appeal entry {} is in round {} beyond the bound of {}",
            index,
            entry.round,
            MAX_APPEAL_ROUNDS
        );
    }

    let completed = (history.len() / 2) as u8;
    assert_eq!(
        record.appeal_round(),
        completed,
        "Round counter {} disagrees with {} completed rounds in the transcript",
        record.appeal_round(),
        completed
    );
}

/// Asserts that a case is resolved and the final decision is the judge's verdict
pub fn assert_resolved_with_judge_verdict(record: &CaseRecord) {
    assert_eq!(
        record.current_stage(),
        WorkflowStage::Resolved,
        "Expected RESOLVED, case is in {}",
        record.current_stage()
    );
    let verdict = record
        .judge_decision()
        .map(|d| d.final_decision)
        .unwrap_or_else(|| panic!("Resolved case has no judge decision"));
    assert_eq!(
        record.final_decision(),
        Some(verdict),
        "Final decision differs from the judge's verdict"
    );
}

/// Asserts that a case failed in the given stage
pub fn assert_failed_in(record: &CaseRecord, stage: WorkflowStage) {
    assert_eq!(
        record.current_stage(),
        WorkflowStage::Failed,
        "Expected FAILED, case is in {}",
        record.current_stage()
    );
    let failure = record
        .failure()
        .unwrap_or_else(|| panic!("Failed case has no failure record"));
    assert_eq!(failure.stage, stage, "Case failed in the wrong stage");
    assert!(record.final_decision().is_none(), "Failed case has a final decision");
}

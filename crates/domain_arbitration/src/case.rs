//! Case Record
//!
//! The single mutable record of one claim's journey through the workflow.
//! Mutators are crate-private: only the controller drives a record, and each
//! mutator checks the precondition of its own step before touching anything,
//! so a rejected step leaves the record exactly as it was.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::appeal::{AppealEntry, AppealKind, MAX_APPEAL_ROUNDS};
use crate::error::WorkflowError;
use crate::payload::{GeneratedClaim, InsuranceCase, JudgeDecision, Verdict};
use crate::stage::WorkflowStage;

/// Inputs a case is opened with; immutable once the case starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CaseInputs {
    #[validate(length(min = 1))]
    pub patient_id: String,
    #[validate(length(min = 1))]
    pub procedure_code: String,
    #[validate(length(min = 1))]
    pub clinical_notes: String,
}

impl CaseInputs {
    pub fn new(
        patient_id: impl Into<String>,
        procedure_code: impl Into<String>,
        clinical_notes: impl Into<String>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            procedure_code: procedure_code.into(),
            clinical_notes: clinical_notes.into(),
        }
    }

    /// Checks the inputs, returning every problem found
    pub fn check(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if let Err(errors) = self.validate() {
            for (field, field_errors) in errors.field_errors() {
                for error in field_errors {
                    problems.push(format!("{} is invalid ({})", field, error.code));
                }
            }
        }

        // Whitespace passes the length rules but is still no input
        for (field, value) in [
            ("patient_id", &self.patient_id),
            ("procedure_code", &self.procedure_code),
            ("clinical_notes", &self.clinical_notes),
        ] {
            if !value.is_empty() && value.trim().is_empty() {
                problems.push(format!("{} must not be blank", field));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            problems.sort();
            Err(problems)
        }
    }
}

/// Where and why a case failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: WorkflowStage,
    pub message: String,
}

/// The case record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    inputs: CaseInputs,
    current_stage: WorkflowStage,
    generated_claim: Option<GeneratedClaim>,
    insurance_case: Option<InsuranceCase>,
    /// Judge text as received, kept even when it does not parse
    judge_payload: Option<String>,
    judge_decision: Option<JudgeDecision>,
    /// Completed appeal rounds
    appeal_round: u8,
    appeal_history: Vec<AppealEntry>,
    final_decision: Option<Verdict>,
    failure: Option<StageFailure>,
}

impl CaseRecord {
    /// Creates a record holding only the inputs, awaiting start
    pub fn create(inputs: CaseInputs) -> Self {
        Self {
            inputs,
            ..Default::default()
        }
    }

    /// Clears every derived field and returns to `AwaitingInput`.
    ///
    /// The inputs are kept, so the result equals `CaseRecord::create` for
    /// the same inputs.
    pub fn reset(&mut self) {
        let inputs = std::mem::take(&mut self.inputs);
        *self = Self::create(inputs);
    }

    pub fn inputs(&self) -> &CaseInputs {
        &self.inputs
    }

    pub fn patient_id(&self) -> &str {
        &self.inputs.patient_id
    }

    pub fn procedure_code(&self) -> &str {
        &self.inputs.procedure_code
    }

    pub fn clinical_notes(&self) -> &str {
        &self.inputs.clinical_notes
    }

    pub fn current_stage(&self) -> WorkflowStage {
        self.current_stage
    }

    pub fn generated_claim(&self) -> Option<&GeneratedClaim> {
        self.generated_claim.as_ref()
    }

    pub fn insurance_case(&self) -> Option<&InsuranceCase> {
        self.insurance_case.as_ref()
    }

    pub fn judge_payload(&self) -> Option<&str> {
        self.judge_payload.as_deref()
    }

    pub fn judge_decision(&self) -> Option<&JudgeDecision> {
        self.judge_decision.as_ref()
    }

    pub fn appeal_round(&self) -> u8 {
        self.appeal_round
    }

    pub fn appeal_history(&self) -> &[AppealEntry] {
        &self.appeal_history
    }

    pub fn final_decision(&self) -> Option<Verdict> {
        self.final_decision
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        self.failure.as_ref()
    }

    /// Moves to `target` if the stage machine allows it
    pub(crate) fn advance(&mut self, target: WorkflowStage) -> Result<(), WorkflowError> {
        if !self.current_stage.can_transition_to(target) {
            return Err(WorkflowError::invariant(format!(
                "invalid stage transition from {} to {}",
                self.current_stage, target
            )));
        }
        self.current_stage = target;
        Ok(())
    }

    pub(crate) fn set_generated_claim(&mut self, claim: GeneratedClaim) -> Result<(), WorkflowError> {
        self.expect_stage(WorkflowStage::Building)?;
        if self.generated_claim.is_some() {
            return Err(WorkflowError::invariant("generated claim is already set"));
        }
        self.generated_claim = Some(claim);
        Ok(())
    }

    pub(crate) fn set_insurance_case(&mut self, case: InsuranceCase) -> Result<(), WorkflowError> {
        self.expect_stage(WorkflowStage::Reviewing)?;
        if self.generated_claim.is_none() {
            return Err(WorkflowError::invariant(
                "insurance case recorded before the claim was generated",
            ));
        }
        self.insurance_case = Some(case);
        Ok(())
    }

    pub(crate) fn set_judge_payload(&mut self, raw: String) -> Result<(), WorkflowError> {
        self.expect_stage(WorkflowStage::Judging)?;
        if self.insurance_case.is_none() {
            return Err(WorkflowError::invariant(
                "judge consulted before the insurance case was recorded",
            ));
        }
        self.judge_payload = Some(raw);
        Ok(())
    }

    pub(crate) fn set_judge_decision(&mut self, decision: JudgeDecision) -> Result<(), WorkflowError> {
        self.expect_stage(WorkflowStage::Judging)?;
        if self.judge_payload.is_none() {
            return Err(WorkflowError::invariant("judge decision without a judge payload"));
        }
        if self.judge_decision.is_some() {
            return Err(WorkflowError::invariant("judge decision is already set"));
        }
        self.judge_decision = Some(decision);
        Ok(())
    }

    /// Appends to the appeal transcript.
    ///
    /// Round `n` is always a doctor appeal followed by its counter; the
    /// counter completes the round.
    pub(crate) fn push_appeal(&mut self, entry: AppealEntry) -> Result<(), WorkflowError> {
        self.expect_stage(WorkflowStage::Appealing)?;
        if self.judge_verdict() != Some(Verdict::Denied) {
            return Err(WorkflowError::invariant("appeals are only heard on a denial"));
        }

        let round = self.appeal_round + 1;
        if entry.round != round || round > MAX_APPEAL_ROUNDS {
            return Err(WorkflowError::invariant(format!(
                "appeal entry for round {} while round {} of {} is open",
                entry.round, round, MAX_APPEAL_ROUNDS
            )));
        }

        let doctor_filed = self
            .appeal_history
            .last()
            .is_some_and(|last| last.round == round && last.kind == AppealKind::DoctorAppeal);

        match (entry.kind, doctor_filed) {
            (AppealKind::DoctorAppeal, false) => {
                self.appeal_history.push(entry);
            }
            (AppealKind::InsuranceCounter, true) => {
                self.appeal_history.push(entry);
                self.appeal_round = round;
            }
            (AppealKind::DoctorAppeal, true) => {
                return Err(WorkflowError::invariant(format!(
                    "doctor appeal already filed for round {}",
                    round
                )));
            }
            (AppealKind::InsuranceCounter, false) => {
                return Err(WorkflowError::invariant(format!(
                    "counter-appeal for round {} filed before the doctor appeal",
                    round
                )));
            }
        }
        Ok(())
    }

    /// Fixes the final decision to the judge's verdict and resolves the case
    pub(crate) fn resolve(&mut self) -> Result<Verdict, WorkflowError> {
        let verdict = self
            .judge_verdict()
            .ok_or_else(|| WorkflowError::invariant("cannot resolve without a judge decision"))?;
        if self.current_stage == WorkflowStage::Judging && verdict.is_appealable() {
            return Err(WorkflowError::invariant(
                "a denial must pass through the appeals stage",
            ));
        }
        self.advance(WorkflowStage::Resolved)?;
        self.final_decision = Some(verdict);
        Ok(verdict)
    }

    /// Marks the current stage as failed
    pub(crate) fn fail(&mut self, message: impl Into<String>) -> Result<(), WorkflowError> {
        let stage = self.current_stage;
        self.advance(WorkflowStage::Failed)?;
        self.failure = Some(StageFailure {
            stage,
            message: message.into(),
        });
        Ok(())
    }

    fn judge_verdict(&self) -> Option<Verdict> {
        self.judge_decision.as_ref().map(|d| d.final_decision)
    }

    fn expect_stage(&self, expected: WorkflowStage) -> Result<(), WorkflowError> {
        if self.current_stage != expected {
            return Err(WorkflowError::invariant(format!(
                "expected stage {} but case is in {}",
                expected, self.current_stage
            )));
        }
        Ok(())
    }
}

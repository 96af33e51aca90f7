//! Pre-built Test Fixtures
//!
//! Provides ready-to-use role payloads, case inputs and reference data.
//! These fixtures are designed to be consistent and predictable for unit tests.

use domain_arbitration::{CaseInputs, InMemoryCatalog, PatientProfile, ProcedureInfo};
use serde_json::json;

/// Fixture for role payload texts, shaped like the remote role functions answer
pub struct PayloadFixtures;

impl PayloadFixtures {
    /// Claim drafted by the builder role
    pub fn claim() -> String {
        json!({
            "claim_id": "CLM-2024-0192",
            "patient_id": "P001",
            "procedure_code": "70553",
            "diagnosis": "Chronic migraine with aura, refractory to medication",
            "medical_necessity": "Rule out structural lesion before escalating therapy",
            "amount_requested": 2850.00
        })
        .to_string()
    }

    /// Insurer case with two issues and one citation
    pub fn insurance_case() -> String {
        Self::insurance_case_with_score(0.72)
    }

    pub fn insurance_case_with_score(strength_score: f64) -> String {
        json!({
            "strength_score": strength_score,
            "denial_reasons": [
                "Conservative treatment not documented for six weeks",
                "Prior CT within twelve months"
            ],
            "policy_citations": ["Imaging Policy 4.2"],
            "rebuttal_summary": "Imaging is premature under the plan's step therapy rules"
        })
        .to_string()
    }

    /// Judge payload with the given decision label
    pub fn judge(label: &str) -> String {
        json!({
            "final_decision": label,
            "reasoning": "Weighed the clinical record against the cited policy",
            "confidence_score": 0.81
        })
        .to_string()
    }

    pub fn judge_approved() -> String {
        Self::judge("APPROVED")
    }

    pub fn judge_denied() -> String {
        Self::judge("DENIED")
    }

    /// Judge payload without a `final_decision`
    pub fn judge_missing_decision() -> String {
        json!({ "reasoning": "Insufficient information", "confidence_score": 0.4 }).to_string()
    }

    pub fn doctor_appeal(round: u8) -> String {
        json!({
            "appeal_summary": format!("Round {round}: imaging is medically necessary"),
            "medical_justification": "Neurological signs warrant MRI without delay",
            "additional_evidence": ["Neurology consult note", "Headache diary"]
        })
        .to_string()
    }

    pub fn insurance_counter(round: u8) -> String {
        json!({
            "counter_response": format!("Round {round}: step therapy still applies"),
            "position_change": "MAINTAINED",
            "new_strength_score": 0.68,
            "final_recommendation": "Uphold denial"
        })
        .to_string()
    }

    /// Free text where JSON was expected
    pub fn prose() -> String {
        "I am unable to produce a structured answer for this request.".to_string()
    }
}

/// Fixture for case inputs
pub struct InputFixtures;

impl InputFixtures {
    /// Complete inputs for an MRI case
    pub fn mri_case() -> CaseInputs {
        CaseInputs::new(
            "P001",
            "70553",
            "Persistent headaches for three months with visual aura. \
             Neurological exam shows mild papilledema. MRI brain with and without contrast requested.",
        )
    }

    /// Inputs with every field blank
    pub fn blank() -> CaseInputs {
        CaseInputs::new("", "", "   ")
    }
}

/// Fixture for reference catalog data
pub struct CatalogFixtures;

impl CatalogFixtures {
    pub fn patient(patient_id: &str, display_name: &str) -> PatientProfile {
        PatientProfile {
            patient_id: patient_id.to_string(),
            display_name: display_name.to_string(),
            policy_number: format!("POL-{patient_id}"),
            medical_history_summary: None,
        }
    }

    pub fn procedure(code: &str, name: &str) -> ProcedureInfo {
        ProcedureInfo {
            procedure_code: code.to_string(),
            procedure_name: name.to_string(),
            coverage_notes: None,
        }
    }

    /// Catalog holding the patients and procedures used by the other fixtures
    pub fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_patient(Self::patient("P001", "Jane Doe"))
            .with_patient(Self::patient("P002", "John Smith"))
            .with_procedure(Self::procedure("70553", "MRI brain with and without contrast"))
            .with_procedure(Self::procedure("99213", "Office visit, established patient"))
    }
}

//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use fake::faker::lorem::en::Sentences;
use fake::Fake;

use domain_arbitration::CaseInputs;

/// Builder for constructing case inputs
pub struct CaseInputsBuilder {
    patient_id: String,
    procedure_code: String,
    clinical_notes: String,
}

impl Default for CaseInputsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseInputsBuilder {
    /// Creates a builder with a known patient and procedure and generated notes
    pub fn new() -> Self {
        let sentences: Vec<String> = Sentences(2..5).fake();
        Self {
            patient_id: "P001".to_string(),
            procedure_code: "70553".to_string(),
            clinical_notes: sentences.join(" "),
        }
    }

    /// Sets the patient ID
    pub fn with_patient_id(mut self, id: impl Into<String>) -> Self {
        self.patient_id = id.into();
        self
    }

    /// Sets the procedure code
    pub fn with_procedure_code(mut self, code: impl Into<String>) -> Self {
        self.procedure_code = code.into();
        self
    }

    /// Sets the clinical notes
    pub fn with_clinical_notes(mut self, notes: impl Into<String>) -> Self {
        self.clinical_notes = notes.into();
        self
    }

    /// Builds the inputs
    pub fn build(self) -> CaseInputs {
        CaseInputs::new(self.patient_id, self.procedure_code, self.clinical_notes)
    }
}

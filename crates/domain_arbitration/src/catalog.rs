//! Reference catalog port
//!
//! Patients and procedures a case may be opened for. The workflow only
//! consults the catalog when a controller is built with one; without it,
//! `start` applies shape checks alone.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, PortError};

/// A member the provider can file a claim for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub patient_id: String,
    pub display_name: String,
    pub policy_number: String,
    pub medical_history_summary: Option<String>,
}

/// A billable procedure and the insurer's coverage notes for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureInfo {
    pub procedure_code: String,
    pub procedure_name: String,
    pub coverage_notes: Option<String>,
}

/// Lookup port for patient and procedure reference data
#[async_trait]
pub trait ReferenceCatalog: DomainPort {
    async fn patient(&self, patient_id: &str) -> Result<Option<PatientProfile>, PortError>;

    async fn procedure(&self, procedure_code: &str) -> Result<Option<ProcedureInfo>, PortError>;
}

/// Catalog held in memory, keyed by id
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    patients: BTreeMap<String, PatientProfile>,
    procedures: BTreeMap<String, ProcedureInfo>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patient(mut self, patient: PatientProfile) -> Self {
        self.patients.insert(patient.patient_id.clone(), patient);
        self
    }

    pub fn with_procedure(mut self, procedure: ProcedureInfo) -> Self {
        self.procedures.insert(procedure.procedure_code.clone(), procedure);
        self
    }
}

impl DomainPort for InMemoryCatalog {}

#[async_trait]
impl ReferenceCatalog for InMemoryCatalog {
    async fn patient(&self, patient_id: &str) -> Result<Option<PatientProfile>, PortError> {
        Ok(self.patients.get(patient_id).cloned())
    }

    async fn procedure(&self, procedure_code: &str) -> Result<Option<ProcedureInfo>, PortError> {
        Ok(self.procedures.get(procedure_code).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn procedure(code: &str) -> ProcedureInfo {
        ProcedureInfo {
            procedure_code: code.to_string(),
            procedure_name: format!("Procedure {code}"),
            coverage_notes: None,
        }
    }

    #[tokio::test]
    async fn test_lookup() {
        let catalog = InMemoryCatalog::new()
            .with_procedure(procedure("99213"))
            .with_procedure(procedure("70553"));

        let found = catalog.procedure("70553").await.unwrap().unwrap();
        assert_eq!(found.procedure_name, "Procedure 70553");
        assert!(catalog.procedure("00000").await.unwrap().is_none());
        assert!(catalog.patient("P001").await.unwrap().is_none());
    }
}

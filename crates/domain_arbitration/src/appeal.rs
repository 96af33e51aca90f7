//! Appeal transcript entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payload::{DoctorAppeal, InsuranceCounter, PayloadError};

/// Upper bound on doctor/insurer appeal rounds for a denied claim
pub const MAX_APPEAL_ROUNDS: u8 = 3;

/// Which side filed an appeal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppealKind {
    DoctorAppeal,
    InsuranceCounter,
}

/// Structured content of an entry, or the reason it could not be structured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppealPayload {
    DoctorAppeal(DoctorAppeal),
    InsuranceCounter(InsuranceCounter),
    Unparsed { reason: String },
}

/// One filing in the appeals exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppealEntry {
    /// Round number, 1-based
    pub round: u8,
    pub kind: AppealKind,
    /// Payload text exactly as returned by the role
    pub raw: String,
    pub payload: AppealPayload,
    pub recorded_at: DateTime<Utc>,
}

impl AppealEntry {
    /// Builds a doctor appeal entry, returning the parse error alongside
    /// when the text had to be kept unparsed
    pub fn doctor(round: u8, raw: impl Into<String>) -> (Self, Option<PayloadError>) {
        let raw = raw.into();
        let (payload, error) = match DoctorAppeal::parse(&raw) {
            Ok(appeal) => (AppealPayload::DoctorAppeal(appeal), None),
            Err(err) => (AppealPayload::Unparsed { reason: err.to_string() }, Some(err)),
        };
        (Self::new(round, AppealKind::DoctorAppeal, raw, payload), error)
    }

    /// Builds an insurance counter-appeal entry
    pub fn counter(round: u8, raw: impl Into<String>) -> (Self, Option<PayloadError>) {
        let raw = raw.into();
        let (payload, error) = match InsuranceCounter::parse(&raw) {
            Ok(counter) => (AppealPayload::InsuranceCounter(counter), None),
            Err(err) => (AppealPayload::Unparsed { reason: err.to_string() }, Some(err)),
        };
        (Self::new(round, AppealKind::InsuranceCounter, raw, payload), error)
    }

    fn new(round: u8, kind: AppealKind, raw: String, payload: AppealPayload) -> Self {
        Self {
            round,
            kind,
            raw,
            payload,
            recorded_at: Utc::now(),
        }
    }

    pub fn is_structured(&self) -> bool {
        !matches!(self.payload, AppealPayload::Unparsed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_entry_structured() {
        let (entry, err) = AppealEntry::doctor(1, r#"{"appeal_summary":"Medically necessary"}"#);
        assert!(err.is_none());
        assert_eq!(entry.round, 1);
        assert_eq!(entry.kind, AppealKind::DoctorAppeal);
        assert!(entry.is_structured());
    }

    #[test]
    fn test_counter_entry_keeps_raw_text() {
        let (entry, err) = AppealEntry::counter(2, "We maintain our position.");
        assert!(matches!(err, Some(PayloadError::NotJson(_))));
        assert_eq!(entry.kind, AppealKind::InsuranceCounter);
        assert_eq!(entry.raw, "We maintain our position.");
        assert!(!entry.is_structured());
    }
}

//! Typed projections of role payloads
//!
//! Every role function answers with text that is expected to hold JSON. The
//! text is decoded into a loose `serde_json::Value` at the boundary and then
//! projected into the typed structures below straight away, so the controller
//! never works with untyped maps.
//!
//! Scores are passed through exactly as received. They are not clamped,
//! rounded, or otherwise reinterpreted.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Why a payload could not be projected into its typed form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    NotJson(String),

    #[error("payload is JSON but not an object")]
    NotAnObject,

    #[error("payload has an unexpected shape: {0}")]
    Shape(String),
}

/// Decodes `raw` as a JSON object and projects it into `T`
fn project<T: DeserializeOwned>(raw: &str) -> Result<T, PayloadError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| PayloadError::NotJson(e.to_string()))?;
    if !value.is_object() {
        return Err(PayloadError::NotAnObject);
    }
    serde_json::from_value(value).map_err(|e| PayloadError::Shape(e.to_string()))
}

/// Decodes `raw` as a JSON object without projecting it
fn object(raw: &str) -> Result<Map<String, Value>, PayloadError> {
    match serde_json::from_str(raw).map_err(|e| PayloadError::NotJson(e.to_string()))? {
        Value::Object(map) => Ok(map),
        _ => Err(PayloadError::NotAnObject),
    }
}

/// Reads one optional key, recording it in `rejected` when it has the wrong type
fn field<T: DeserializeOwned>(
    map: &Map<String, Value>,
    key: &str,
    rejected: &mut Vec<String>,
) -> Option<T> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => match T::deserialize(value) {
            Ok(v) => Some(v),
            Err(e) => {
                rejected.push(format!("{key}: {e}"));
                None
            }
        },
    }
}

/// Claim produced by the builder role
///
/// The claim is opaque to the workflow: it is forwarded verbatim to the
/// reviewer, judge and doctor-appeal roles. The decoded document is kept only
/// for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedClaim {
    pub raw: String,
    pub document: Option<Value>,
}

impl GeneratedClaim {
    pub fn from_payload(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let document = serde_json::from_str::<Value>(&raw).ok();
        Self { raw, document }
    }

    /// Whether the builder returned well-formed JSON
    pub fn is_structured(&self) -> bool {
        self.document.is_some()
    }
}

/// The insurer's case presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceCase {
    /// Payload text as returned by the reviewer role
    pub raw: String,
    /// Whether `raw` is a JSON object; when false the typed fields are empty
    pub structured: bool,
    /// Opaque assessment score, nominally in `[0.0, 1.0]`
    pub strength_score: Option<f64>,
    /// Issues the insurer raises, in the order given
    pub denial_reasons: Vec<String>,
    /// Policy references backing the issues, in the order given
    pub policy_citations: Vec<String>,
    pub rebuttal_summary: Option<String>,
}

impl InsuranceCase {
    /// Projects the reviewer payload key by key.
    ///
    /// A key with the wrong type is left empty without affecting the others.
    /// The returned error lists what was dropped, or why `raw` is not an object.
    pub fn from_payload(raw: impl Into<String>) -> (Self, Option<PayloadError>) {
        let raw = raw.into();
        let map = match object(&raw) {
            Ok(map) => map,
            Err(err) => {
                return (
                    Self {
                        raw,
                        structured: false,
                        strength_score: None,
                        denial_reasons: Vec::new(),
                        policy_citations: Vec::new(),
                        rebuttal_summary: None,
                    },
                    Some(err),
                )
            }
        };

        let mut rejected = Vec::new();
        let case = Self {
            strength_score: field(&map, "strength_score", &mut rejected),
            denial_reasons: field(&map, "denial_reasons", &mut rejected).unwrap_or_default(),
            policy_citations: field(&map, "policy_citations", &mut rejected).unwrap_or_default(),
            rebuttal_summary: field(&map, "rebuttal_summary", &mut rejected),
            structured: true,
            raw,
        };
        let error = (!rejected.is_empty()).then(|| PayloadError::Shape(rejected.join("; ")));
        (case, error)
    }
}

/// Judge verdict classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    Denied,
    /// Any label other than approved or denied
    Unknown,
}

impl Verdict {
    /// Classifies a decision label, ignoring case and surrounding whitespace
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("APPROVED") {
            Verdict::Approved
        } else if label.eq_ignore_ascii_case("DENIED") {
            Verdict::Denied
        } else {
            Verdict::Unknown
        }
    }

    /// Only denials open the appeals exchange
    pub fn is_appealable(self) -> bool {
        self == Verdict::Denied
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Approved => "APPROVED",
            Verdict::Denied => "DENIED",
            Verdict::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed ruling of the judge role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeDecision {
    pub final_decision: Verdict,
    /// The label exactly as the judge wrote it
    pub decision_label: String,
    pub reasoning: Option<String>,
    pub confidence_score: Option<f64>,
}

impl JudgeDecision {
    /// Parses the judge payload.
    ///
    /// A missing or non-string `final_decision` is an error; it is never
    /// defaulted to `UNKNOWN`. `reasoning` and `confidence_score` are read
    /// leniently and dropped with a warning when they have the wrong type.
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        let map = object(raw)?;
        let label = match map.get("final_decision") {
            Some(Value::String(label)) => label.clone(),
            Some(other) => {
                return Err(PayloadError::Shape(format!(
                    "final_decision must be a string, got {other}"
                )))
            }
            None => return Err(PayloadError::Shape("missing field `final_decision`".into())),
        };

        let mut rejected = Vec::new();
        let reasoning = field(&map, "reasoning", &mut rejected);
        let confidence_score = field(&map, "confidence_score", &mut rejected);
        if !rejected.is_empty() {
            warn!(ignored = %rejected.join("; "), "Judge decision fields ignored");
        }

        Ok(Self {
            final_decision: Verdict::from_label(&label),
            decision_label: label,
            reasoning,
            confidence_score,
        })
    }
}

/// Appeal filed by the doctor in one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorAppeal {
    #[serde(default)]
    pub appeal_summary: Option<String>,
    #[serde(default)]
    pub medical_justification: Option<String>,
    #[serde(default)]
    pub additional_evidence: Vec<String>,
}

impl DoctorAppeal {
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        project(raw)
    }
}

/// Insurer's answer to a doctor appeal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceCounter {
    #[serde(default)]
    pub counter_response: Option<String>,
    #[serde(default)]
    pub position_change: Option<String>,
    #[serde(default)]
    pub new_strength_score: Option<f64>,
    #[serde(default)]
    pub final_recommendation: Option<String>,
}

impl InsuranceCounter {
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        project(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_labels_are_case_insensitive() {
        assert_eq!(Verdict::from_label("APPROVED"), Verdict::Approved);
        assert_eq!(Verdict::from_label("approved"), Verdict::Approved);
        assert_eq!(Verdict::from_label(" Denied "), Verdict::Denied);
        assert_eq!(Verdict::from_label("PENDING"), Verdict::Unknown);
        assert_eq!(Verdict::from_label(""), Verdict::Unknown);
    }

    #[test]
    fn test_judge_parse_keeps_scores_verbatim() {
        let decision = JudgeDecision::parse(
            r#"{"final_decision":"approved","reasoning":"Covered","confidence_score":1.7}"#,
        )
        .unwrap();
        assert_eq!(decision.final_decision, Verdict::Approved);
        assert_eq!(decision.decision_label, "approved");
        assert_eq!(decision.reasoning.as_deref(), Some("Covered"));
        assert_eq!(decision.confidence_score, Some(1.7));
    }

    #[test]
    fn test_judge_parse_requires_decision() {
        let err = JudgeDecision::parse(r#"{"reasoning":"no verdict"}"#).unwrap_err();
        assert!(matches!(err, PayloadError::Shape(_)));

        let err = JudgeDecision::parse(r#"{"final_decision":true}"#).unwrap_err();
        assert!(matches!(err, PayloadError::Shape(_)));
    }

    #[test]
    fn test_judge_parse_rejects_text_and_arrays() {
        assert!(matches!(
            JudgeDecision::parse("The claim is APPROVED."),
            Err(PayloadError::NotJson(_))
        ));
        assert_eq!(
            JudgeDecision::parse(r#"["APPROVED"]"#),
            Err(PayloadError::NotAnObject)
        );
    }

    #[test]
    fn test_judge_parse_ignores_badly_typed_optional_fields() {
        let decision = JudgeDecision::parse(
            r#"{"final_decision":"APPROVED","reasoning":"ok","confidence_score":"high"}"#,
        )
        .unwrap();
        assert_eq!(decision.final_decision, Verdict::Approved);
        assert_eq!(decision.reasoning.as_deref(), Some("ok"));
        assert_eq!(decision.confidence_score, None);

        let decision =
            JudgeDecision::parse(r#"{"final_decision":"DENIED","reasoning":["a","b"]}"#).unwrap();
        assert_eq!(decision.final_decision, Verdict::Denied);
        assert!(decision.reasoning.is_none());
    }

    #[test]
    fn test_unrecognised_label_is_unknown_not_error() {
        let decision = JudgeDecision::parse(r#"{"final_decision":"PARTIAL"}"#).unwrap();
        assert_eq!(decision.final_decision, Verdict::Unknown);
        assert_eq!(decision.decision_label, "PARTIAL");
    }

    #[test]
    fn test_insurance_case_projection() {
        let (case, err) = InsuranceCase::from_payload(
            r#"{"strength_score":0.8,"denial_reasons":[],"policy_citations":["P-12"]}"#,
        );
        assert!(err.is_none());
        assert!(case.structured);
        assert_eq!(case.strength_score, Some(0.8));
        assert!(case.denial_reasons.is_empty());
        assert_eq!(case.policy_citations, vec!["P-12".to_string()]);
    }

    #[test]
    fn test_insurance_case_keeps_raw_when_not_an_object() {
        let (case, err) = InsuranceCase::from_payload("Strong case for denial.");
        assert!(matches!(err, Some(PayloadError::NotJson(_))));
        assert!(!case.structured);
        assert_eq!(case.raw, "Strong case for denial.");
    }

    #[test]
    fn test_insurance_case_bad_field_keeps_the_rest() {
        let raw = r#"{"strength_score":"high","denial_reasons":["Not necessary"],"policy_citations":["P-12"]}"#;
        let (case, err) = InsuranceCase::from_payload(raw);
        assert!(matches!(err, Some(PayloadError::Shape(ref m)) if m.contains("strength_score")));
        assert!(case.structured);
        assert_eq!(case.strength_score, None);
        assert_eq!(case.denial_reasons, vec!["Not necessary".to_string()]);
        assert_eq!(case.policy_citations, vec!["P-12".to_string()]);
        assert_eq!(case.raw, raw);
    }

    #[test]
    fn test_generated_claim_structured_flag() {
        assert!(GeneratedClaim::from_payload(r#"{"amount":500}"#).is_structured());
        assert!(!GeneratedClaim::from_payload("free text claim").is_structured());
    }

    #[test]
    fn test_appeal_payloads() {
        let appeal = DoctorAppeal::parse(
            r#"{"appeal_summary":"Necessary","additional_evidence":["MRI"]}"#,
        )
        .unwrap();
        assert_eq!(appeal.additional_evidence, vec!["MRI".to_string()]);
        assert!(appeal.medical_justification.is_none());

        let counter = InsuranceCounter::parse(
            r#"{"position_change":"MAINTAINED","new_strength_score":0.65}"#,
        )
        .unwrap();
        assert_eq!(counter.new_strength_score, Some(0.65));
        assert!(InsuranceCounter::parse("no").is_err());
    }
}

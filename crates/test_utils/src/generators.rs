//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use domain_arbitration::{AgentRole, CaseInputs, Verdict};
use proptest::prelude::*;

/// Strategy for decision labels, in any case and with stray whitespace
pub fn decision_label_strategy() -> impl Strategy<Value = String> {
    let base = prop_oneof![
        Just("approved".to_string()),
        Just("denied".to_string()),
        Just("pending".to_string()),
        "[a-z]{1,12}",
    ];
    (base, any::<bool>(), any::<bool>()).prop_map(|(label, upper, pad)| {
        let label = if upper { label.to_uppercase() } else { label };
        if pad {
            format!("  {label} ")
        } else {
            label
        }
    })
}

/// Expected classification of a label from [`decision_label_strategy`]
pub fn expected_verdict(label: &str) -> Verdict {
    match label.trim().to_ascii_lowercase().as_str() {
        "approved" => Verdict::Approved,
        "denied" => Verdict::Denied,
        _ => Verdict::Unknown,
    }
}

/// Strategy for valid case inputs
pub fn case_inputs_strategy() -> impl Strategy<Value = CaseInputs> {
    ("P[0-9]{3,6}", "[0-9]{5}", "[A-Za-z][A-Za-z ,.]{10,120}")
        .prop_map(|(patient, procedure, notes)| CaseInputs::new(patient, procedure, notes))
}

/// Strategy for a role called before the verdict is known
pub fn pre_verdict_role_strategy() -> impl Strategy<Value = AgentRole> {
    prop::sample::select(vec![
        AgentRole::Builder,
        AgentRole::InsuranceReviewer,
        AgentRole::Judge,
    ])
}

/// Strategy for a failure point inside the appeals exchange:
/// `(round, counter_side)`
pub fn appeal_failure_point_strategy() -> impl Strategy<Value = (u8, bool)> {
    (1u8..=3u8, any::<bool>())
}

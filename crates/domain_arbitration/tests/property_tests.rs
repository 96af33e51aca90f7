//! Property-based tests for the arbitration workflow

use std::sync::Arc;

use proptest::prelude::*;

use core_kernel::PortError;

use domain_arbitration::{
    AgentRole, CaseRecord, Verdict, WorkflowConfig, WorkflowController, WorkflowError,
    WorkflowOutcome, WorkflowStage,
};

use test_utils::{
    appeal_failure_point_strategy, assert_transcript_well_formed, case_inputs_strategy,
    decision_label_strategy, expected_verdict, pre_verdict_role_strategy, InputFixtures,
    PayloadFixtures, ScriptedGateway,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn run(gateway: ScriptedGateway) -> (Result<WorkflowOutcome, WorkflowError>, CaseRecord) {
    runtime().block_on(async {
        let controller = WorkflowController::new(Arc::new(gateway), WorkflowConfig::default());
        let result = controller.start(InputFixtures::mri_case()).await;
        (result, controller.snapshot().await.record)
    })
}

proptest! {
    #[test]
    fn verdict_label_routes_case(label in decision_label_strategy()) {
        let expected = expected_verdict(&label);
        let (result, record) = run(ScriptedGateway::with_judge(PayloadFixtures::judge(&label)));
        let outcome = result.unwrap();

        prop_assert_eq!(outcome.final_decision, expected);
        prop_assert_eq!(record.current_stage(), WorkflowStage::Resolved);
        if expected == Verdict::Denied {
            prop_assert_eq!(record.appeal_history().len(), 6);
        } else {
            prop_assert!(record.appeal_history().is_empty());
        }
    }

    #[test]
    fn appeal_failure_point_bounds_transcript((round, counter_side) in appeal_failure_point_strategy()) {
        let mut gateway = ScriptedGateway::denying();
        let failing_role = if counter_side {
            AgentRole::InsuranceCounter
        } else {
            AgentRole::DoctorAppeal
        };
        for r in 1..round {
            gateway = gateway.reply(failing_role, match failing_role {
                AgentRole::DoctorAppeal => PayloadFixtures::doctor_appeal(r),
                _ => PayloadFixtures::insurance_counter(r),
            });
        }
        gateway = gateway.fail(failing_role, PortError::connection("dropped"));

        let (result, record) = run(gateway);
        let outcome = result.unwrap();

        let expected_entries = 2 * (round as usize - 1) + usize::from(counter_side);
        prop_assert_eq!(outcome.appeal_entries, expected_entries);
        prop_assert_eq!(outcome.appeal_rounds, round - 1);
        prop_assert_eq!(outcome.final_decision, Verdict::Denied);
        prop_assert_eq!(outcome.appeals_halted.map(|h| h.round), Some(round));
        prop_assert_eq!(record.current_stage(), WorkflowStage::Resolved);
        assert_transcript_well_formed(&record);
    }

    #[test]
    fn pre_verdict_failure_fails_in_that_stage(role in pre_verdict_role_strategy()) {
        let expected_stage = match role {
            AgentRole::Builder => WorkflowStage::Building,
            AgentRole::InsuranceReviewer => WorkflowStage::Reviewing,
            _ => WorkflowStage::Judging,
        };
        let gateway = ScriptedGateway::approving().fail(role, PortError::internal("boom"));

        let (result, record) = run(gateway);

        prop_assert!(matches!(result, Err(WorkflowError::Gateway(ref e)) if e.role == role));
        prop_assert_eq!(record.current_stage(), WorkflowStage::Failed);
        prop_assert_eq!(record.failure().map(|f| f.stage), Some(expected_stage));
        prop_assert!(record.final_decision().is_none());
    }

    #[test]
    fn valid_inputs_pass_checks(inputs in case_inputs_strategy()) {
        prop_assert!(inputs.check().is_ok());
    }

    #[test]
    fn reset_always_yields_fresh_record(inputs in case_inputs_strategy(), deny in any::<bool>()) {
        let gateway = if deny { ScriptedGateway::denying() } else { ScriptedGateway::approving() };
        let record = runtime().block_on(async {
            let controller = WorkflowController::new(Arc::new(gateway), WorkflowConfig::default());
            controller.start(inputs.clone()).await.unwrap();
            controller.reset().await;
            controller.snapshot().await.record
        });

        prop_assert_eq!(record, CaseRecord::create(inputs));
    }
}

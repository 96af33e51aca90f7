//! Scripted Agent Gateway
//!
//! An in-process `AgentGateway` for tests. Each role answers from its own
//! queue of scripted replies, falling back to a default payload once the
//! queue is empty. Every call is logged, and a call can be held open until
//! the test releases it, which is how cancellation by reset is exercised.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use core_kernel::{DomainPort, PortError};
use domain_arbitration::{AgentGateway, AgentRole};

use crate::fixtures::PayloadFixtures;

/// One call observed by the scripted gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub role: AgentRole,
    /// Appeal round, for the two appeal roles
    pub round: Option<u8>,
    /// Arguments in declaration order, round excluded
    pub args: Vec<String>,
}

#[derive(Default)]
struct Script {
    queued: HashMap<AgentRole, VecDeque<Result<String, PortError>>>,
    defaults: HashMap<AgentRole, String>,
    calls: Vec<RecordedCall>,
}

impl Script {
    fn next_reply(&mut self, role: AgentRole) -> Result<String, PortError> {
        if let Some(reply) = self.queued.get_mut(&role).and_then(VecDeque::pop_front) {
            return reply;
        }
        self.defaults
            .get(&role)
            .cloned()
            .ok_or_else(|| PortError::internal(format!("no scripted reply for {role}")))
    }
}

#[derive(Default)]
struct Latch {
    entered: Notify,
    release: Notify,
}

/// Handle on a held call
#[derive(Clone)]
pub struct HoldHandle(Arc<Latch>);

impl HoldHandle {
    /// Waits until the held call has been made
    pub async fn entered(&self) {
        self.0.entered.notified().await;
    }

    /// Lets the held call return its reply
    pub fn release(&self) {
        self.0.release.notify_one();
    }
}

/// Gateway answering from per-role scripts
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
    holds: Mutex<HashMap<AgentRole, Arc<Latch>>>,
}

impl ScriptedGateway {
    /// A gateway with nothing scripted; every call fails until replies are added
    pub fn new() -> Self {
        Self::default()
    }

    /// Every role answers with a well-formed payload; the judge approves
    pub fn approving() -> Self {
        Self::with_judge(PayloadFixtures::judge_approved())
    }

    /// Every role answers with a well-formed payload; the judge denies
    pub fn denying() -> Self {
        Self::with_judge(PayloadFixtures::judge_denied())
    }

    /// Well-formed defaults for every role, with the given judge payload
    pub fn with_judge(judge: impl Into<String>) -> Self {
        Self::new()
            .default_reply(AgentRole::Builder, PayloadFixtures::claim())
            .default_reply(AgentRole::InsuranceReviewer, PayloadFixtures::insurance_case())
            .default_reply(AgentRole::Judge, judge)
            .default_reply(AgentRole::DoctorAppeal, PayloadFixtures::doctor_appeal(1))
            .default_reply(AgentRole::InsuranceCounter, PayloadFixtures::insurance_counter(1))
    }

    /// Reply used once the role's queue is empty
    pub fn default_reply(mut self, role: AgentRole, payload: impl Into<String>) -> Self {
        self.script_mut().defaults.insert(role, payload.into());
        self
    }

    /// Queues one reply for the role
    pub fn reply(mut self, role: AgentRole, payload: impl Into<String>) -> Self {
        self.script_mut()
            .queued
            .entry(role)
            .or_default()
            .push_back(Ok(payload.into()));
        self
    }

    /// Queues one failure for the role
    pub fn fail(mut self, role: AgentRole, error: PortError) -> Self {
        self.script_mut()
            .queued
            .entry(role)
            .or_default()
            .push_back(Err(error));
        self
    }

    /// Holds the next call to `role` open until released
    pub fn hold(&self, role: AgentRole) -> HoldHandle {
        let latch = Arc::new(Latch::default());
        self.holds.lock().unwrap().insert(role, Arc::clone(&latch));
        HoldHandle(latch)
    }

    /// All calls in the order they were made
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Roles in the order they were called
    pub fn roles_called(&self) -> Vec<AgentRole> {
        self.calls().into_iter().map(|c| c.role).collect()
    }

    pub fn call_count(&self, role: AgentRole) -> usize {
        self.calls().iter().filter(|c| c.role == role).count()
    }

    fn script_mut(&mut self) -> &mut Script {
        self.script.get_mut().unwrap()
    }

    async fn answer(&self, role: AgentRole, round: Option<u8>, args: &[&str]) -> Result<String, PortError> {
        let reply = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(RecordedCall {
                role,
                round,
                args: args.iter().map(|a| a.to_string()).collect(),
            });
            script.next_reply(role)
        };

        let latch = self.holds.lock().unwrap().remove(&role);
        if let Some(latch) = latch {
            latch.entered.notify_one();
            latch.release.notified().await;
        }
        reply
    }
}

impl DomainPort for ScriptedGateway {}

#[async_trait]
impl AgentGateway for ScriptedGateway {
    async fn build_claim(
        &self,
        patient_id: &str,
        procedure_code: &str,
        clinical_notes: &str,
    ) -> Result<String, PortError> {
        self.answer(AgentRole::Builder, None, &[patient_id, procedure_code, clinical_notes])
            .await
    }

    async fn review_claim(&self, claim: &str, procedure_code: &str) -> Result<String, PortError> {
        self.answer(AgentRole::InsuranceReviewer, None, &[claim, procedure_code])
            .await
    }

    async fn judge(
        &self,
        claim: &str,
        insurance_case: &str,
        patient_id: &str,
        procedure_code: &str,
    ) -> Result<String, PortError> {
        self.answer(
            AgentRole::Judge,
            None,
            &[claim, insurance_case, patient_id, procedure_code],
        )
        .await
    }

    async fn doctor_appeal(
        &self,
        claim: &str,
        insurance_case: &str,
        judge_decision: &str,
        round: u8,
    ) -> Result<String, PortError> {
        self.answer(
            AgentRole::DoctorAppeal,
            Some(round),
            &[claim, insurance_case, judge_decision],
        )
        .await
    }

    async fn insurance_counter(
        &self,
        doctor_appeal: &str,
        insurance_case: &str,
        round: u8,
    ) -> Result<String, PortError> {
        self.answer(
            AgentRole::InsuranceCounter,
            Some(round),
            &[doctor_appeal, insurance_case],
        )
        .await
    }
}

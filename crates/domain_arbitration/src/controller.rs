//! Workflow Controller
//!
//! Drives one case record through the arbitration stage machine:
//!
//! 1. `start` validates the inputs and moves AWAITING_INPUT -> BUILDING
//! 2. Builder, reviewer and judge are called strictly one after another;
//!    a failed call moves the case to FAILED
//! 3. The judge payload must parse; if it does not, the case halts at
//!    JUDGING with the raw text kept for inspection
//! 4. APPROVED (or any unrecognised verdict) resolves at once; DENIED opens
//!    up to [`MAX_APPEAL_ROUNDS`] doctor/insurer rounds
//! 5. The appeals exchange never changes the verdict; filings that are not
//!    JSON are kept raw, and a failed role call ends the exchange early
//!    before the case resolves
//!
//! # Concurrency
//!
//! The record lives behind a `tokio::sync::RwLock` that is never held across
//! a gateway call. `start` and `reset` each bump the record generation; every
//! commit re-checks the generation captured when its run began, so results
//! that arrive after a reset are discarded instead of being applied to the
//! fresh record.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use core_kernel::{CaseId, PortError};

use crate::appeal::{AppealEntry, AppealKind, MAX_APPEAL_ROUNDS};
use crate::case::{CaseInputs, CaseRecord};
use crate::catalog::ReferenceCatalog;
use crate::config::WorkflowConfig;
use crate::error::{GatewayError, WorkflowError};
use crate::events::{WorkflowEvent, WorkflowEventKind};
use crate::gateway::{AgentGateway, AgentRole};
use crate::payload::{GeneratedClaim, InsuranceCase, JudgeDecision, Verdict};
use crate::stage::WorkflowStage;
use crate::status::CaseSummary;

/// Read-only view handed to presentation code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    /// Identifier of the current run, `None` before the first start
    pub case_id: Option<CaseId>,
    pub generation: u64,
    pub record: CaseRecord,
}

/// Why the appeals exchange stopped before its last round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppealHalt {
    pub round: u8,
    pub kind: AppealKind,
    pub reason: String,
}

/// Result of a run that reached RESOLVED
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowOutcome {
    pub case_id: CaseId,
    pub generation: u64,
    /// Always the judge's verdict
    pub final_decision: Verdict,
    /// Completed appeal rounds
    pub appeal_rounds: u8,
    pub appeal_entries: usize,
    pub appeals_halted: Option<AppealHalt>,
}

struct ControllerState {
    case_id: Option<CaseId>,
    generation: u64,
    record: CaseRecord,
}

/// Identity of one run: the case it opened and the generation it belongs to
#[derive(Debug, Clone, Copy)]
struct Run {
    case_id: CaseId,
    generation: u64,
}

/// Payload texts forwarded between roles during the appeals exchange
struct Transcript<'a> {
    claim: &'a str,
    insurance_case: &'a str,
    judge: &'a str,
}

/// The arbitration workflow controller
///
/// One controller owns one case record. Share it behind an `Arc` when a
/// status display needs to read or reset while a run is in flight.
pub struct WorkflowController {
    gateway: Arc<dyn AgentGateway>,
    catalog: Option<Arc<dyn ReferenceCatalog>>,
    config: WorkflowConfig,
    state: RwLock<ControllerState>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl WorkflowController {
    /// Creates a controller with an empty record awaiting input
    pub fn new(gateway: Arc<dyn AgentGateway>, config: WorkflowConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            gateway,
            catalog: None,
            config,
            state: RwLock::new(ControllerState {
                case_id: None,
                generation: 0,
                record: CaseRecord::default(),
            }),
            events,
        }
    }

    /// Validates patient and procedure against a reference catalog on start
    pub fn with_catalog(mut self, catalog: Arc<dyn ReferenceCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Subscribes to state-changed notifications
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Returns a copy of the committed state
    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.state.read().await;
        WorkflowSnapshot {
            case_id: state.case_id,
            generation: state.generation,
            record: state.record.clone(),
        }
    }

    pub async fn stage(&self) -> WorkflowStage {
        self.state.read().await.record.current_stage()
    }

    /// Dashboard view of the committed state
    pub async fn summary(&self) -> CaseSummary {
        CaseSummary::from_record(&self.state.read().await.record)
    }

    /// Clears the record back to AWAITING_INPUT.
    ///
    /// Honoured at any time. A run with a call still outstanding will have
    /// its late result discarded and end with [`WorkflowError::Superseded`].
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let from = state.record.current_stage();
        state.generation += 1;
        state.record.reset();
        let (case_id, generation) = (state.case_id, state.generation);
        drop(state);

        info!(
            case_id = ?case_id,
            generation,
            from = %from,
            "Workflow reset"
        );
        self.emit(case_id, generation, WorkflowEventKind::Reset);
    }

    /// Opens a case and drives it until it resolves, fails, or halts.
    ///
    /// # Errors
    ///
    /// - `Validation` / `Catalog` / `StageConflict`: nothing changed
    /// - `Gateway`: builder, reviewer or judge failed; the case is FAILED
    /// - `DecisionUnparseable`: the case halts at JUDGING
    /// - `Superseded`: a reset intervened; late results were dropped
    /// - `InvariantViolation`: a step lacked its preconditions; the case is FAILED
    pub async fn start(&self, inputs: CaseInputs) -> Result<WorkflowOutcome, WorkflowError> {
        if let Err(problems) = inputs.check() {
            warn!(problems = ?problems, "Rejected case inputs");
            return Err(WorkflowError::Validation(problems));
        }
        self.check_catalog(&inputs).await?;

        let run = self.open(inputs.clone()).await?;
        info!(
            case_id = %run.case_id,
            generation = run.generation,
            patient_id = %inputs.patient_id,
            procedure_code = %inputs.procedure_code,
            "Arbitration started"
        );

        self.drive(run, &inputs).await
    }

    async fn check_catalog(&self, inputs: &CaseInputs) -> Result<(), WorkflowError> {
        let Some(catalog) = &self.catalog else {
            return Ok(());
        };

        let mut problems = Vec::new();
        if catalog
            .patient(&inputs.patient_id)
            .await
            .map_err(WorkflowError::Catalog)?
            .is_none()
        {
            problems.push(format!("unknown patient_id '{}'", inputs.patient_id));
        }
        if catalog
            .procedure(&inputs.procedure_code)
            .await
            .map_err(WorkflowError::Catalog)?
            .is_none()
        {
            problems.push(format!("unknown procedure_code '{}'", inputs.procedure_code));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            warn!(problems = ?problems, "Case inputs not found in reference catalog");
            Err(WorkflowError::Validation(problems))
        }
    }

    async fn open(&self, inputs: CaseInputs) -> Result<Run, WorkflowError> {
        let mut state = self.state.write().await;
        let stage = state.record.current_stage();
        if stage != WorkflowStage::AwaitingInput {
            return Err(WorkflowError::StageConflict { stage });
        }

        let mut record = CaseRecord::create(inputs);
        record.advance(WorkflowStage::Building)?;

        state.generation += 1;
        let run = Run {
            case_id: CaseId::new_v7(),
            generation: state.generation,
        };
        state.case_id = Some(run.case_id);
        state.record = record;
        drop(state);

        self.publish(&run, WorkflowEventKind::StageChanged {
            from: WorkflowStage::AwaitingInput,
            to: WorkflowStage::Building,
        });
        Ok(run)
    }

    async fn drive(&self, run: Run, inputs: &CaseInputs) -> Result<WorkflowOutcome, WorkflowError> {
        // BUILDING
        let claim_text = match self
            .invoke(
                &run,
                AgentRole::Builder,
                self.gateway.build_claim(
                    &inputs.patient_id,
                    &inputs.procedure_code,
                    &inputs.clinical_notes,
                ),
            )
            .await
        {
            Ok(text) => text,
            Err(err) => return Err(self.fail_stage(&run, err).await),
        };

        let claim = GeneratedClaim::from_payload(claim_text.clone());
        let structured = claim.is_structured();
        if !structured {
            warn!(case_id = %run.case_id, "Builder claim is not JSON; keeping raw text");
        }
        self.commit(&run, |record| {
            record.set_generated_claim(claim)?;
            record.advance(WorkflowStage::Reviewing)
        })
        .await?;
        self.publish(&run, WorkflowEventKind::ClaimGenerated { structured });
        self.publish_transition(&run, WorkflowStage::Building, WorkflowStage::Reviewing);

        // REVIEWING
        let review_text = match self
            .invoke(
                &run,
                AgentRole::InsuranceReviewer,
                self.gateway.review_claim(&claim_text, &inputs.procedure_code),
            )
            .await
        {
            Ok(text) => text,
            Err(err) => return Err(self.fail_stage(&run, err).await),
        };

        let (insurance_case, projection_error) = InsuranceCase::from_payload(review_text.clone());
        if let Some(err) = &projection_error {
            warn!(case_id = %run.case_id, error = %err, "Insurance case projection incomplete");
        }
        let structured = insurance_case.structured;
        let strength_score = insurance_case.strength_score;
        self.commit(&run, |record| {
            record.set_insurance_case(insurance_case)?;
            record.advance(WorkflowStage::Judging)
        })
        .await?;
        self.publish(&run, WorkflowEventKind::InsuranceCaseRecorded {
            structured,
            strength_score,
        });
        self.publish_transition(&run, WorkflowStage::Reviewing, WorkflowStage::Judging);

        // JUDGING
        let judge_text = match self
            .invoke(
                &run,
                AgentRole::Judge,
                self.gateway.judge(
                    &claim_text,
                    &review_text,
                    &inputs.patient_id,
                    &inputs.procedure_code,
                ),
            )
            .await
        {
            Ok(text) => text,
            Err(err) => return Err(self.fail_stage(&run, err).await),
        };

        let decision = match JudgeDecision::parse(&judge_text) {
            Ok(decision) => decision,
            Err(parse_error) => {
                let reason = parse_error.to_string();
                self.commit(&run, |record| record.set_judge_payload(judge_text.clone()))
                    .await?;
                warn!(
                    case_id = %run.case_id,
                    generation = run.generation,
                    reason = %reason,
                    "Judge decision unparseable; halting at JUDGING"
                );
                self.publish(&run, WorkflowEventKind::DecisionUnparseable {
                    reason: reason.clone(),
                });
                return Err(WorkflowError::DecisionUnparseable {
                    reason,
                    raw: judge_text,
                });
            }
        };

        let verdict = decision.final_decision;
        let confidence_score = decision.confidence_score;
        let next = if verdict.is_appealable() {
            WorkflowStage::Appealing
        } else {
            WorkflowStage::Resolved
        };
        self.commit(&run, |record| {
            record.set_judge_payload(judge_text.clone())?;
            record.set_judge_decision(decision)?;
            if verdict.is_appealable() {
                record.advance(WorkflowStage::Appealing)
            } else {
                record.resolve().map(|_| ())
            }
        })
        .await?;
        self.publish(&run, WorkflowEventKind::DecisionRecorded {
            verdict,
            confidence_score,
        });
        self.publish_transition(&run, WorkflowStage::Judging, next);

        if !verdict.is_appealable() {
            info!(
                case_id = %run.case_id,
                verdict = %verdict,
                "Arbitration resolved without appeals"
            );
            return Ok(WorkflowOutcome {
                case_id: run.case_id,
                generation: run.generation,
                final_decision: verdict,
                appeal_rounds: 0,
                appeal_entries: 0,
                appeals_halted: None,
            });
        }

        // APPEALING
        let transcript = Transcript {
            claim: &claim_text,
            insurance_case: &review_text,
            judge: &judge_text,
        };
        let appeals_halted = self.run_appeals(&run, &transcript).await?;

        let (final_decision, appeal_rounds, appeal_entries) = self
            .commit(&run, |record| {
                let verdict = record.resolve()?;
                Ok((verdict, record.appeal_round(), record.appeal_history().len()))
            })
            .await?;
        self.publish_transition(&run, WorkflowStage::Appealing, WorkflowStage::Resolved);

        info!(
            case_id = %run.case_id,
            verdict = %final_decision,
            appeal_rounds,
            appeal_entries,
            halted = appeals_halted.is_some(),
            "Arbitration resolved after appeals"
        );
        Ok(WorkflowOutcome {
            case_id: run.case_id,
            generation: run.generation,
            final_decision,
            appeal_rounds,
            appeal_entries,
            appeals_halted,
        })
    }

    /// Runs the bounded doctor/insurer exchange.
    ///
    /// Filings that are not JSON are kept raw and the exchange carries on.
    /// Returns the halt reason when a role call failed.
    async fn run_appeals(
        &self,
        run: &Run,
        transcript: &Transcript<'_>,
    ) -> Result<Option<AppealHalt>, WorkflowError> {
        for round in 1..=MAX_APPEAL_ROUNDS {
            let doctor_text = match self
                .invoke(
                    run,
                    AgentRole::DoctorAppeal,
                    self.gateway.doctor_appeal(
                        transcript.claim,
                        transcript.insurance_case,
                        transcript.judge,
                        round,
                    ),
                )
                .await
            {
                Ok(text) => text,
                Err(err) => {
                    return self
                        .halt_appeals(run, round, AppealKind::DoctorAppeal, err.to_string())
                        .await
                        .map(Some)
                }
            };

            let (entry, parse_error) = AppealEntry::doctor(round, doctor_text.clone());
            if let Some(err) = &parse_error {
                warn!(case_id = %run.case_id, round, error = %err, "Doctor appeal kept as raw text");
            }
            self.record_appeal(run, entry).await?;

            let counter_text = match self
                .invoke(
                    run,
                    AgentRole::InsuranceCounter,
                    self.gateway
                        .insurance_counter(&doctor_text, transcript.insurance_case, round),
                )
                .await
            {
                Ok(text) => text,
                Err(err) => {
                    return self
                        .halt_appeals(run, round, AppealKind::InsuranceCounter, err.to_string())
                        .await
                        .map(Some)
                }
            };

            let (entry, parse_error) = AppealEntry::counter(round, counter_text);
            if let Some(err) = &parse_error {
                warn!(case_id = %run.case_id, round, error = %err, "Counter-appeal kept as raw text");
            }
            self.record_appeal(run, entry).await?;

            debug!(case_id = %run.case_id, round, "Appeal round complete");
        }
        Ok(None)
    }

    async fn record_appeal(&self, run: &Run, entry: AppealEntry) -> Result<(), WorkflowError> {
        let (round, kind, structured) = (entry.round, entry.kind, entry.is_structured());
        self.commit(run, |record| record.push_appeal(entry)).await?;
        self.publish(run, WorkflowEventKind::AppealRecorded {
            round,
            kind,
            structured,
        });
        Ok(())
    }

    async fn halt_appeals(
        &self,
        run: &Run,
        round: u8,
        kind: AppealKind,
        reason: String,
    ) -> Result<AppealHalt, WorkflowError> {
        self.ensure_current(run).await?;
        warn!(
            case_id = %run.case_id,
            generation = run.generation,
            round,
            kind = ?kind,
            reason = %reason,
            "Appeals exchange halted; verdict stands"
        );
        self.publish(run, WorkflowEventKind::AppealsHalted {
            round,
            kind,
            reason: reason.clone(),
        });
        Ok(AppealHalt { round, kind, reason })
    }

    /// Calls a role function, bounded by the configured timeout
    async fn invoke<F>(&self, run: &Run, role: AgentRole, call: F) -> Result<String, GatewayError>
    where
        F: Future<Output = Result<String, PortError>>,
    {
        let started = Instant::now();
        debug!(
            case_id = %run.case_id,
            generation = run.generation,
            role = %role,
            "Calling role function"
        );

        let result = match self.config.call_timeout() {
            Some(bound) => tokio::time::timeout(bound, call)
                .await
                .unwrap_or_else(|_| Err(PortError::timeout(role.operation(), bound))),
            None => call.await,
        };

        debug!(
            case_id = %run.case_id,
            role = %role,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Role function returned"
        );
        result.map_err(|source| GatewayError::new(role, source))
    }

    /// Moves the case to FAILED after a builder, reviewer or judge failure
    async fn fail_stage(&self, run: &Run, err: GatewayError) -> WorkflowError {
        warn!(
            case_id = %run.case_id,
            generation = run.generation,
            role = %err.role,
            transient = err.source.is_transient(),
            error = %err,
            "Gateway call failed"
        );

        let message = err.to_string();
        let failed = self
            .commit(run, |record| {
                let stage = record.current_stage();
                record.fail(message.clone())?;
                Ok(stage)
            })
            .await;

        match failed {
            Ok(stage) => {
                self.publish(run, WorkflowEventKind::StageFailed { stage, message });
                self.publish_transition(run, stage, WorkflowStage::Failed);
                WorkflowError::Gateway(err)
            }
            Err(other) => other,
        }
    }

    async fn ensure_current(&self, run: &Run) -> Result<(), WorkflowError> {
        let current = self.state.read().await.generation;
        if current != run.generation {
            warn!(
                case_id = %run.case_id,
                generation = run.generation,
                current_generation = current,
                "Discarding result of a superseded run"
            );
            return Err(WorkflowError::Superseded {
                generation: run.generation,
            });
        }
        Ok(())
    }

    /// Applies one step to the record if the run is still current.
    ///
    /// The step works on a draft and is committed whole, so readers only
    /// ever see the record before or after it. A step rejected for an
    /// unmet precondition fails the case.
    async fn commit<T>(
        &self,
        run: &Run,
        apply: impl FnOnce(&mut CaseRecord) -> Result<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        let mut state = self.state.write().await;
        if state.generation != run.generation {
            warn!(
                case_id = %run.case_id,
                generation = run.generation,
                current_generation = state.generation,
                "Discarding result of a superseded run"
            );
            return Err(WorkflowError::Superseded {
                generation: run.generation,
            });
        }

        let mut draft = state.record.clone();
        match apply(&mut draft) {
            Ok(value) => {
                state.record = draft;
                Ok(value)
            }
            Err(err) => {
                error!(
                    case_id = %run.case_id,
                    generation = run.generation,
                    stage = %state.record.current_stage(),
                    error = %err,
                    "Rejected case mutation"
                );
                let stage = state.record.current_stage();
                let message = err.to_string();
                if state.record.fail(message.clone()).is_ok() {
                    drop(state);
                    self.publish(run, WorkflowEventKind::StageFailed { stage, message });
                    self.publish_transition(run, stage, WorkflowStage::Failed);
                }
                Err(err)
            }
        }
    }

    fn publish_transition(&self, run: &Run, from: WorkflowStage, to: WorkflowStage) {
        info!(
            case_id = %run.case_id,
            generation = run.generation,
            from = %from,
            to = %to,
            "Stage transition"
        );
        self.publish(run, WorkflowEventKind::StageChanged { from, to });
    }

    fn publish(&self, run: &Run, kind: WorkflowEventKind) {
        self.emit(Some(run.case_id), run.generation, kind);
    }

    fn emit(&self, case_id: Option<CaseId>, generation: u64, kind: WorkflowEventKind) {
        // No subscribers is not an error
        let _ = self.events.send(WorkflowEvent::new(case_id, generation, kind));
    }
}

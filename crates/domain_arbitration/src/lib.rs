//! Claims Arbitration Domain
//!
//! This crate implements the orchestration core of a multi-party arbitration
//! process for disputed insurance claims: a claim builder, an insurance
//! reviewer, an independent judge, and a bounded appeals exchange between the
//! doctor and the insurer.
//!
//! # Workflow Lifecycle
//!
//! ```text
//! AWAITING_INPUT -> BUILDING -> REVIEWING -> JUDGING -> (APPEALING) -> RESOLVED
//!                       \            \           \            \
//!                        +------------+-----------+------------+--> FAILED
//! ```
//!
//! The judge's verdict is final. Appeals only run for denied claims, are
//! capped at [`MAX_APPEAL_ROUNDS`], and accumulate a transcript for human
//! review without ever changing the decision.

pub mod stage;
pub mod payload;
pub mod appeal;
pub mod case;
pub mod gateway;
pub mod catalog;
pub mod events;
pub mod config;
pub mod controller;
pub mod status;
pub mod error;

pub use stage::WorkflowStage;
pub use payload::{
    GeneratedClaim, InsuranceCase, JudgeDecision, Verdict,
    DoctorAppeal, InsuranceCounter, PayloadError,
};
pub use appeal::{AppealEntry, AppealKind, AppealPayload, MAX_APPEAL_ROUNDS};
pub use case::{CaseInputs, CaseRecord, StageFailure};
pub use gateway::{AgentGateway, AgentRole};
pub use catalog::{ReferenceCatalog, InMemoryCatalog, PatientProfile, ProcedureInfo};
pub use events::{WorkflowEvent, WorkflowEventKind};
pub use config::WorkflowConfig;
pub use controller::{WorkflowController, WorkflowOutcome, WorkflowSnapshot, AppealHalt};
pub use status::{CaseSummary, ClaimStatus, ReviewStatus};
pub use error::{WorkflowError, GatewayError};

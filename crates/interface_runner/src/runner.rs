//! Single-case run loop
//!
//! Starts one case on a controller, logs workflow events as they arrive, and
//! resets the controller if shutdown is requested before the case settles.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use domain_arbitration::{
    CaseInputs, CaseSummary, InMemoryCatalog, PatientProfile, ProcedureInfo, WorkflowController,
    WorkflowEventKind, WorkflowOutcome, WorkflowSnapshot,
};

/// What the runner prints once a case settles
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: Option<WorkflowOutcome>,
    pub error: Option<String>,
    pub cancelled: bool,
    pub summary: CaseSummary,
    pub snapshot: WorkflowSnapshot,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    patients: Vec<PatientProfile>,
    #[serde(default)]
    procedures: Vec<ProcedureInfo>,
}

/// Reads case inputs from a JSON file
pub fn load_case(path: &Path) -> anyhow::Result<CaseInputs> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading case file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing case file {}", path.display()))
}

/// Reads a reference catalog from a JSON file
pub fn load_catalog(path: &Path) -> anyhow::Result<InMemoryCatalog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog file {}", path.display()))?;
    let file: CatalogFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing catalog file {}", path.display()))?;

    let catalog = file
        .patients
        .into_iter()
        .fold(InMemoryCatalog::new(), InMemoryCatalog::with_patient);
    Ok(file
        .procedures
        .into_iter()
        .fold(catalog, InMemoryCatalog::with_procedure))
}

/// Runs one case to completion, or until `shutdown` resolves
pub async fn run_case<S>(
    controller: Arc<WorkflowController>,
    inputs: CaseInputs,
    shutdown: S,
) -> RunReport
where
    S: Future<Output = ()>,
{
    let mut events = controller.subscribe();
    let logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    debug!(
                        generation = event.generation,
                        event = ?event.kind,
                        "Workflow event"
                    );
                    if let WorkflowEventKind::StageChanged { to, .. } = event.kind {
                        if to.is_terminal() {
                            info!(generation = event.generation, stage = %to, "Case reached a final stage");
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut run = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.start(inputs).await })
    };

    let (result, cancelled) = tokio::select! {
        joined = &mut run => (Some(joined), false),
        _ = shutdown => {
            info!("Shutdown requested; resetting the case");
            controller.reset().await;
            run.abort();
            (None, true)
        }
    };
    logger.abort();

    let (outcome, error) = match result {
        Some(Ok(Ok(outcome))) => (Some(outcome), None),
        Some(Ok(Err(err))) => (None, Some(err.to_string())),
        Some(Err(join_err)) => (None, Some(format!("run task failed: {}", join_err))),
        None => (None, Some("cancelled by shutdown".to_string())),
    };

    RunReport {
        outcome,
        error,
        cancelled,
        summary: controller.summary().await,
        snapshot: controller.snapshot().await,
    }
}

//! Claims Arbitration - Runner Binary
//!
//! Runs one arbitration case against the remote role functions and prints
//! the final report as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Run a case with default configuration
//! cargo run --bin arbitration-runner -- case.json
//!
//! # Point at a different role-function host
//! ARBITRATION_GATEWAY_URL=https://agents.example.com/api cargo run --bin arbitration-runner -- case.json
//! ```
//!
//! `case.json` holds `patient_id`, `procedure_code` and `clinical_notes`.
//!
//! # Environment Variables
//!
//! * `ARBITRATION_GATEWAY_URL` - Base URL of the role functions (default: http://localhost:8080)
//! * `ARBITRATION_GATEWAY_TOKEN` - Bearer token sent to the role functions
//! * `ARBITRATION_REQUEST_TIMEOUT_SECS` - HTTP client timeout (default: 120)
//! * `ARBITRATION_CALL_TIMEOUT_MS` - Per-call bound, 0 disables it (default: 120000)
//! * `ARBITRATION_EVENT_BUFFER` - Workflow event channel capacity (default: 64)
//! * `ARBITRATION_CATALOG_PATH` - JSON catalog of known patients and procedures
//! * `ARBITRATION_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `ARBITRATION_LOG_JSON` - Emit JSON log lines (default: false)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_arbitration::WorkflowController;
use infra_gateway::HttpAgentGateway;
use interface_runner::{load_case, load_catalog, run_case, RunnerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config();
    init_tracing(&config.log_level, config.log_json);

    let case_path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: arbitration-runner <case.json>")?;
    let inputs = load_case(&case_path)?;

    let gateway = HttpAgentGateway::new(config.gateway_config())
        .context("configuring the agent gateway")?;
    tracing::info!(
        gateway_url = %gateway.config().base_url,
        case = %case_path.display(),
        "Starting arbitration runner"
    );

    let mut controller = WorkflowController::new(Arc::new(gateway), config.workflow_config());
    if let Some(path) = &config.catalog_path {
        let catalog = load_catalog(Path::new(path))?;
        controller = controller.with_catalog(Arc::new(catalog));
    }

    let report = run_case(Arc::new(controller), inputs, shutdown_signal()).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.succeeded() {
        tracing::warn!(error = ?report.error, "Case did not resolve");
        std::process::exit(1);
    }
    Ok(())
}

/// Loads runner configuration from environment variables.
///
/// Falls back to individual variables and defaults when the prefixed
/// source cannot be deserialized.
fn load_config() -> RunnerConfig {
    RunnerConfig::from_env().unwrap_or_else(|_| {
        let defaults = RunnerConfig::default();
        RunnerConfig {
            gateway_url: std::env::var("ARBITRATION_GATEWAY_URL").unwrap_or(defaults.gateway_url),
            gateway_token: std::env::var("ARBITRATION_GATEWAY_TOKEN").ok(),
            request_timeout_secs: std::env::var("ARBITRATION_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            call_timeout_ms: std::env::var("ARBITRATION_CALL_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.call_timeout_ms),
            event_buffer: defaults.event_buffer,
            catalog_path: std::env::var("ARBITRATION_CATALOG_PATH").ok(),
            log_level: std::env::var("ARBITRATION_LOG_LEVEL")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            log_json: defaults.log_json,
        }
    })
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr; stdout carries the report
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
        }))
        .init();
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}

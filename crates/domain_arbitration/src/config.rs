//! Workflow configuration

use std::time::Duration;

use serde::Deserialize;

/// Controller configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Bound on each gateway call in milliseconds; `None` or zero waits
    /// indefinitely. Expiry counts as a gateway failure.
    pub call_timeout_ms: Option<u64>,
    /// Capacity of the event channel; slow subscribers lag past this
    pub event_buffer: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: Some(120_000),
            event_buffer: 64,
        }
    }
}

impl WorkflowConfig {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn without_call_timeout(mut self) -> Self {
        self.call_timeout_ms = None;
        self
    }

    /// Effective per-call bound
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

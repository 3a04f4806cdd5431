//! Liveness reporting.

use serde::Serialize;

/// Liveness report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// Always `"running"`.
    pub status: &'static str,
}

/// Stateless liveness responder. Does not touch the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthService;

impl HealthService {
    /// Report that the process is up.
    #[must_use]
    pub fn health(&self) -> HealthStatus {
        HealthStatus { status: "running" }
    }
}

//! Request-level services layered over the telemetry log.
//!
//! Each service owns a handle to the shared [`crate::storage::TelemetryLog`]
//! (except [`HealthService`], which has no state) and is independent of the
//! HTTP transport.

mod health;
mod ingest;
mod query;

pub use health::{HealthService, HealthStatus};
pub use ingest::{Ack, IngestService};
pub use query::QueryService;

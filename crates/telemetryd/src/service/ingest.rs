//! Validation and durable append of incoming telemetry.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{Event, TelemetryRecord};
use crate::storage::TelemetryLog;

/// Acknowledgement that a record is durably stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// Always `"ok"`.
    pub status: &'static str,
    /// The record as written to the log.
    #[serde(skip)]
    pub record: TelemetryRecord,
}

/// Validates incoming payloads and appends them to the log.
#[derive(Debug, Clone)]
pub struct IngestService {
    log: Arc<dyn TelemetryLog>,
}

impl IngestService {
    /// Create a service appending to `log`.
    #[must_use]
    pub fn new(log: Arc<dyn TelemetryLog>) -> Self {
        Self { log }
    }

    /// Validate `body` and append it as a new record.
    ///
    /// The append runs on its own task, so dropping the returned future
    /// cannot abandon a write that is already in progress.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `body` is not a JSON object, or the
    /// storage error if the record could not be persisted.
    pub async fn ingest(&self, body: &[u8]) -> Result<Ack> {
        let event = Event::from_slice(body)?;

        let log = Arc::clone(&self.log);
        let record = tokio::spawn(async move { log.append(event).await })
            .await
            .map_err(|err| Error::internal(format!("append task failed: {err}")))??;

        debug!(
            "Ingested telemetry record at {}",
            record.timestamp_str().unwrap_or_default()
        );
        Ok(Ack {
            status: "ok",
            record,
        })
    }
}

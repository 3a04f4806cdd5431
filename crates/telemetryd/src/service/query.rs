//! Bounded "most recent N" reads over the telemetry log.

use std::sync::Arc;

use crate::error::Result;
use crate::record::TelemetryRecord;
use crate::storage::TelemetryLog;

/// Serves "most recent N" reads from the log.
#[derive(Debug, Clone)]
pub struct QueryService {
    log: Arc<dyn TelemetryLog>,
    default_limit: usize,
    max_limit: Option<usize>,
}

impl QueryService {
    /// Create a service reading from `log`.
    #[must_use]
    pub fn new(log: Arc<dyn TelemetryLog>, default_limit: usize, max_limit: Option<usize>) -> Self {
        Self {
            log,
            default_limit,
            max_limit,
        }
    }

    /// Return at most `limit` of the newest records, oldest first.
    ///
    /// A missing `limit` falls back to the default; zero and negative values
    /// yield an empty result without reading the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or contains a corrupt line.
    pub async fn tail(&self, limit: Option<i64>) -> Result<Vec<TelemetryRecord>> {
        let limit = self.resolve_limit(limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut records = self.log.scan_all().await?;
        let start = records.len().saturating_sub(limit);
        Ok(records.split_off(start))
    }

    /// Turn a requested limit into an effective record count.
    #[must_use]
    pub fn resolve_limit(&self, requested: Option<i64>) -> usize {
        let limit = match requested {
            None => self.default_limit,
            Some(n) if n <= 0 => 0,
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        };
        self.max_limit.map_or(limit, |max| limit.min(max))
    }
}

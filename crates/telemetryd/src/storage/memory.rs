//! In-memory telemetry log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{next_stamp, LogStats, TelemetryLog};
use crate::error::Result;
use crate::record::{Event, TelemetryRecord};

/// A [`TelemetryLog`] that keeps records in process memory.
///
/// Follows the same ordering and stamping rules as [`super::FileLog`] but
/// loses everything when dropped.
#[derive(Debug, Default)]
pub struct MemoryLog {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<TelemetryRecord>,
    last_stamp: Option<DateTime<Utc>>,
}

impl MemoryLog {
    /// Create an empty in-memory log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TelemetryLog for MemoryLog {
    async fn append(&self, event: Event) -> Result<TelemetryRecord> {
        let mut state = self.inner.lock().await;
        let stamp = next_stamp(state.last_stamp);
        let record = event.stamp(stamp);
        state.records.push(record.clone());
        state.last_stamp = Some(stamp);
        Ok(record)
    }

    async fn scan_all(&self) -> Result<Vec<TelemetryRecord>> {
        Ok(self.inner.lock().await.records.clone())
    }

    async fn stats(&self) -> Result<LogStats> {
        let state = self.inner.lock().await;
        let mut size_bytes = 0_u64;
        for record in &state.records {
            let line_len = u64::try_from(record.to_line()?.len()).unwrap_or(u64::MAX);
            size_bytes = size_bytes.saturating_add(line_len + 1);
        }
        Ok(LogStats::from_records(&state.records, size_bytes))
    }
}

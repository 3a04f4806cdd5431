//! Storage layer for telemetryd.
//!
//! This module defines the append-only [`TelemetryLog`] abstraction and its
//! implementations:
//! - [`FileLog`]: newline-delimited JSON in a single durable file
//! - [`MemoryLog`]: an in-process substitute for exercising services in tests
//!
//! Every implementation serializes appends and scans behind one lock and
//! assigns timestamps inside that lock, so append order, on-disk order and
//! timestamp order are the same sequence.

mod file;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::record::{Event, TelemetryRecord};

pub use file::FileLog;
pub use memory::MemoryLog;

/// An append-only, ordered sequence of telemetry records.
#[async_trait]
pub trait TelemetryLog: Send + Sync + std::fmt::Debug {
    /// Stamp `event` with the current server time and append it.
    ///
    /// Returns the stored record once it is durable. No other append or scan
    /// can observe a partially written record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or persisted.
    async fn append(&self, event: Event) -> Result<TelemetryRecord>;

    /// Read every record in append order.
    ///
    /// A log that has never been written to yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or a record fails to decode.
    async fn scan_all(&self) -> Result<Vec<TelemetryRecord>>;

    /// Summarize the contents of the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    async fn stats(&self) -> Result<LogStats>;
}

/// Statistics about a telemetry log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    /// Total number of records stored.
    pub total_records: usize,
    /// Timestamp of the oldest record.
    pub first_timestamp: Option<DateTime<Utc>>,
    /// Timestamp of the newest record.
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Size of the serialized log in bytes.
    pub size_bytes: u64,
}

impl LogStats {
    fn from_records(records: &[TelemetryRecord], size_bytes: u64) -> Self {
        Self {
            total_records: records.len(),
            first_timestamp: records.first().and_then(TelemetryRecord::timestamp),
            last_timestamp: records.last().and_then(TelemetryRecord::timestamp),
            size_bytes,
        }
    }
}

/// Pick the timestamp for the next append.
///
/// Never earlier than the previous stamp, so a wall clock stepping backwards
/// cannot reorder the log.
fn next_stamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if last > now => last,
        _ => now,
    }
}

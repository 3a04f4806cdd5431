//! `telemetryd` - Append-only telemetry ingestion service
//!
//! This library provides the core functionality for accepting arbitrary JSON
//! telemetry events, durably appending them to an ordered NDJSON log, and
//! serving bounded "most recent N" queries over HTTP.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod server;
pub mod service;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{Event, TelemetryRecord};
pub use service::{HealthService, IngestService, QueryService};
pub use storage::{FileLog, LogStats, MemoryLog, TelemetryLog};

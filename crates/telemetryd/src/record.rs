//! Core telemetry types.
//!
//! An [`Event`] is a validated client payload that has not been stored yet.
//! A [`TelemetryRecord`] is what the log holds: the same payload plus the
//! server-assigned `timestamp` field.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Name of the server-assigned field carried by every stored record.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Message attached to every rejected payload.
const INVALID_BODY: &str = "invalid or missing body";

/// A validated telemetry payload awaiting a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    fields: Map<String, Value>,
}

impl Event {
    /// Decode a request body into an event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the body is empty, is not valid JSON,
    /// or is valid JSON but not an object.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::validation(INVALID_BODY));
        }

        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(_) | Err(_) => Err(Error::validation(INVALID_BODY)),
        }
    }

    /// Wrap an already-decoded object.
    #[must_use]
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Set the server timestamp, replacing any client-supplied value.
    #[must_use]
    pub fn stamp(mut self, at: DateTime<Utc>) -> TelemetryRecord {
        self.fields
            .insert(TIMESTAMP_FIELD.to_string(), Value::String(format_timestamp(at)));
        TelemetryRecord {
            fields: self.fields,
        }
    }
}

/// A stored telemetry record.
///
/// Serializes as a flat JSON object, which is also its on-disk form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryRecord {
    fields: Map<String, Value>,
}

impl TelemetryRecord {
    /// The raw `timestamp` string, if present.
    #[must_use]
    pub fn timestamp_str(&self) -> Option<&str> {
        self.fields.get(TIMESTAMP_FIELD).and_then(Value::as_str)
    }

    /// The parsed server timestamp.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Look up a payload field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields of the record, including `timestamp`.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Serialize to a single NDJSON line, without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Format an instant as ISO-8601 UTC with microseconds and a trailing `Z`.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

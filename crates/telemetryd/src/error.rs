//! Error types for telemetryd.
//!
//! This module defines all error types used throughout the telemetryd crate,
//! separating "the client sent bad data" from "we could not persist it".

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for telemetryd operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Request Errors ===
    /// The request payload was empty, unparseable, or not a JSON object.
    #[error("validation failed: {0}")]
    Validation(String),

    // === Log Errors ===
    /// Failed to open the backing log file.
    #[error("failed to open telemetry log at {path}: {source}")]
    LogOpen {
        /// Path to the log file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A line of the log could not be decoded as a record.
    #[error("telemetry log is corrupt at line {line}: {source}")]
    Decode {
        /// 1-based line number of the offending line.
        line: usize,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Server Errors ===
    /// The HTTP server failed to bind or crashed.
    #[error("server error: {0}")]
    Server(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for telemetryd operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new server error.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error was caused by the client's payload.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error indicates a corrupt log line.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

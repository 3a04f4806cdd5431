//! Configuration management for telemetryd.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::HeaderValue;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "telemetryd";

/// Default telemetry log file name.
const LOG_FILE_NAME: &str = "telemetry.ndjson";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "TELEMETRYD_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TELEMETRYD_`, sections split on `__`)
/// 2. TOML config file at `~/.config/telemetryd/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Query configuration.
    pub query: QueryConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Origins allowed by CORS. Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the NDJSON telemetry log.
    /// Relative paths resolve against the working directory.
    pub log_path: PathBuf,
}

/// Query-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of records returned when a query has no `limit`.
    pub default_limit: usize,
    /// Upper bound on `limit`. Set to 0 for unlimited.
    pub max_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_allowed_origins: Vec::new(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(LOG_FILE_NAME),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 0,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.server.max_body_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "server.max_body_bytes must be greater than 0".to_string(),
            });
        }

        if self.query.default_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "query.default_limit must be greater than 0".to_string(),
            });
        }

        if self.query.max_limit != 0 && self.query.max_limit < self.query.default_limit {
            return Err(Error::ConfigValidation {
                message: format!(
                    "query.max_limit ({}) cannot be less than query.default_limit ({})",
                    self.query.max_limit, self.query.default_limit
                ),
            });
        }

        for origin in &self.server.cors_allowed_origins {
            if origin.parse::<HeaderValue>().is_err() {
                return Err(Error::ConfigValidation {
                    message: format!("invalid CORS origin: {origin}"),
                });
            }
        }

        self.bind_addr()?;
        Ok(())
    }

    /// Get the socket address to bind the HTTP server to.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| Error::ConfigValidation {
            message: format!("invalid bind address {addr}"),
        })
    }

    /// Get the telemetry log path.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.storage.log_path.clone()
    }

    /// Get the query cap, if any.
    #[must_use]
    pub fn max_limit(&self) -> Option<usize> {
        if self.query.max_limit == 0 {
            None
        } else {
            Some(self.query.max_limit)
        }
    }
}

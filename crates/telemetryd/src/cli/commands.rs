//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::config::Config;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Telemetry log file (overrides config)
    #[arg(short, long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl ServeCommand {
    /// Apply command-line overrides on top of the loaded configuration.
    #[must_use]
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.log_file {
            config.storage.log_path.clone_from(path);
        }
        config
    }
}

/// Tail command arguments.
#[derive(Debug, Args)]
pub struct TailCommand {
    /// Number of most recent records to show
    #[arg(short = 'n', long, default_value = "10")]
    pub lines: i64,

    /// Telemetry log file (overrides config)
    #[arg(short, long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Telemetry log file (overrides config)
    #[arg(short, long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One NDJSON line per record
    #[default]
    Plain,
    /// Pretty-printed JSON array
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_serve_overrides_apply() {
        let cmd = ServeCommand {
            host: Some("127.0.0.1".to_string()),
            port: Some(8080),
            log_file: Some(PathBuf::from("/tmp/t.ndjson")),
        };
        let config = cmd.apply(Config::default());
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.log_path(), PathBuf::from("/tmp/t.ndjson"));
    }

    #[test]
    fn test_serve_without_overrides_keeps_config() {
        let cmd = ServeCommand {
            host: None,
            port: None,
            log_file: None,
        };
        assert_eq!(cmd.apply(Config::default()), Config::default());
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}

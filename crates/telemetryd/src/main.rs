//! `telemetryd` - CLI for the telemetry service
//!
//! This binary runs the HTTP ingestion service and offers offline
//! inspection of the telemetry log.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use telemetryd::cli::{Cli, Command, ConfigCommand, OutputFormat, StatusCommand, TailCommand};
use telemetryd::{init_logging, server, Config, FileLog, QueryService, TelemetryLog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => {
            let config = serve_cmd.apply(config);
            config.validate()?;
            let log: Arc<dyn TelemetryLog> = Arc::new(FileLog::new(config.log_path()));
            server::run(&config, log).await?;
        }
        Command::Tail(tail_cmd) => handle_tail(&config, &tail_cmd).await?,
        Command::Status(status_cmd) => handle_status(&config, &status_cmd).await?,
        Command::Config(config_cmd) => handle_config(&config, config_cmd)?,
    }
    Ok(())
}

fn log_path(config: &Config, override_path: Option<&PathBuf>) -> PathBuf {
    override_path.cloned().unwrap_or_else(|| config.log_path())
}

async fn handle_tail(config: &Config, cmd: &TailCommand) -> anyhow::Result<()> {
    let path = log_path(config, cmd.log_file.as_ref());
    let log = Arc::new(FileLog::new(&path));
    let query = QueryService::new(log, config.query.default_limit, None);

    let records = query
        .tail(Some(cmd.lines))
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    match cmd.format {
        OutputFormat::Plain => {
            for record in &records {
                println!("{}", record.to_line()?);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
    }
    Ok(())
}

async fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let path = log_path(config, cmd.log_file.as_ref());
    let stats = FileLog::new(&path)
        .stats()
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    if cmd.json {
        let status = serde_json::json!({
            "log_path": path,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        let fmt_ts = |ts: Option<chrono::DateTime<chrono::Utc>>| {
            ts.map_or_else(|| "-".to_string(), telemetryd::record::format_timestamp)
        };
        println!("telemetryd status");
        println!("-----------------");
        println!("Log file:      {}", path.display());
        println!("Records:       {}", stats.total_records);
        println!("Size (bytes):  {}", stats.size_bytes);
        println!("First record:  {}", fmt_ts(stats.first_timestamp));
        println!("Last record:   {}", fmt_ts(stats.last_timestamp));
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Host:               {}", config.server.host);
                println!("  Port:               {}", config.server.port);
                println!("  Max body (bytes):   {}", config.server.max_body_bytes);
                if config.server.cors_allowed_origins.is_empty() {
                    println!("  CORS origins:       any");
                } else {
                    println!(
                        "  CORS origins:       {}",
                        config.server.cors_allowed_origins.join(", ")
                    );
                }
                println!();
                println!("[Storage]");
                println!("  Log path:           {}", config.log_path().display());
                println!();
                println!("[Query]");
                println!("  Default limit:      {}", config.query.default_limit);
                match config.max_limit() {
                    Some(max) => println!("  Max limit:          {max}"),
                    None => println!("  Max limit:          unlimited"),
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

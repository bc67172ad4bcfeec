// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Squares Context Engine CLI
//!
//! The `sqctx` binary runs the context aggregation and policy decision engine
//! over fixture-backed providers.
//!
//! ## Commands
//!
//! - `sqctx run` - Aggregate continuously and serve the HTTP API
//! - `sqctx evaluate <ACTION>` - One-shot policy decision
//! - `sqctx context [DOMAIN]` - Print aggregated context
//! - `sqctx config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use squares_context::commands::{self, ConfigCommand, ContextCommand, EvaluateCommand};
use squares_context::server::{self, ServerOptions};
use squares_context_core::domain::config::{EngineConfigManifest, LoggingConfig};

/// Squares context engine - aggregated platform context and action gating
#[derive(Parser)]
#[command(name = "sqctx")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "SQCTX_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Provider fixture (YAML) the engine aggregates from
    #[arg(long, global = true, env = "SQCTX_FIXTURE_PATH", value_name = "FILE")]
    fixture: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true, env = "SQCTX_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate continuously and serve the HTTP API
    #[command(name = "run")]
    Run {
        /// HTTP API host (default: from config)
        #[arg(long, env = "SQCTX_HOST")]
        host: Option<String>,

        /// HTTP API port (default: from config)
        #[arg(long, env = "SQCTX_PORT")]
        port: Option<u16>,

        /// Refresh interval in milliseconds (default: from config)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Evaluate one action against freshly aggregated context
    #[command(name = "evaluate")]
    Evaluate {
        #[command(flatten)]
        command: EvaluateCommand,
    },

    /// Print aggregated context
    #[command(name = "context")]
    Context {
        #[command(flatten)]
        command: ContextCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&logging_settings(&cli))?;

    match cli.command {
        Some(Commands::Run {
            host,
            port,
            interval_ms,
        }) => {
            server::start_server(ServerOptions {
                config_path: cli.config,
                fixture_path: cli.fixture,
                host,
                port,
                interval_ms,
            })
            .await
        }
        Some(Commands::Evaluate { command }) => {
            commands::evaluate::execute(command, cli.config, cli.fixture).await
        }
        Some(Commands::Context { command }) => {
            commands::context::execute(command, cli.config, cli.fixture).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Logging settings from the config file, with the CLI level taking precedence.
/// Falls back to defaults when the config cannot be read yet; the command
/// itself reports that error once logging is up.
fn logging_settings(cli: &Cli) -> LoggingConfig {
    let mut logging = cli
        .config
        .clone()
        .or_else(EngineConfigManifest::discover_config)
        .and_then(|path| EngineConfigManifest::from_yaml_file(path).ok())
        .map(|manifest| manifest.spec.observability.logging)
        .unwrap_or_default();

    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    logging
}

/// Initialize tracing subscriber for logging
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging.level))
        .context("Failed to create log filter")?;

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init();
    }

    Ok(())
}

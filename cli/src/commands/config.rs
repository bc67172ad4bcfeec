// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use squares_context_core::domain::config::EngineConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./sqctx-config.yaml)
        #[arg(short, long, default_value = "./sqctx-config.yaml")]
        output: PathBuf,

        /// Include every setting with its default value
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let manifest = EngineConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;
    let config = &manifest.spec;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. SQCTX_CONFIG_PATH: {}",
            std::env::var("SQCTX_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./sqctx-config.yaml");
        println!("  4. ~/.sqctx/config.yaml");
        println!("  5. /etc/sqctx/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", manifest.metadata.name);
    println!();

    println!("{}", "Refresh:".bold());
    println!("  Interval: {}ms", config.refresh.interval_ms);
    println!("  Fetch timeout: {}ms", config.refresh.fetch_timeout_ms);
    println!("  Listener timeout: {}ms", config.refresh.listener_timeout_ms);
    println!("  Notification queue: {}", config.refresh.notification_queue);
    println!();

    println!("{}", "Financial:".bold());
    println!("  Reserve ratio: {}", config.financial.reserve_ratio);
    println!("  Payout buffer: {}", config.financial.payout_buffer);
    println!(
        "  Board creation minimum: {}",
        config.financial.create_board_min_available
    );
    let risk = &config.financial.risk_thresholds;
    println!(
        "  Risk thresholds: low > {}, medium > {}, high > {}",
        risk.low, risk.medium, risk.high
    );
    println!();

    println!("{}", "Policy:".bold());
    println!("  Unknown actions: {:?}", config.policy.unknown_action);
    println!(
        "  Minimum hours before game: {}",
        config.policy.min_hours_before_game
    );
    if config.policy.fail_closed_when_stale {
        println!(
            "  Stale snapshots: deny financial actions after {} intervals (at least {}ms)",
            config.policy.stale_after_intervals, config.policy.max_snapshot_age_ms
        );
    } else {
        println!("  Stale snapshots: {}", "ignored".yellow());
    }
    println!();

    let window = &config.operational.maintenance_window;
    println!("{}", "Operational:".bold());
    println!(
        "  Maintenance window: {} {:02}:00-{:02}:00",
        window.weekday, window.start_hour, window.end_hour
    );
    println!();

    println!("{}", "Server:".bold());
    println!(
        "  Listen: {}:{}",
        config.server.bind_address, config.server.port
    );
    if config.observability.metrics.enabled {
        println!("  Metrics: port {}", config.observability.metrics.port);
    } else {
        println!("  Metrics: {}", "disabled".dimmed());
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let manifest = EngineConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    manifest
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

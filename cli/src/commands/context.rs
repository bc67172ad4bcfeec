// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Print aggregated context, once or for a number of live cycles

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use squares_context_core::domain::events::ContextEvent;
use squares_context_core::infrastructure::channel_subscriber::ChannelSubscriber;
use squares_context_core::infrastructure::event_bus::EventBusError;
use squares_context_core::{ContextDomain, ContextService, ContextSnapshot};

use crate::embedded::EmbeddedEngine;

#[derive(Args)]
pub struct ContextCommand {
    /// Only print one domain (financial, network, game, security, operational)
    #[arg(value_name = "DOMAIN")]
    pub domain: Option<String>,

    /// Keep aggregating and report this many cycles, published or failed
    #[arg(long, value_name = "CYCLES")]
    pub watch: Option<u32>,

    /// Print YAML instead of JSON
    #[arg(long)]
    pub yaml: bool,
}

pub async fn execute(
    command: ContextCommand,
    config_path: Option<PathBuf>,
    fixture_path: Option<PathBuf>,
) -> Result<()> {
    let domain = command
        .domain
        .as_deref()
        .map(str::parse::<ContextDomain>)
        .transpose()
        .map_err(|e| anyhow!(e))?;

    let engine = EmbeddedEngine::new(config_path, fixture_path)?;

    match command.watch {
        None => {
            let snapshot = engine
                .service
                .refresh_now()
                .await
                .context("Context aggregation failed")?;
            print_snapshot(&snapshot, domain, command.yaml)?;
        }
        Some(cycles) => {
            let summary = watch(&engine.service, cycles, domain, command.yaml).await;
            engine.service.shutdown().await;
            let summary = summary?;
            if summary.published == 0 && summary.failed > 0 {
                anyhow::bail!("All {} watched cycles failed", summary.failed);
            }
            return Ok(());
        }
    }

    engine.service.shutdown().await;
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub published: u32,
    pub failed: u32,
}

/// Run the aggregation loop and report `cycles` outcomes as they happen
pub async fn watch(
    service: &ContextService,
    cycles: u32,
    domain: Option<ContextDomain>,
    yaml: bool,
) -> Result<WatchSummary> {
    let (listener, mut snapshots) = ChannelSubscriber::new("cli-watch", 4);
    let subscription = service.subscribe(Arc::new(listener));
    let mut events = service.subscribe_events();
    service.start_default();

    let mut summary = WatchSummary::default();
    while summary.published + summary.failed < cycles {
        tokio::select! {
            snapshot = snapshots.recv() => {
                let Some(snapshot) = snapshot else { break };
                summary.published += 1;
                print_snapshot(&snapshot, domain, yaml)?;
            }
            event = events.recv() => match event {
                Ok(ContextEvent::CycleFailed { cycle, error, .. }) => {
                    summary.failed += 1;
                    eprintln!(
                        "{} cycle {} failed: {}",
                        "✗".red(),
                        cycle.to_string().bold(),
                        error
                    );
                }
                Ok(_) | Err(EventBusError::Lagged(_)) => {}
                Err(_) => break,
            },
        }
    }

    service.unsubscribe(subscription);
    Ok(summary)
}

fn print_snapshot(snapshot: &ContextSnapshot, domain: Option<ContextDomain>, yaml: bool) -> Result<()> {
    println!(
        "{} cycle {} captured at {}",
        "▶".cyan(),
        snapshot.cycle.to_string().bold(),
        snapshot.captured_at.to_rfc3339()
    );

    let rendered = match (domain, yaml) {
        (Some(domain), false) => serde_json::to_string_pretty(&snapshot.domain(domain))?,
        (Some(domain), true) => serde_yaml::to_string(&snapshot.domain(domain))?,
        (None, false) => serde_json::to_string_pretty(&snapshot.context)?,
        (None, true) => serde_yaml::to_string(&snapshot.context)?,
    };
    println!("{}", rendered);

    Ok(())
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! One-shot policy decision against a single aggregated snapshot

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;
use std::path::PathBuf;

use squares_context_core::{DecisionParams, DecisionResult};

use crate::embedded::EmbeddedEngine;

#[derive(Args)]
pub struct EvaluateCommand {
    /// Action to gate (CREATE_BOARD, PROCESS_PAYOUT, REQUEST_VRF, DEPLOY_CODE, ...)
    #[arg(value_name = "ACTION")]
    pub action: String,

    /// Action parameters as a JSON object
    #[arg(short, long, value_name = "JSON")]
    pub params: Option<String>,

    /// Print the decision as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(
    command: EvaluateCommand,
    config_path: Option<PathBuf>,
    fixture_path: Option<PathBuf>,
) -> Result<()> {
    let params = parse_params(command.params.as_deref())?;

    let engine = EmbeddedEngine::new(config_path, fixture_path)?;
    engine
        .service
        .refresh_now()
        .await
        .context("Context aggregation failed")?;

    let result = engine.service.evaluate(&command.action, &params);
    engine.service.shutdown().await;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_decision(&command.action, &result);
    }

    Ok(())
}

pub fn parse_params(raw: Option<&str>) -> Result<DecisionParams> {
    let Some(raw) = raw else {
        return Ok(DecisionParams::new());
    };

    let value: Value = serde_json::from_str(raw).context("Parameters are not valid JSON")?;
    DecisionParams::try_from(value).map_err(|e| anyhow!(e))
}

fn print_decision(action: &str, result: &DecisionResult) {
    if result.approved {
        println!("{} {}", "✓ APPROVED".green().bold(), action.bold());
    } else {
        println!("{} {}", "✗ DENIED".red().bold(), action.bold());
    }
    println!("  Reason: {}", result.reason);

    if !result.recommendations.is_empty() {
        println!();
        println!("{}", "Recommendations:".bold());
        for recommendation in &result.recommendations {
            println!("  - {}", recommendation);
        }
    }

    if !result.context_used.is_empty() {
        println!();
        println!("{}", "Context used:".bold());
        for (key, value) in &result.context_used {
            println!("  {}: {}", key, value.to_string().dimmed());
        }
    }
}

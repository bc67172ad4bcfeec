// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-process engine construction shared by every command
//!
//! Loads and validates the engine manifest, loads the provider fixture, and
//! wires both into a `ContextService`.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use squares_context_core::domain::config::EngineConfigManifest;
use squares_context_core::infrastructure::fixture_providers::FixtureProviders;
use squares_context_core::{ContextProviders, ContextService};

pub struct EmbeddedEngine {
    pub manifest: EngineConfigManifest,
    pub service: Arc<ContextService>,
    pub providers: Arc<FixtureProviders>,
}

impl EmbeddedEngine {
    /// Must be called from within the Tokio runtime
    pub fn new(config_path: Option<PathBuf>, fixture_path: Option<PathBuf>) -> Result<Self> {
        Self::from_manifest(load_manifest(config_path)?, fixture_path)
    }

    /// Build from an already validated manifest
    pub fn from_manifest(
        manifest: EngineConfigManifest,
        fixture_path: Option<PathBuf>,
    ) -> Result<Self> {
        let providers = match fixture_path {
            Some(path) => {
                info!("Loading provider fixture from {:?}", path);
                Arc::new(FixtureProviders::from_yaml_file(&path)?)
            }
            None => {
                info!("No provider fixture given, serving baseline readings");
                Arc::new(FixtureProviders::default())
            }
        };

        let service = Arc::new(ContextService::new(
            ContextProviders::from_shared(providers.clone()),
            manifest.spec.clone(),
        ));

        Ok(Self {
            manifest,
            service,
            providers,
        })
    }
}

pub fn load_manifest(config_path: Option<PathBuf>) -> Result<EngineConfigManifest> {
    load_manifest_with(config_path, |_| {})
}

/// Load the manifest, apply command-line overrides, then validate the result
pub fn load_manifest_with(
    config_path: Option<PathBuf>,
    overrides: impl FnOnce(&mut EngineConfigManifest),
) -> Result<EngineConfigManifest> {
    let mut manifest = EngineConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    overrides(&mut manifest);

    manifest
        .validate()
        .context("Configuration validation failed")?;

    Ok(manifest)
}

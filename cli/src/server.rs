// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Foreground engine server
//!
//! Starts periodic aggregation, serves the HTTP API until SIGINT/SIGTERM, then
//! drains the engine.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use squares_context_core::domain::config::MetricsConfig;
use squares_context_core::presentation::api;

use crate::embedded::{load_manifest_with, EmbeddedEngine};

pub struct ServerOptions {
    pub config_path: Option<PathBuf>,
    pub fixture_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub interval_ms: Option<u64>,
}

pub async fn start_server(options: ServerOptions) -> Result<()> {
    let manifest = load_manifest_with(options.config_path, |manifest| {
        if let Some(interval_ms) = options.interval_ms {
            manifest.spec.refresh.interval_ms = interval_ms;
        }
    })?;
    let engine = EmbeddedEngine::from_manifest(manifest, options.fixture_path)?;
    let config = engine.service.config();

    info!(
        name = %engine.manifest.metadata.name,
        "Context engine configuration loaded"
    );

    install_metrics_exporter(&config.observability.metrics)?;

    engine.service.start_default();

    let host = options
        .host
        .unwrap_or_else(|| config.server.bind_address.clone());
    let port = options.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Context engine listening on http://{}", addr);

    axum::serve(listener, api::app(engine.service.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    engine.service.shutdown().await;
    info!("Context engine stopped");

    Ok(())
}

fn install_metrics_exporter(metrics: &MetricsConfig) -> Result<()> {
    if !metrics.enabled {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], metrics.port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus metrics exposed on http://{}/metrics", addr);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(interval_ms: u64) -> tempfile::NamedTempFile {
        let mut config = tempfile::NamedTempFile::new().unwrap();
        write!(
            config,
            "apiVersion: squares.context/v1\nkind: ContextEngineConfig\nmetadata:\n  name: test\nspec:\n  refresh:\n    interval_ms: {}\n",
            interval_ms
        )
        .unwrap();
        config
    }

    fn with_interval(path: PathBuf, interval_ms: u64) -> Result<u64> {
        let manifest = load_manifest_with(Some(path), |manifest| {
            manifest.spec.refresh.interval_ms = interval_ms;
        })?;
        Ok(manifest.spec.refresh.interval_ms)
    }

    #[test]
    fn test_interval_override_is_validated() {
        let config = config_file(5000);
        let path = config.path().to_path_buf();

        assert_eq!(with_interval(path.clone(), 60_000).unwrap(), 60_000);

        // Shorter than the configured fetch and listener timeouts
        assert!(with_interval(path.clone(), 1500).is_err());
        assert!(with_interval(path, 0).is_err());
    }
}

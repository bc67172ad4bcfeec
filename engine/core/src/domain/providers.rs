// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Provider Interfaces
//!
//! Pull-style read contracts for the five data sources the engine aggregates.
//! The engine owns no business logic for producing these values; concrete
//! implementations live outside the engine (ledgers, RPC clients, threat
//! detectors) or in `crate::infrastructure::fixture_providers` for development
//! and tests.
//!
//! | Trait | Domain |
//! |-------|--------|
//! | `FinancialProvider` | treasury and pending payouts |
//! | `NetworkProvider` | slot, fees, throughput, randomness service |
//! | `GameProvider` | games and boards |
//! | `SecurityProvider` | threats and wallet lists |
//! | `OperationalProvider` | agents, incidents, performance |
//!
//! Any `Err` returned from any method fails the whole aggregation cycle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::context::{
    AgentStatus, AttackRecord, BoardSummary, GameSummary, IncidentInfo, PerformanceMetrics,
    RandomnessStatus, ThreatInfo,
};

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid provider data: {0}")]
    InvalidData(String),

    #[error("Provider error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotAndFee {
    pub slot: u64,
    pub average_fee: f64,
}

#[async_trait]
pub trait FinancialProvider: Send + Sync {
    async fn current_treasury_balance(&self) -> Result<f64, ProviderError>;

    async fn current_pending_payouts(&self) -> Result<f64, ProviderError>;
}

#[async_trait]
pub trait NetworkProvider: Send + Sync {
    async fn current_slot_and_fee(&self) -> Result<SlotAndFee, ProviderError>;

    /// Transactions per second
    async fn estimated_throughput(&self) -> Result<f64, ProviderError>;

    async fn randomness_queue_depth(&self) -> Result<u32, ProviderError>;

    /// Seconds until a new randomness request is expected to be fulfilled
    async fn randomness_estimated_wait(&self) -> Result<f64, ProviderError>;

    async fn randomness_service_health(&self) -> Result<RandomnessStatus, ProviderError>;
}

#[async_trait]
pub trait GameProvider: Send + Sync {
    async fn active_games(&self) -> Result<Vec<GameSummary>, ProviderError>;

    async fn upcoming_games(&self) -> Result<Vec<GameSummary>, ProviderError>;

    async fn active_boards(&self) -> Result<Vec<BoardSummary>, ProviderError>;
}

#[async_trait]
pub trait SecurityProvider: Send + Sync {
    async fn detect_threats(&self) -> Result<Vec<ThreatInfo>, ProviderError>;

    async fn suspicious_wallets(&self) -> Result<BTreeSet<String>, ProviderError>;

    async fn recent_attacks(&self) -> Result<Vec<AttackRecord>, ProviderError>;

    async fn blacklisted_wallets(&self) -> Result<BTreeSet<String>, ProviderError>;

    async fn whitelisted_wallets(&self) -> Result<BTreeSet<String>, ProviderError>;
}

#[async_trait]
pub trait OperationalProvider: Send + Sync {
    async fn agent_statuses(&self) -> Result<BTreeMap<String, AgentStatus>, ProviderError>;

    async fn active_incidents(&self) -> Result<Vec<IncidentInfo>, ProviderError>;

    async fn performance_metrics(&self) -> Result<PerformanceMetrics, ProviderError>;

    async fn is_deployment_active(&self) -> Result<bool, ProviderError>;
}

/// The provider set one engine instance aggregates over
#[derive(Clone)]
pub struct ContextProviders {
    pub financial: Arc<dyn FinancialProvider>,
    pub network: Arc<dyn NetworkProvider>,
    pub game: Arc<dyn GameProvider>,
    pub security: Arc<dyn SecurityProvider>,
    pub operational: Arc<dyn OperationalProvider>,
}

impl ContextProviders {
    /// Use one object that implements every provider trait for all five domains
    pub fn from_shared<P>(provider: Arc<P>) -> Self
    where
        P: FinancialProvider
            + NetworkProvider
            + GameProvider
            + SecurityProvider
            + OperationalProvider
            + 'static,
    {
        Self {
            financial: provider.clone(),
            network: provider.clone(),
            game: provider.clone(),
            security: provider.clone(),
            operational: provider,
        }
    }
}

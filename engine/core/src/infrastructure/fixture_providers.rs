// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Fixture Providers
//!
//! In-memory implementation of all five provider traits backed by one
//! [`ProviderFixture`]. The fixture can be loaded from YAML, edited while the
//! engine runs, and told to fail or stall individual domains so cycle-failure
//! and timeout paths can be exercised without real collaborators.
//!
//! The default fixture reproduces the platform's baseline readings: 500 in the
//! treasury with 50 pending, 2500 TPS, an operational randomness queue five
//! deep, no games, no threats, one healthy performance profile.

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::domain::context::{
    AgentStatus, AttackRecord, BoardSummary, ContextDomain, GameSummary, IncidentInfo,
    PerformanceMetrics, RandomnessStatus, ThreatInfo,
};
use crate::domain::providers::{
    FinancialProvider, GameProvider, NetworkProvider, OperationalProvider, ProviderError,
    SecurityProvider, SlotAndFee,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialFixture {
    pub treasury_balance: f64,
    pub pending_payouts: f64,
}

impl Default for FinancialFixture {
    fn default() -> Self {
        Self {
            treasury_balance: 500.0,
            pending_payouts: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkFixture {
    pub slot: u64,
    pub average_fee: f64,
    pub tps: f64,
    pub vrf_queue_depth: u32,
    pub vrf_estimated_wait: f64,
    pub switchboard_status: RandomnessStatus,
}

impl Default for NetworkFixture {
    fn default() -> Self {
        Self {
            slot: 0,
            average_fee: 5000.0,
            tps: 2500.0,
            vrf_queue_depth: 5,
            vrf_estimated_wait: 30.0,
            switchboard_status: RandomnessStatus::Operational,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameFixture {
    #[serde(default)]
    pub active_games: Vec<GameSummary>,
    #[serde(default)]
    pub upcoming_games: Vec<GameSummary>,
    #[serde(default)]
    pub boards: Vec<BoardSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityFixture {
    #[serde(default)]
    pub threats: Vec<ThreatInfo>,
    #[serde(default)]
    pub suspicious_wallets: BTreeSet<String>,
    #[serde(default)]
    pub recent_attacks: Vec<AttackRecord>,
    #[serde(default)]
    pub blacklisted_wallets: BTreeSet<String>,
    #[serde(default)]
    pub whitelisted_wallets: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationalFixture {
    pub agents: BTreeMap<String, AgentStatus>,
    pub incidents: Vec<IncidentInfo>,
    pub metrics: PerformanceMetrics,
    pub deployment_active: bool,
}

impl Default for OperationalFixture {
    fn default() -> Self {
        Self {
            agents: BTreeMap::new(),
            incidents: Vec::new(),
            metrics: PerformanceMetrics {
                avg_response_time: 100.0,
                error_rate: 0.01,
                success_rate: 0.99,
                tps: 50.0,
                cpu_usage: 45.0,
                memory_usage: 60.0,
            },
            deployment_active: false,
        }
    }
}

/// Raw readings for every domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderFixture {
    #[serde(default)]
    pub financial: FinancialFixture,
    #[serde(default)]
    pub network: NetworkFixture,
    #[serde(default)]
    pub game: GameFixture,
    #[serde(default)]
    pub security: SecurityFixture,
    #[serde(default)]
    pub operational: OperationalFixture,
}

impl ProviderFixture {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read provider fixture {:?}", path))?;
        let fixture = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse provider fixture {:?}", path))?;
        Ok(fixture)
    }
}

/// Provider set serving a mutable [`ProviderFixture`]
#[derive(Default)]
pub struct FixtureProviders {
    fixture: RwLock<ProviderFixture>,
    failing: RwLock<HashSet<ContextDomain>>,
    delays: RwLock<HashMap<ContextDomain, Duration>>,
}

impl FixtureProviders {
    pub fn new(fixture: ProviderFixture) -> Self {
        Self {
            fixture: RwLock::new(fixture),
            failing: RwLock::new(HashSet::new()),
            delays: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(ProviderFixture::from_yaml_file(path)?))
    }

    /// Edit the readings served from the next call on
    pub fn update(&self, edit: impl FnOnce(&mut ProviderFixture)) {
        edit(&mut self.fixture.write());
    }

    pub fn fixture(&self) -> ProviderFixture {
        self.fixture.read().clone()
    }

    /// Make every read of `domain` fail until [`heal`](Self::heal) is called
    pub fn fail(&self, domain: ContextDomain) {
        self.failing.write().insert(domain);
    }

    pub fn heal(&self, domain: ContextDomain) {
        self.failing.write().remove(&domain);
    }

    /// Delay every read of `domain`; used to exercise fetch timeouts
    pub fn stall(&self, domain: ContextDomain, delay: Duration) {
        self.delays.write().insert(domain, delay);
    }

    pub fn unstall(&self, domain: ContextDomain) {
        self.delays.write().remove(&domain);
    }

    async fn gate(&self, domain: ContextDomain) -> Result<(), ProviderError> {
        let delay = self.delays.read().get(&domain).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.read().contains(&domain) {
            return Err(ProviderError::Unavailable(format!(
                "{} fixture configured to fail",
                domain
            )));
        }
        Ok(())
    }

    async fn read<T>(
        &self,
        domain: ContextDomain,
        select: impl FnOnce(&ProviderFixture) -> T,
    ) -> Result<T, ProviderError> {
        self.gate(domain).await?;
        Ok(select(&self.fixture.read()))
    }
}

#[async_trait]
impl FinancialProvider for FixtureProviders {
    async fn current_treasury_balance(&self) -> Result<f64, ProviderError> {
        self.read(ContextDomain::Financial, |f| f.financial.treasury_balance)
            .await
    }

    async fn current_pending_payouts(&self) -> Result<f64, ProviderError> {
        self.read(ContextDomain::Financial, |f| f.financial.pending_payouts)
            .await
    }
}

#[async_trait]
impl NetworkProvider for FixtureProviders {
    async fn current_slot_and_fee(&self) -> Result<SlotAndFee, ProviderError> {
        self.read(ContextDomain::Network, |f| SlotAndFee {
            slot: f.network.slot,
            average_fee: f.network.average_fee,
        })
        .await
    }

    async fn estimated_throughput(&self) -> Result<f64, ProviderError> {
        self.read(ContextDomain::Network, |f| f.network.tps).await
    }

    async fn randomness_queue_depth(&self) -> Result<u32, ProviderError> {
        self.read(ContextDomain::Network, |f| f.network.vrf_queue_depth)
            .await
    }

    async fn randomness_estimated_wait(&self) -> Result<f64, ProviderError> {
        self.read(ContextDomain::Network, |f| f.network.vrf_estimated_wait)
            .await
    }

    async fn randomness_service_health(&self) -> Result<RandomnessStatus, ProviderError> {
        self.read(ContextDomain::Network, |f| f.network.switchboard_status)
            .await
    }
}

#[async_trait]
impl GameProvider for FixtureProviders {
    async fn active_games(&self) -> Result<Vec<GameSummary>, ProviderError> {
        self.read(ContextDomain::Game, |f| f.game.active_games.clone())
            .await
    }

    async fn upcoming_games(&self) -> Result<Vec<GameSummary>, ProviderError> {
        self.read(ContextDomain::Game, |f| f.game.upcoming_games.clone())
            .await
    }

    async fn active_boards(&self) -> Result<Vec<BoardSummary>, ProviderError> {
        self.read(ContextDomain::Game, |f| f.game.boards.clone()).await
    }
}

#[async_trait]
impl SecurityProvider for FixtureProviders {
    async fn detect_threats(&self) -> Result<Vec<ThreatInfo>, ProviderError> {
        self.read(ContextDomain::Security, |f| f.security.threats.clone())
            .await
    }

    async fn suspicious_wallets(&self) -> Result<BTreeSet<String>, ProviderError> {
        self.read(ContextDomain::Security, |f| {
            f.security.suspicious_wallets.clone()
        })
        .await
    }

    async fn recent_attacks(&self) -> Result<Vec<AttackRecord>, ProviderError> {
        self.read(ContextDomain::Security, |f| f.security.recent_attacks.clone())
            .await
    }

    async fn blacklisted_wallets(&self) -> Result<BTreeSet<String>, ProviderError> {
        self.read(ContextDomain::Security, |f| {
            f.security.blacklisted_wallets.clone()
        })
        .await
    }

    async fn whitelisted_wallets(&self) -> Result<BTreeSet<String>, ProviderError> {
        self.read(ContextDomain::Security, |f| {
            f.security.whitelisted_wallets.clone()
        })
        .await
    }
}

#[async_trait]
impl OperationalProvider for FixtureProviders {
    async fn agent_statuses(&self) -> Result<BTreeMap<String, AgentStatus>, ProviderError> {
        self.read(ContextDomain::Operational, |f| f.operational.agents.clone())
            .await
    }

    async fn active_incidents(&self) -> Result<Vec<IncidentInfo>, ProviderError> {
        self.read(ContextDomain::Operational, |f| {
            f.operational.incidents.clone()
        })
        .await
    }

    async fn performance_metrics(&self) -> Result<PerformanceMetrics, ProviderError> {
        self.read(ContextDomain::Operational, |f| f.operational.metrics)
            .await
    }

    async fn is_deployment_active(&self) -> Result<bool, ProviderError> {
        self.read(ContextDomain::Operational, |f| {
            f.operational.deployment_active
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_fixture_readings() {
        let providers = FixtureProviders::default();

        assert_eq!(providers.current_treasury_balance().await.unwrap(), 500.0);
        assert_eq!(providers.current_pending_payouts().await.unwrap(), 50.0);
        assert_eq!(providers.estimated_throughput().await.unwrap(), 2500.0);
        assert_eq!(
            providers.randomness_service_health().await.unwrap(),
            RandomnessStatus::Operational
        );
        assert!(providers.active_games().await.unwrap().is_empty());
        assert!(!providers.is_deployment_active().await.unwrap());
    }

    #[tokio::test]
    async fn test_fail_and_heal_domain() {
        let providers = FixtureProviders::default();
        providers.fail(ContextDomain::Security);

        assert!(matches!(
            providers.detect_threats().await,
            Err(ProviderError::Unavailable(_))
        ));
        // Other domains are unaffected
        assert!(providers.current_treasury_balance().await.is_ok());

        providers.heal(ContextDomain::Security);
        assert!(providers.detect_threats().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_is_visible_to_next_read() {
        let providers = FixtureProviders::default();
        providers.update(|f| {
            f.security.suspicious_wallets.insert("W1".to_string());
            f.financial.treasury_balance = 900.0;
        });

        assert!(providers.suspicious_wallets().await.unwrap().contains("W1"));
        assert_eq!(providers.current_treasury_balance().await.unwrap(), 900.0);
    }

    #[test]
    fn test_fixture_yaml_defaults() {
        let yaml = r#"
financial:
  treasury_balance: 1200
  pending_payouts: 100
security:
  suspicious_wallets: [W9]
"#;
        let fixture: ProviderFixture = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(fixture.financial.treasury_balance, 1200.0);
        assert!(fixture.security.suspicious_wallets.contains("W9"));
        assert_eq!(fixture.network, NetworkFixture::default());
        assert_eq!(fixture.operational.metrics.cpu_usage, 45.0);
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # System Context Snapshot
//!
//! The value types that make up one aggregation cycle's view of the platform:
//!
//! - [`SystemContext`]: the five domain records captured in the same cycle.
//! - [`ContextSnapshot`]: a `SystemContext` stamped with its cycle number and
//!   capture time; this is what the store hands out behind an `Arc`.
//! - [`ContextDomain`] / [`DomainContext`]: per-domain addressing.
//!
//! Snapshots are built complete and never mutated afterwards. Derived fields
//! (risk level, congestion, threat level, system health) are computed by the
//! `derive` constructors from raw readings of the same cycle only.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::domain::config::{FinancialPolicy, GamePolicy, NetworkPolicy, OperationalPolicy};
use crate::domain::derivation;

/// Four-level ordinal used for financial risk, threat level and incident severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

pub type RiskLevel = Severity;
pub type ThreatLevel = Severity;

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Congestion {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for Congestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Congestion::Low => "LOW",
            Congestion::Medium => "MEDIUM",
            Congestion::High => "HIGH",
        };
        f.write_str(label)
    }
}

/// Health of the randomness (VRF) service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RandomnessStatus {
    #[default]
    Operational,
    Degraded,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemHealth {
    #[default]
    Healthy,
    Degraded,
    Critical,
}

impl fmt::Display for SystemHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SystemHealth::Healthy => "HEALTHY",
            SystemHealth::Degraded => "DEGRADED",
            SystemHealth::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    Online,
    Offline,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Active,
    Mitigated,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatKind {
    Ddos,
    Sybil,
    WashTrade,
    Exploit,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter: Option<String>,
    #[serde(default)]
    pub board_value: f64,
    #[serde(default)]
    pub fill_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatInfo {
    #[serde(rename = "type")]
    pub kind: ThreatKind,
    pub severity: Severity,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub affected_components: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub prevented: bool,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub name: String,
    pub status: AgentState,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub task_queue: u32,
    #[serde(default)]
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentInfo {
    pub id: String,
    pub severity: Severity,
    pub description: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub affected_services: Vec<String>,
    pub status: IncidentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Average response latency in milliseconds
    pub avg_response_time: f64,
    pub error_rate: f64,
    pub success_rate: f64,
    pub tps: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialContext {
    pub treasury_balance: f64,
    pub pending_payouts: f64,
    pub available_balance: f64,
    pub minimum_reserve: f64,
    pub projected_balance_24h: f64,
    pub can_create_board: bool,
    pub can_process_payout: bool,
    pub risk_level: RiskLevel,
}

impl FinancialContext {
    pub fn derive(treasury_balance: f64, pending_payouts: f64, policy: &FinancialPolicy) -> Self {
        let minimum_reserve = treasury_balance * policy.reserve_ratio;
        let available_balance = treasury_balance - pending_payouts - minimum_reserve;

        Self {
            treasury_balance,
            pending_payouts,
            available_balance,
            minimum_reserve,
            projected_balance_24h: treasury_balance - pending_payouts * policy.payout_buffer,
            can_create_board: available_balance > policy.create_board_min_available,
            can_process_payout: available_balance > 0.0,
            risk_level: derivation::financial_risk(
                available_balance,
                treasury_balance,
                &policy.risk_thresholds,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkContext {
    /// Network throughput in transactions per second
    pub tps: f64,
    pub current_slot: u64,
    pub average_fee: f64,
    pub congestion: Congestion,
    pub vrf_queue_depth: u32,
    /// Estimated randomness fulfilment wait, in seconds
    pub vrf_estimated_wait: f64,
    /// `None` when now is already a good time to act
    pub optimal_action_time: Option<DateTime<Utc>>,
    pub switchboard_status: RandomnessStatus,
}

/// Raw network readings for one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkReadings {
    pub tps: f64,
    pub current_slot: u64,
    pub average_fee: f64,
    pub vrf_queue_depth: u32,
    pub vrf_estimated_wait: f64,
    pub switchboard_status: RandomnessStatus,
}

impl NetworkContext {
    pub fn derive(readings: NetworkReadings, now: DateTime<Utc>, policy: &NetworkPolicy) -> Self {
        let congestion = derivation::congestion(readings.tps, readings.average_fee, policy);
        let optimal_action_time = match congestion {
            Congestion::Low => None,
            _ => Some(now + ChronoDuration::hours(policy.optimal_delay_hours)),
        };

        Self {
            tps: readings.tps,
            current_slot: readings.current_slot,
            average_fee: readings.average_fee,
            congestion,
            vrf_queue_depth: readings.vrf_queue_depth,
            vrf_estimated_wait: readings.vrf_estimated_wait,
            optimal_action_time,
            switchboard_status: readings.switchboard_status,
        }
    }
}

/// Minimal board view needed by the game domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub board_id: String,
    pub sold_squares: u32,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameContext {
    pub active_games: Vec<GameSummary>,
    pub upcoming_games: Vec<GameSummary>,
    pub active_boards: usize,
    pub total_squares_sold: u64,
    /// Percentage of squares sold across active boards
    pub fill_rate: f64,
    pub peak_hours: bool,
    pub current_quarter: Option<String>,
    pub high_stakes_active: bool,
}

impl GameContext {
    pub fn derive(
        active_games: Vec<GameSummary>,
        upcoming_games: Vec<GameSummary>,
        boards: &[BoardSummary],
        local_now: &(impl Timelike + Datelike),
        policy: &GamePolicy,
    ) -> Self {
        let current_quarter = derivation::current_quarter(&active_games);

        Self {
            active_boards: boards.len(),
            total_squares_sold: boards.iter().map(|b| u64::from(b.sold_squares)).sum(),
            fill_rate: derivation::fill_rate(boards, policy.squares_per_board),
            peak_hours: derivation::is_peak_hour(local_now.hour(), &policy.peak_hours),
            current_quarter,
            high_stakes_active: boards
                .iter()
                .any(|b| b.total_value > policy.high_stakes_board_value),
            active_games,
            upcoming_games,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    pub threat_level: ThreatLevel,
    pub active_threats: Vec<ThreatInfo>,
    pub suspicious_wallets: BTreeSet<String>,
    pub recent_attacks: Vec<AttackRecord>,
    pub blacklisted_wallets: BTreeSet<String>,
    pub whitelisted_wallets: BTreeSet<String>,
    pub anomaly_detected: bool,
}

impl SecurityContext {
    pub fn derive(
        threats: Vec<ThreatInfo>,
        suspicious_wallets: BTreeSet<String>,
        recent_attacks: Vec<AttackRecord>,
        blacklisted_wallets: BTreeSet<String>,
        whitelisted_wallets: BTreeSet<String>,
    ) -> Self {
        Self {
            threat_level: derivation::threat_level(&threats),
            anomaly_detected: !threats.is_empty(),
            active_threats: threats,
            suspicious_wallets,
            recent_attacks,
            blacklisted_wallets,
            whitelisted_wallets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalContext {
    pub system_health: SystemHealth,
    pub agent_statuses: BTreeMap<String, AgentStatus>,
    pub active_incidents: Vec<IncidentInfo>,
    pub performance_metrics: PerformanceMetrics,
    pub maintenance_window: bool,
    pub deployment_in_progress: bool,
}

impl OperationalContext {
    pub fn derive(
        agent_statuses: BTreeMap<String, AgentStatus>,
        active_incidents: Vec<IncidentInfo>,
        performance_metrics: PerformanceMetrics,
        deployment_in_progress: bool,
        local_now: &(impl Timelike + Datelike),
        policy: &OperationalPolicy,
    ) -> Self {
        Self {
            system_health: derivation::system_health(
                &performance_metrics,
                &active_incidents,
                policy,
            ),
            maintenance_window: derivation::in_maintenance_window(
                local_now,
                &policy.maintenance_window,
            ),
            agent_statuses,
            active_incidents,
            performance_metrics,
            deployment_in_progress,
        }
    }
}

/// The five domain records captured in one cycle.
///
/// `Default` is the conservative pre-first-cycle context: zero balances (so
/// neither boards nor payouts are possible), risk LOW, congestion LOW, health
/// HEALTHY.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemContext {
    pub financial: FinancialContext,
    pub network: NetworkContext,
    pub game: GameContext,
    pub security: SecurityContext,
    pub operational: OperationalContext,
}

impl SystemContext {
    pub fn domain(&self, domain: ContextDomain) -> DomainContext {
        match domain {
            ContextDomain::Financial => DomainContext::Financial(self.financial.clone()),
            ContextDomain::Network => DomainContext::Network(self.network.clone()),
            ContextDomain::Game => DomainContext::Game(self.game.clone()),
            ContextDomain::Security => DomainContext::Security(self.security.clone()),
            ContextDomain::Operational => DomainContext::Operational(self.operational.clone()),
        }
    }
}

/// A published `SystemContext` with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    /// Aggregation cycle that produced this snapshot; 0 for the initial defaults
    pub cycle: u64,
    pub captured_at: DateTime<Utc>,
    pub context: SystemContext,
}

impl ContextSnapshot {
    pub fn initial() -> Self {
        Self {
            cycle: 0,
            captured_at: Utc::now(),
            context: SystemContext::default(),
        }
    }

    pub fn is_initial(&self) -> bool {
        self.cycle == 0
    }

    /// Age relative to `now`; clock skew into the future reads as zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.captured_at).to_std().unwrap_or_default()
    }
}

impl std::ops::Deref for ContextSnapshot {
    type Target = SystemContext;

    fn deref(&self) -> &SystemContext {
        &self.context
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextDomain {
    Financial,
    Network,
    Game,
    Security,
    Operational,
}

impl ContextDomain {
    pub const ALL: [ContextDomain; 5] = [
        ContextDomain::Financial,
        ContextDomain::Network,
        ContextDomain::Game,
        ContextDomain::Security,
        ContextDomain::Operational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextDomain::Financial => "financial",
            ContextDomain::Network => "network",
            ContextDomain::Game => "game",
            ContextDomain::Security => "security",
            ContextDomain::Operational => "operational",
        }
    }
}

impl fmt::Display for ContextDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContextDomain::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown context domain '{}'", s))
    }
}

/// One domain record, detached from its snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainContext {
    Financial(FinancialContext),
    Network(NetworkContext),
    Game(GameContext),
    Security(SecurityContext),
    Operational(OperationalContext),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_financial_derivation_matches_reserve_policy() {
        let ctx = FinancialContext::derive(500.0, 50.0, &FinancialPolicy::default());

        assert_eq!(ctx.minimum_reserve, 100.0);
        assert_eq!(ctx.available_balance, 350.0);
        assert!((ctx.projected_balance_24h - 440.0).abs() < 1e-9);
        assert!(ctx.can_create_board);
        assert!(ctx.can_process_payout);
        assert_eq!(ctx.risk_level, Severity::Low);
    }

    #[test]
    fn test_financial_derivation_blocks_when_drained() {
        let ctx = FinancialContext::derive(100.0, 90.0, &FinancialPolicy::default());

        assert!(ctx.available_balance < 0.0);
        assert!(!ctx.can_create_board);
        assert!(!ctx.can_process_payout);
        assert_eq!(ctx.risk_level, Severity::Critical);
    }

    #[test]
    fn test_network_optimal_time_only_when_congested() {
        let now = Utc.with_ymd_and_hms(2026, 2, 8, 18, 0, 0).unwrap();
        let mut readings = NetworkReadings {
            tps: 3500.0,
            current_slot: 42,
            average_fee: 5000.0,
            vrf_queue_depth: 5,
            vrf_estimated_wait: 30.0,
            switchboard_status: RandomnessStatus::Operational,
        };

        let calm = NetworkContext::derive(readings.clone(), now, &NetworkPolicy::default());
        assert_eq!(calm.congestion, Congestion::Low);
        assert_eq!(calm.optimal_action_time, None);

        readings.tps = 1500.0;
        let busy = NetworkContext::derive(readings, now, &NetworkPolicy::default());
        assert_eq!(busy.congestion, Congestion::High);
        assert_eq!(busy.optimal_action_time, Some(now + ChronoDuration::hours(2)));
    }

    #[test]
    fn test_game_derivation() {
        let kickoff = Utc.with_ymd_and_hms(2026, 2, 8, 23, 30, 0).unwrap();
        let live = GameSummary {
            game_id: "sb-lx".to_string(),
            home_team: "KC".to_string(),
            away_team: "PHI".to_string(),
            start_time: kickoff,
            current_score: Some(Score { home: 7, away: 3 }),
            quarter: Some("Q2".to_string()),
            board_value: 1500.0,
            fill_rate: 80.0,
        };
        let boards = vec![
            BoardSummary {
                board_id: "b1".to_string(),
                sold_squares: 80,
                total_value: 1500.0,
            },
            BoardSummary {
                board_id: "b2".to_string(),
                sold_squares: 20,
                total_value: 200.0,
            },
        ];
        let local = NaiveDate::from_ymd_opt(2026, 2, 8)
            .unwrap()
            .and_hms_opt(19, 15, 0)
            .unwrap();

        let ctx = GameContext::derive(vec![live], vec![], &boards, &local, &GamePolicy::default());

        assert_eq!(ctx.active_boards, 2);
        assert_eq!(ctx.total_squares_sold, 100);
        assert_eq!(ctx.fill_rate, 50.0);
        assert!(ctx.peak_hours);
        assert_eq!(ctx.current_quarter.as_deref(), Some("Q2"));
        assert!(ctx.high_stakes_active);
    }

    #[test]
    fn test_security_derivation_flags_anomaly() {
        let threat = ThreatInfo {
            kind: ThreatKind::Sybil,
            severity: Severity::Medium,
            description: "cluster of fresh wallets".to_string(),
            timestamp: Utc::now(),
            affected_components: vec!["boards".to_string()],
        };

        let ctx = SecurityContext::derive(
            vec![threat],
            BTreeSet::new(),
            vec![],
            BTreeSet::new(),
            BTreeSet::new(),
        );
        assert_eq!(ctx.threat_level, Severity::Medium);
        assert!(ctx.anomaly_detected);

        let quiet = SecurityContext::derive(
            vec![],
            BTreeSet::new(),
            vec![],
            BTreeSet::new(),
            BTreeSet::new(),
        );
        assert_eq!(quiet.threat_level, Severity::Low);
        assert!(!quiet.anomaly_detected);
    }

    #[test]
    fn test_initial_snapshot_is_deny_leaning() {
        let snapshot = ContextSnapshot::initial();

        assert!(snapshot.is_initial());
        assert!(!snapshot.financial.can_create_board);
        assert!(!snapshot.financial.can_process_payout);
        assert_eq!(snapshot.financial.risk_level, Severity::Low);
        assert_eq!(snapshot.network.congestion, Congestion::Low);
        assert_eq!(snapshot.operational.system_health, SystemHealth::Healthy);
    }

    #[test]
    fn test_domain_parsing() {
        assert_eq!("Security".parse::<ContextDomain>(), Ok(ContextDomain::Security));
        assert!("weather".parse::<ContextDomain>().is_err());
        assert_eq!(ContextDomain::Operational.to_string(), "operational");
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Engine Configuration Types
//
// Defines the configuration manifest for the context engine, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Refresh cadence and per-fetch timeouts
// - Business thresholds used by the derived metrics
// - Policy hardening switches (unknown actions, stale snapshots)
// - HTTP server and observability settings

use anyhow::Context;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_VERSION: &str = "squares.context/v1";
pub const KIND: &str = "ContextEngineConfig";

/// Top-level Kubernetes-style engine configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfigManifest {
    /// API version (must be "squares.context/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ContextEngineConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable deployment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Engine configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub financial: FinancialPolicy,

    #[serde(default)]
    pub network: NetworkPolicy,

    #[serde(default)]
    pub game: GamePolicy,

    #[serde(default)]
    pub operational: OperationalPolicy,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Aggregation period in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Upper bound for a single domain fetch; a timeout fails the cycle
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Capacity of the queue between the aggregator and the notification dispatcher
    #[serde(default = "default_notification_queue")]
    pub notification_queue: usize,

    /// Upper bound for one listener callback
    #[serde(default = "default_listener_timeout_ms")]
    pub listener_timeout_ms: u64,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn listener_timeout(&self) -> Duration {
        Duration::from_millis(self.listener_timeout_ms)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            notification_queue: default_notification_queue(),
            listener_timeout_ms: default_listener_timeout_ms(),
        }
    }
}

/// Ratio boundaries for the financial risk level.
/// A ratio strictly above `low` is LOW, above `medium` MEDIUM, above `high` HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 0.5,
            medium: 0.3,
            high: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialPolicy {
    /// Fraction of the treasury held back as minimum reserve
    #[serde(default = "default_reserve_ratio")]
    pub reserve_ratio: f64,

    /// Multiplier applied to pending payouts for the 24h projection
    #[serde(default = "default_payout_buffer")]
    pub payout_buffer: f64,

    /// Available balance required before a new board may be created
    #[serde(default = "default_create_board_min_available")]
    pub create_board_min_available: f64,

    #[serde(default)]
    pub risk_thresholds: RiskThresholds,
}

impl Default for FinancialPolicy {
    fn default() -> Self {
        Self {
            reserve_ratio: default_reserve_ratio(),
            payout_buffer: default_payout_buffer(),
            create_board_min_available: default_create_board_min_available(),
            risk_thresholds: RiskThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkPolicy {
    #[serde(default = "default_low_congestion_tps")]
    pub low_congestion_min_tps: f64,

    #[serde(default = "default_low_congestion_fee")]
    pub low_congestion_max_fee: f64,

    #[serde(default = "default_medium_congestion_tps")]
    pub medium_congestion_min_tps: f64,

    #[serde(default = "default_medium_congestion_fee")]
    pub medium_congestion_max_fee: f64,

    /// How far ahead the optimal action time is placed when conditions are poor
    #[serde(default = "default_optimal_delay_hours")]
    pub optimal_delay_hours: i64,
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self {
            low_congestion_min_tps: default_low_congestion_tps(),
            low_congestion_max_fee: default_low_congestion_fee(),
            medium_congestion_min_tps: default_medium_congestion_tps(),
            medium_congestion_max_fee: default_medium_congestion_fee(),
            optimal_delay_hours: default_optimal_delay_hours(),
        }
    }
}

/// Inclusive range of local wall-clock hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub start: u32,
    pub end: u32,
}

impl HourRange {
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamePolicy {
    #[serde(default = "default_squares_per_board")]
    pub squares_per_board: u32,

    /// Board value above which the high-stakes flag is raised
    #[serde(default = "default_high_stakes_board_value")]
    pub high_stakes_board_value: f64,

    #[serde(default = "default_peak_hours")]
    pub peak_hours: Vec<HourRange>,
}

impl Default for GamePolicy {
    fn default() -> Self {
        Self {
            squares_per_board: default_squares_per_board(),
            high_stakes_board_value: default_high_stakes_board_value(),
            peak_hours: default_peak_hours(),
        }
    }
}

/// Weekly maintenance window; `end_hour` is exclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub weekday: Weekday,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for MaintenanceWindow {
    fn default() -> Self {
        Self {
            weekday: Weekday::Tue,
            start_hour: 2,
            end_hour: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalPolicy {
    #[serde(default = "default_max_error_rate")]
    pub max_error_rate: f64,

    #[serde(default = "default_max_utilization")]
    pub max_cpu_percent: f64,

    #[serde(default = "default_max_utilization")]
    pub max_memory_percent: f64,

    #[serde(default)]
    pub maintenance_window: MaintenanceWindow,
}

impl Default for OperationalPolicy {
    fn default() -> Self {
        Self {
            max_error_rate: default_max_error_rate(),
            max_cpu_percent: default_max_utilization(),
            max_memory_percent: default_max_utilization(),
            maintenance_window: MaintenanceWindow::default(),
        }
    }
}

/// What the evaluator answers for actions without a rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownActionPolicy {
    #[default]
    Allow,
    Deny,
}

impl std::str::FromStr for UnknownActionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(format!("unknown action policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_min_hours_before_game")]
    pub min_hours_before_game: f64,

    /// Payouts below this amount are batching candidates under congestion
    #[serde(default = "default_batch_payout_below")]
    pub batch_payout_below: f64,

    #[serde(default = "default_vrf_queue_alert")]
    pub vrf_queue_alert: u32,

    #[serde(default)]
    pub unknown_action: UnknownActionPolicy,

    /// Floor for the staleness cutoff of financial actions
    #[serde(default = "default_max_snapshot_age_ms")]
    pub max_snapshot_age_ms: u64,

    /// A snapshot older than this many refresh intervals is stale, unless
    /// `max_snapshot_age_ms` allows more
    #[serde(default = "default_stale_after_intervals")]
    pub stale_after_intervals: u32,

    #[serde(default = "default_true")]
    pub fail_closed_when_stale: bool,
}

impl PolicyConfig {
    pub fn max_snapshot_age(&self) -> Duration {
        Duration::from_millis(self.max_snapshot_age_ms)
    }

    /// Age past which a snapshot refreshed every `refresh_interval` is stale
    pub fn stale_cutoff(&self, refresh_interval: Duration) -> Duration {
        refresh_interval
            .saturating_mul(self.stale_after_intervals)
            .max(self.max_snapshot_age())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_hours_before_game: default_min_hours_before_game(),
            batch_payout_below: default_batch_payout_below(),
            vrf_queue_alert: default_vrf_queue_alert(),
            unknown_action: UnknownActionPolicy::default(),
            max_snapshot_age_ms: default_max_snapshot_age_ms(),
            stale_after_intervals: default_stale_after_intervals(),
            fail_closed_when_stale: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_fetch_timeout_ms() -> u64 {
    2000
}

fn default_notification_queue() -> usize {
    64
}

fn default_listener_timeout_ms() -> u64 {
    1000
}

fn default_reserve_ratio() -> f64 {
    0.2
}

fn default_payout_buffer() -> f64 {
    1.2
}

fn default_create_board_min_available() -> f64 {
    100.0
}

fn default_low_congestion_tps() -> f64 {
    3000.0
}

fn default_low_congestion_fee() -> f64 {
    10_000.0
}

fn default_medium_congestion_tps() -> f64 {
    2000.0
}

fn default_medium_congestion_fee() -> f64 {
    50_000.0
}

fn default_optimal_delay_hours() -> i64 {
    2
}

fn default_squares_per_board() -> u32 {
    100
}

fn default_high_stakes_board_value() -> f64 {
    1000.0
}

fn default_peak_hours() -> Vec<HourRange> {
    vec![
        HourRange { start: 12, end: 14 },
        HourRange { start: 18, end: 23 },
    ]
}

fn default_max_error_rate() -> f64 {
    0.05
}

fn default_max_utilization() -> f64 {
    80.0
}

fn default_min_hours_before_game() -> f64 {
    2.0
}

fn default_batch_payout_below() -> f64 {
    10.0
}

fn default_vrf_queue_alert() -> u32 {
    100
}

fn default_max_snapshot_age_ms() -> u64 {
    30_000
}

fn default_stale_after_intervals() -> u32 {
    3
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8700
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_metrics_port() -> u16 {
    9700
}

impl Default for EngineConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "squares-context".to_string(),
                version: None,
            },
            spec: EngineConfig::default(),
        }
    }
}

impl EngineConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. SQCTX_CONFIG_PATH environment variable
    /// 2. ./sqctx-config.yaml (working directory)
    /// 3. ~/.sqctx/config.yaml (user home)
    /// 4. /etc/sqctx/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SQCTX_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./sqctx-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".sqctx").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/sqctx/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails hard when missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SQCTX_REFRESH_INTERVAL_MS") {
            match val.parse::<u64>() {
                Ok(ms) => {
                    tracing::info!("Environment override: SQCTX_REFRESH_INTERVAL_MS={}", ms);
                    self.spec.refresh.interval_ms = ms;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for SQCTX_REFRESH_INTERVAL_MS: '{}'. Expected milliseconds. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("SQCTX_UNKNOWN_ACTION") {
            match val.parse::<UnknownActionPolicy>() {
                Ok(policy) => {
                    tracing::info!("Environment override: SQCTX_UNKNOWN_ACTION={:?}", policy);
                    self.spec.policy.unknown_action = policy;
                }
                Err(e) => {
                    tracing::warn!("Invalid value for SQCTX_UNKNOWN_ACTION: {}. Ignoring.", e);
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        self.spec.validate()
    }
}

impl EngineConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let refresh = &self.refresh;
        if refresh.interval_ms == 0 {
            anyhow::bail!("refresh.interval_ms must be greater than zero");
        }
        if refresh.fetch_timeout_ms == 0 || refresh.fetch_timeout_ms >= refresh.interval_ms {
            anyhow::bail!(
                "refresh.fetch_timeout_ms ({}) must be positive and shorter than refresh.interval_ms ({})",
                refresh.fetch_timeout_ms,
                refresh.interval_ms
            );
        }
        if refresh.listener_timeout_ms == 0 || refresh.listener_timeout_ms >= refresh.interval_ms {
            anyhow::bail!(
                "refresh.listener_timeout_ms ({}) must be positive and shorter than refresh.interval_ms ({})",
                refresh.listener_timeout_ms,
                refresh.interval_ms
            );
        }
        if refresh.notification_queue == 0 {
            anyhow::bail!("refresh.notification_queue must be greater than zero");
        }

        let financial = &self.financial;
        if !(0.0..1.0).contains(&financial.reserve_ratio) {
            anyhow::bail!(
                "financial.reserve_ratio must be within [0, 1), got {}",
                financial.reserve_ratio
            );
        }
        let risk = financial.risk_thresholds;
        if !(risk.low > risk.medium && risk.medium > risk.high && risk.high >= 0.0) {
            anyhow::bail!(
                "financial.risk_thresholds must be strictly descending (low > medium > high >= 0)"
            );
        }

        if self.game.squares_per_board == 0 {
            anyhow::bail!("game.squares_per_board must be greater than zero");
        }
        for range in &self.game.peak_hours {
            if range.start > 23 || range.end > 23 || range.start > range.end {
                anyhow::bail!("Invalid peak hour range {}..={}", range.start, range.end);
            }
        }

        let window = &self.operational.maintenance_window;
        if window.start_hour > 23 || window.end_hour > 24 || window.end_hour <= window.start_hour {
            anyhow::bail!(
                "Invalid maintenance window {:02}:00-{:02}:00",
                window.start_hour,
                window.end_hour
            );
        }

        if self.policy.min_hours_before_game < 0.0 {
            anyhow::bail!("policy.min_hours_before_game cannot be negative");
        }
        if self.policy.stale_after_intervals < 2 {
            anyhow::bail!(
                "policy.stale_after_intervals must be at least 2, got {}",
                self.policy.stale_after_intervals
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = EngineConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.spec.refresh.interval_ms, 5000);
        assert_eq!(manifest.spec.financial.reserve_ratio, 0.2);
        assert_eq!(manifest.spec.policy.unknown_action, UnknownActionPolicy::Allow);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
apiVersion: squares.context/v1
kind: ContextEngineConfig
metadata:
  name: staging
spec:
  refresh:
    interval_ms: 10000
  policy:
    unknown_action: deny
  operational:
    maintenance_window:
      weekday: Sun
      start_hour: 3
      end_hour: 5
"#;
        let manifest = EngineConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "staging");
        assert_eq!(manifest.spec.refresh.interval_ms, 10000);
        assert_eq!(manifest.spec.refresh.fetch_timeout_ms, 2000);
        assert_eq!(manifest.spec.policy.unknown_action, UnknownActionPolicy::Deny);
        assert_eq!(manifest.spec.operational.maintenance_window.weekday, Weekday::Sun);
        assert_eq!(manifest.spec.game.peak_hours.len(), 2);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqctx-config.yaml");

        let mut manifest = EngineConfigManifest::default();
        manifest.spec.financial.create_board_min_available = 250.0;
        manifest.to_yaml_file(&path).unwrap();

        let loaded = EngineConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.spec.financial.create_board_min_available, 250.0);
    }

    #[test]
    fn test_validation() {
        let mut manifest = EngineConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.refresh.fetch_timeout_ms = manifest.spec.refresh.interval_ms;
        assert!(manifest.validate().is_err());
        manifest.spec.refresh.fetch_timeout_ms = 2000;

        manifest.spec.financial.risk_thresholds.medium = 0.6;
        assert!(manifest.validate().is_err());
        manifest.spec.financial.risk_thresholds = RiskThresholds::default();

        manifest.spec.operational.maintenance_window.end_hour = 1;
        assert!(manifest.validate().is_err());
        manifest.spec.operational.maintenance_window = MaintenanceWindow::default();

        manifest.spec.policy.stale_after_intervals = 1;
        assert!(manifest.validate().is_err());
        manifest.spec.policy.stale_after_intervals = 3;
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_listener_timeout_must_fit_in_interval() {
        let mut config = EngineConfig::default();
        config.refresh.interval_ms = 1000;
        config.refresh.fetch_timeout_ms = 500;

        config.refresh.listener_timeout_ms = 1000;
        assert!(config.validate().is_err());

        config.refresh.listener_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.refresh.listener_timeout_ms = 400;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stale_cutoff_follows_refresh_interval() {
        let policy = PolicyConfig::default();

        // Short intervals fall back to the fixed floor
        assert_eq!(
            policy.stale_cutoff(Duration::from_secs(5)),
            Duration::from_secs(30)
        );
        // Long intervals scale the cutoff
        assert_eq!(
            policy.stale_cutoff(Duration::from_secs(60)),
            Duration::from_secs(180)
        );
    }

    #[test]
    fn test_unknown_action_policy_parsing() {
        assert_eq!("DENY".parse::<UnknownActionPolicy>(), Ok(UnknownActionPolicy::Deny));
        assert_eq!("allow".parse::<UnknownActionPolicy>(), Ok(UnknownActionPolicy::Allow));
        assert!("maybe".parse::<UnknownActionPolicy>().is_err());
    }
}

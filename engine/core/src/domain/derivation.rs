// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Derived metrics
//!
//! Pure functions turning raw provider readings into the classified fields of
//! a snapshot. Nothing here reads the clock; callers pass the wall-clock time
//! captured at the start of the cycle.

use chrono::{Datelike, Timelike};

use crate::domain::config::{
    HourRange, MaintenanceWindow, NetworkPolicy, OperationalPolicy, RiskThresholds,
};
use crate::domain::context::{
    BoardSummary, Congestion, GameSummary, IncidentInfo, PerformanceMetrics, RiskLevel, Severity,
    SystemHealth, ThreatInfo, ThreatLevel,
};

/// Classify the available/treasury ratio. An empty treasury is CRITICAL.
pub fn financial_risk(available: f64, treasury: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if treasury <= 0.0 {
        return Severity::Critical;
    }

    let ratio = available / treasury;
    if ratio > thresholds.low {
        Severity::Low
    } else if ratio > thresholds.medium {
        Severity::Medium
    } else if ratio > thresholds.high {
        Severity::High
    } else {
        Severity::Critical
    }
}

pub fn congestion(tps: f64, average_fee: f64, policy: &NetworkPolicy) -> Congestion {
    if tps > policy.low_congestion_min_tps && average_fee < policy.low_congestion_max_fee {
        Congestion::Low
    } else if tps > policy.medium_congestion_min_tps && average_fee < policy.medium_congestion_max_fee {
        Congestion::Medium
    } else {
        Congestion::High
    }
}

/// Percentage of sold squares over all active boards; 0 without boards.
pub fn fill_rate(boards: &[BoardSummary], squares_per_board: u32) -> f64 {
    if boards.is_empty() || squares_per_board == 0 {
        return 0.0;
    }

    let sold: u64 = boards.iter().map(|b| u64::from(b.sold_squares)).sum();
    let capacity = boards.len() as u64 * u64::from(squares_per_board);
    sold as f64 / capacity as f64 * 100.0
}

pub fn is_peak_hour(hour: u32, ranges: &[HourRange]) -> bool {
    ranges.iter().any(|range| range.contains(hour))
}

/// Quarter of the first active game that carries a live score.
pub fn current_quarter(active_games: &[GameSummary]) -> Option<String> {
    active_games
        .iter()
        .find(|game| game.current_score.is_some())
        .and_then(|game| game.quarter.clone())
}

pub fn threat_level(threats: &[ThreatInfo]) -> ThreatLevel {
    if threats.is_empty() {
        return Severity::Low;
    }

    if threats.iter().any(|t| t.severity == Severity::Critical) {
        Severity::Critical
    } else if threats.iter().any(|t| t.severity == Severity::High) {
        Severity::High
    } else {
        Severity::Medium
    }
}

pub fn system_health(
    metrics: &PerformanceMetrics,
    incidents: &[IncidentInfo],
    policy: &OperationalPolicy,
) -> SystemHealth {
    if incidents.iter().any(|i| i.severity == Severity::Critical) {
        return SystemHealth::Critical;
    }
    if metrics.error_rate > policy.max_error_rate {
        return SystemHealth::Degraded;
    }
    if metrics.cpu_usage > policy.max_cpu_percent || metrics.memory_usage > policy.max_memory_percent {
        return SystemHealth::Degraded;
    }
    SystemHealth::Healthy
}

pub fn in_maintenance_window(at: &(impl Datelike + Timelike), window: &MaintenanceWindow) -> bool {
    at.weekday() == window.weekday && at.hour() >= window.start_hour && at.hour() < window.end_hour
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy Rule Sets
//!
//! One pure function per gated action. Each reads only the snapshot handed in,
//! never the clock or any provider, so a decision is reproducible from
//! `(context, params, policy, now)`.
//!
//! Rules within a set are independent and accumulate: every failing check adds
//! a reason and denies, advisories only add recommendations. The one exception
//! is the randomness-service check in [`request_vrf`], which is a hard stop.

use chrono::{DateTime, Utc};

use crate::domain::config::PolicyConfig;
use crate::domain::context::{Congestion, RandomnessStatus, Severity, SystemContext, SystemHealth};
use crate::domain::decision::{DecisionBuilder, DecisionParams, DecisionResult};

pub const BACKUP_PROVIDER_RECOMMENDATION: &str = "Use backup randomness provider";

/// CREATE_BOARD: params: `gameStartTime`
pub fn create_board(
    ctx: &SystemContext,
    params: &DecisionParams,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> DecisionResult {
    let mut decision = DecisionBuilder::new();

    decision
        .consulted("canCreateBoard", ctx.financial.can_create_board)
        .consulted("treasuryBalance", ctx.financial.treasury_balance)
        .consulted("availableBalance", ctx.financial.available_balance)
        .consulted("networkCongestion", ctx.network.congestion)
        .consulted("threatLevel", ctx.security.threat_level);

    if !ctx.financial.can_create_board {
        decision
            .deny("Insufficient treasury balance for new board")
            .recommend("Wait for pending payouts to complete");
    }

    if ctx.network.congestion == Congestion::High {
        decision.recommend("Consider waiting 30 minutes for lower fees");
    }

    match params.get_datetime("gameStartTime") {
        Some(game_start) => {
            let hours_until_game = (game_start - now).num_seconds() as f64 / 3600.0;
            decision.consulted("hoursUntilGameStart", hours_until_game);
            if hours_until_game < policy.min_hours_before_game {
                decision.deny("Too close to game start time");
            }
        }
        None => {
            decision.deny("Missing or invalid game start time");
        }
    }

    if matches!(ctx.security.threat_level, Severity::High | Severity::Critical) {
        decision.deny("Security threat detected - board creation suspended");
    }

    decision.finish("Board creation approved")
}

/// PROCESS_PAYOUT: params: `wallet`, `amount`
pub fn process_payout(
    ctx: &SystemContext,
    params: &DecisionParams,
    policy: &PolicyConfig,
) -> DecisionResult {
    let mut decision = DecisionBuilder::new();
    let wallet = params.get_str("wallet").unwrap_or_default();
    let suspicious = ctx.security.suspicious_wallets.contains(wallet);
    let blacklisted = ctx.security.blacklisted_wallets.contains(wallet);

    decision
        .consulted("availableBalance", ctx.financial.available_balance)
        .consulted("canProcessPayout", ctx.financial.can_process_payout)
        .consulted("networkCongestion", ctx.network.congestion)
        .consulted(
            "walletStatus",
            match (blacklisted, suspicious) {
                (true, _) => "BLACKLISTED",
                (false, true) => "SUSPICIOUS",
                (false, false) => "CLEAR",
            },
        );

    if suspicious {
        decision
            .deny("Wallet flagged as suspicious")
            .recommend("Manual review required");
    }

    if blacklisted {
        decision.deny("Wallet is blacklisted");
    }

    if !ctx.financial.can_process_payout {
        decision.deny("Insufficient available balance");
    }

    let small_payout = params
        .get_f64("amount")
        .is_some_and(|amount| amount < policy.batch_payout_below);
    if ctx.network.congestion == Congestion::High && small_payout {
        decision.recommend("Batch with other payouts to save fees");
    }

    decision.finish("Payout approved")
}

/// REQUEST_VRF: params: `urgent`
pub fn request_vrf(
    ctx: &SystemContext,
    params: &DecisionParams,
    policy: &PolicyConfig,
) -> DecisionResult {
    let network = &ctx.network;
    let mut decision = DecisionBuilder::new();
    decision.consulted("switchboardStatus", network.switchboard_status);

    if network.switchboard_status != RandomnessStatus::Operational {
        decision
            .deny("Switchboard service not operational")
            .recommend(BACKUP_PROVIDER_RECOMMENDATION);
        return decision.finish("");
    }

    decision
        .consulted("vrfQueue", network.vrf_queue_depth)
        .consulted("congestion", network.congestion);

    let delay_recommended = network.congestion == Congestion::High && !params.flag("urgent");
    if delay_recommended {
        let advice = match network.optimal_action_time {
            Some(at) => format!("Wait until {} for lower fees", at.to_rfc3339()),
            None => "Wait for lower fees".to_string(),
        };
        decision.recommend(advice);
    }

    if network.vrf_queue_depth > policy.vrf_queue_alert {
        decision.recommend("Consider using alternative VRF provider");
    }

    if delay_recommended {
        decision.finish("Approved but delay recommended")
    } else {
        decision.finish("VRF request approved")
    }
}

/// DEPLOY_CODE: params: `emergency`
pub fn deploy_code(ctx: &SystemContext, params: &DecisionParams) -> DecisionResult {
    let mut decision = DecisionBuilder::new();
    let active_games = ctx.game.active_games.len();

    decision
        .consulted("activeGames", active_games)
        .consulted("systemHealth", ctx.operational.system_health)
        .consulted("deploymentInProgress", ctx.operational.deployment_in_progress);

    if active_games > 0 && !params.flag("emergency") {
        decision.deny(format!("{} games in progress", active_games));
    }

    if ctx.operational.system_health == SystemHealth::Critical {
        decision.deny("System health critical - stabilize first");
    }

    if ctx
        .operational
        .active_incidents
        .iter()
        .any(|incident| incident.severity == Severity::Critical)
    {
        decision.deny("Critical incident in progress");
    }

    if decision.is_denied() {
        decision.recommend("Wait for games to complete");
    } else {
        decision.recommend("Monitor closely after deployment");
    }

    if ctx.operational.deployment_in_progress {
        decision.recommend("Another deployment is already in progress");
    }

    decision.finish("Deployment approved")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::{GameSummary, IncidentInfo, IncidentStatus};
    use chrono::Duration;
    use serde_json::json;

    fn healthy_context() -> SystemContext {
        let mut ctx = SystemContext::default();
        ctx.financial.treasury_balance = 500.0;
        ctx.financial.available_balance = 350.0;
        ctx.financial.can_create_board = true;
        ctx.financial.can_process_payout = true;
        ctx
    }

    fn game(id: &str) -> GameSummary {
        GameSummary {
            game_id: id.to_string(),
            home_team: "KC".to_string(),
            away_team: "PHI".to_string(),
            start_time: Utc::now(),
            current_score: None,
            quarter: None,
            board_value: 0.0,
            fill_rate: 0.0,
        }
    }

    #[test]
    fn test_create_board_window() {
        let ctx = healthy_context();
        let now = Utc::now();
        let policy = PolicyConfig::default();

        let soon = DecisionParams::new().with("gameStartTime", (now + Duration::hours(1)).to_rfc3339());
        let result = create_board(&ctx, &soon, &policy, now);
        assert!(!result.approved);
        assert!(result.reason.to_lowercase().contains("too close to game start"));

        let later = DecisionParams::new().with("gameStartTime", (now + Duration::hours(3)).to_rfc3339());
        let result = create_board(&ctx, &later, &policy, now);
        assert!(result.approved);
        assert_eq!(result.reason, "Board creation approved");
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_create_board_accumulates_reasons() {
        let mut ctx = healthy_context();
        ctx.financial.can_create_board = false;
        ctx.security.threat_level = Severity::Critical;
        ctx.network.congestion = Congestion::High;
        let now = Utc::now();
        let params = DecisionParams::new().with("gameStartTime", (now + Duration::hours(1)).to_rfc3339());

        let result = create_board(&ctx, &params, &PolicyConfig::default(), now);

        assert!(!result.approved);
        assert_eq!(
            result.reason,
            "Insufficient treasury balance for new board; Too close to game start time; \
             Security threat detected - board creation suspended"
        );
        assert_eq!(
            result.recommendations,
            vec![
                "Wait for pending payouts to complete".to_string(),
                "Consider waiting 30 minutes for lower fees".to_string(),
            ]
        );
        assert_eq!(result.context_used["threatLevel"], json!("CRITICAL"));
        assert_eq!(result.context_used["networkCongestion"], json!("HIGH"));
    }

    #[test]
    fn test_create_board_requires_start_time() {
        let result = create_board(
            &healthy_context(),
            &DecisionParams::new(),
            &PolicyConfig::default(),
            Utc::now(),
        );
        assert!(!result.approved);
        assert_eq!(result.reason, "Missing or invalid game start time");
    }

    #[test]
    fn test_process_payout_suspicious_wallet() {
        let mut ctx = healthy_context();
        ctx.security.suspicious_wallets.insert("W1".to_string());
        let params = DecisionParams::new().with("wallet", "W1").with("amount", 25.0);

        let result = process_payout(&ctx, &params, &PolicyConfig::default());
        assert!(!result.approved);
        assert!(result.reason.contains("flagged as suspicious"));
        assert_eq!(result.recommendations, vec!["Manual review required".to_string()]);
        assert_eq!(result.context_used["walletStatus"], json!("SUSPICIOUS"));

        ctx.security.suspicious_wallets.remove("W1");
        let result = process_payout(&ctx, &params, &PolicyConfig::default());
        assert!(result.approved);
        assert_eq!(result.reason, "Payout approved");
        assert_eq!(result.context_used["walletStatus"], json!("CLEAR"));
    }

    #[test]
    fn test_process_payout_batching_advice() {
        let mut ctx = healthy_context();
        ctx.network.congestion = Congestion::High;
        let policy = PolicyConfig::default();

        let small = DecisionParams::new().with("wallet", "W2").with("amount", 3.0);
        let result = process_payout(&ctx, &small, &policy);
        assert!(result.approved);
        assert_eq!(
            result.recommendations,
            vec!["Batch with other payouts to save fees".to_string()]
        );

        let large = DecisionParams::new().with("wallet", "W2").with("amount", 30.0);
        assert!(process_payout(&ctx, &large, &policy).recommendations.is_empty());
    }

    #[test]
    fn test_process_payout_blacklisted_and_broke() {
        let mut ctx = healthy_context();
        ctx.financial.can_process_payout = false;
        ctx.security.blacklisted_wallets.insert("W3".to_string());
        let params = DecisionParams::new().with("wallet", "W3").with("amount", 1.0);

        let result = process_payout(&ctx, &params, &PolicyConfig::default());
        assert!(!result.approved);
        assert_eq!(
            result.reason,
            "Wallet is blacklisted; Insufficient available balance"
        );
        assert_eq!(result.context_used["walletStatus"], json!("BLACKLISTED"));
    }

    #[test]
    fn test_request_vrf_short_circuits_when_down() {
        let mut ctx = healthy_context();
        ctx.network.switchboard_status = RandomnessStatus::Down;
        ctx.network.congestion = Congestion::High;
        ctx.network.vrf_queue_depth = 500;

        let result = request_vrf(&ctx, &DecisionParams::new(), &PolicyConfig::default());

        assert!(!result.approved);
        assert_eq!(result.reason, "Switchboard service not operational");
        assert_eq!(result.recommendations, vec![BACKUP_PROVIDER_RECOMMENDATION.to_string()]);
        assert_eq!(result.context_used.len(), 1);
        assert!(!result.context_used.contains_key("vrfQueue"));
    }

    #[test]
    fn test_request_vrf_advisories() {
        let mut ctx = healthy_context();
        let policy = PolicyConfig::default();

        let result = request_vrf(&ctx, &DecisionParams::new(), &policy);
        assert!(result.approved);
        assert_eq!(result.reason, "VRF request approved");
        assert!(result.recommendations.is_empty());

        ctx.network.congestion = Congestion::High;
        ctx.network.vrf_queue_depth = 150;
        let result = request_vrf(&ctx, &DecisionParams::new(), &policy);
        assert!(result.approved);
        assert_eq!(result.reason, "Approved but delay recommended");
        assert_eq!(result.recommendations.len(), 2);
        assert_eq!(result.recommendations[0], "Wait for lower fees");
        assert_eq!(result.recommendations[1], "Consider using alternative VRF provider");

        let urgent = DecisionParams::new().with("urgent", true);
        let result = request_vrf(&ctx, &urgent, &policy);
        assert_eq!(result.reason, "VRF request approved");
        assert_eq!(
            result.recommendations,
            vec!["Consider using alternative VRF provider".to_string()]
        );
    }

    #[test]
    fn test_deploy_code_blocks_during_games() {
        let mut ctx = healthy_context();
        ctx.game.active_games = vec![game("g1"), game("g2")];

        let result = deploy_code(&ctx, &DecisionParams::new());
        assert!(!result.approved);
        assert_eq!(result.reason, "2 games in progress");
        assert_eq!(result.recommendations, vec!["Wait for games to complete".to_string()]);

        let emergency = DecisionParams::new().with("emergency", true);
        let result = deploy_code(&ctx, &emergency);
        assert!(result.approved);
        assert_eq!(result.reason, "Deployment approved");
        assert_eq!(
            result.recommendations,
            vec!["Monitor closely after deployment".to_string()]
        );
    }

    #[test]
    fn test_deploy_code_blocks_on_critical_state() {
        let mut ctx = healthy_context();
        ctx.operational.system_health = SystemHealth::Critical;
        ctx.operational.active_incidents.push(IncidentInfo {
            id: "inc-7".to_string(),
            severity: Severity::Critical,
            description: "treasury signer offline".to_string(),
            start_time: Utc::now(),
            affected_services: vec!["payouts".to_string()],
            status: IncidentStatus::Active,
        });

        let result = deploy_code(&ctx, &DecisionParams::new().with("emergency", true));
        assert!(!result.approved);
        assert_eq!(
            result.reason,
            "System health critical - stabilize first; Critical incident in progress"
        );
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Policy Evaluator - context-aware approval of gated actions
//!
//! Reads the current snapshot once per decision and hands it to the matching
//! rule set in [`crate::domain::rules`]. Evaluation is synchronous, performs
//! no I/O and never fails: every request gets a [`DecisionResult`].
//!
//! On top of the per-action rules the evaluator applies two engine-wide
//! policies: the default answer for actions without a rule set, and the
//! fail-closed check for financial actions when the snapshot is too old.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::context_store::ContextStore;
use crate::domain::config::{PolicyConfig, UnknownActionPolicy};
use crate::domain::decision::{DecisionParams, DecisionResult, PolicyAction};
use crate::domain::events::ContextEvent;
use crate::domain::rules;
use crate::infrastructure::event_bus::EventBus;

pub const UNKNOWN_ACTION_REASON: &str = "No context rules for this action";
pub const UNKNOWN_ACTION_DENIED_REASON: &str = "No context rules for this action; denied by policy";
pub const STALE_CONTEXT_REASON: &str = "Context snapshot is stale";

pub struct PolicyEvaluator {
    store: Arc<ContextStore>,
    policy: PolicyConfig,
    event_bus: EventBus,
}

impl PolicyEvaluator {
    pub fn new(store: Arc<ContextStore>, policy: PolicyConfig, event_bus: EventBus) -> Self {
        Self {
            store,
            policy,
            event_bus,
        }
    }

    pub fn evaluate(&self, action: &str, params: &DecisionParams) -> DecisionResult {
        self.evaluate_at(action, params, Utc::now())
    }

    /// Evaluate as if the current time were `now`
    pub fn evaluate_at(
        &self,
        action: &str,
        params: &DecisionParams,
        now: DateTime<Utc>,
    ) -> DecisionResult {
        let snapshot = self.store.get();
        let action = PolicyAction::parse(action);

        let mut result = match &action {
            PolicyAction::CreateBoard => rules::create_board(&snapshot, params, &self.policy, now),
            PolicyAction::ProcessPayout => rules::process_payout(&snapshot, params, &self.policy),
            PolicyAction::RequestVrf => rules::request_vrf(&snapshot, params, &self.policy),
            PolicyAction::DeployCode => rules::deploy_code(&snapshot, params),
            PolicyAction::Unknown(_) => self.unknown_action(),
        };

        if action.is_financial() && self.policy.fail_closed_when_stale {
            let age = snapshot.age_at(now);
            if age > self.policy.stale_cutoff(self.store.refresh_interval()) {
                result
                    .context_used
                    .insert("snapshotAgeMs".to_string(), json!(age.as_millis() as u64));
                result.deny(STALE_CONTEXT_REASON);
            }
        }

        let approved = if result.approved { "true" } else { "false" };
        counter!(
            "context_decisions_total",
            "action" => action.metric_label(),
            "approved" => approved
        )
        .increment(1);

        if result.approved {
            debug!(action = %action, snapshot_cycle = snapshot.cycle, "Action approved");
        } else {
            info!(
                action = %action,
                snapshot_cycle = snapshot.cycle,
                reason = %result.reason,
                "Action denied"
            );
        }

        self.event_bus.publish(ContextEvent::DecisionEvaluated {
            action: action.as_str().to_string(),
            approved: result.approved,
            reason: result.reason.clone(),
            snapshot_cycle: snapshot.cycle,
            evaluated_at: now,
        });

        result
    }

    fn unknown_action(&self) -> DecisionResult {
        let (approved, reason) = match self.policy.unknown_action {
            UnknownActionPolicy::Allow => (true, UNKNOWN_ACTION_REASON),
            UnknownActionPolicy::Deny => (false, UNKNOWN_ACTION_DENIED_REASON),
        };

        DecisionResult {
            approved,
            reason: reason.to_string(),
            recommendations: Vec::new(),
            context_used: Default::default(),
        }
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy Decisions
//!
//! Value objects exchanged with callers of the policy evaluator:
//!
//! - [`PolicyAction`]: the gated action identifier, parsed from its wire name
//!   (`CREATE_BOARD`, `PROCESS_PAYOUT`, `REQUEST_VRF`, `DEPLOY_CODE`). Any
//!   other name is kept as [`PolicyAction::Unknown`].
//! - [`DecisionParams`]: caller-supplied JSON parameters with typed lookups.
//! - [`DecisionResult`]: approval, human-readable reasons, advisory
//!   recommendations and the context fields the rules consulted.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyAction {
    CreateBoard,
    ProcessPayout,
    RequestVrf,
    DeployCode,
    #[serde(untagged)]
    Unknown(String),
}

impl PolicyAction {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "CREATE_BOARD" => PolicyAction::CreateBoard,
            "PROCESS_PAYOUT" => PolicyAction::ProcessPayout,
            "REQUEST_VRF" => PolicyAction::RequestVrf,
            "DEPLOY_CODE" => PolicyAction::DeployCode,
            _ => PolicyAction::Unknown(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PolicyAction::CreateBoard => "CREATE_BOARD",
            PolicyAction::ProcessPayout => "PROCESS_PAYOUT",
            PolicyAction::RequestVrf => "REQUEST_VRF",
            PolicyAction::DeployCode => "DEPLOY_CODE",
            PolicyAction::Unknown(name) => name,
        }
    }

    /// Bounded label for metrics; every unknown name shares one label
    pub fn metric_label(&self) -> &'static str {
        match self {
            PolicyAction::CreateBoard => "CREATE_BOARD",
            PolicyAction::ProcessPayout => "PROCESS_PAYOUT",
            PolicyAction::RequestVrf => "REQUEST_VRF",
            PolicyAction::DeployCode => "DEPLOY_CODE",
            PolicyAction::Unknown(_) => "UNKNOWN",
        }
    }

    /// Actions that move or commit treasury funds
    pub fn is_financial(&self) -> bool {
        matches!(self, PolicyAction::CreateBoard | PolicyAction::ProcessPayout)
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PolicyAction {
    fn from(name: &str) -> Self {
        PolicyAction::parse(name)
    }
}

/// Caller-supplied parameters for one decision request.
///
/// Lookups are lenient: a missing or mistyped key reads as absent and each
/// rule set decides what absence means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionParams(Map<String, Value>);

impl DecisionParams {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// Booleans default to false when absent
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Accepts an RFC 3339 string or integer epoch milliseconds
    pub fn get_datetime(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.0.get(key)? {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Value::Number(n) => n
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for DecisionParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for DecisionParams {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(format!("decision params must be a JSON object, got {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub approved: bool,
    pub reason: String,
    pub recommendations: Vec<String>,
    /// The snapshot fields the rules consulted, for audit
    pub context_used: BTreeMap<String, Value>,
}

impl DecisionResult {
    /// Add a denial on top of an already finished decision
    pub fn deny(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.approved {
            self.approved = false;
            self.reason = reason;
        } else {
            self.reason = format!("{}; {}", self.reason, reason);
        }
    }
}

/// Accumulates rule outcomes for one decision.
///
/// Every failing rule contributes a reason and flips approval; advisories
/// never affect approval.
#[derive(Debug, Default)]
pub struct DecisionBuilder {
    denials: Vec<String>,
    recommendations: Vec<String>,
    context_used: BTreeMap<String, Value>,
}

impl DecisionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&mut self, reason: impl Into<String>) -> &mut Self {
        self.denials.push(reason.into());
        self
    }

    pub fn recommend(&mut self, recommendation: impl Into<String>) -> &mut Self {
        self.recommendations.push(recommendation.into());
        self
    }

    pub fn consulted(&mut self, key: &str, value: impl Serialize) -> &mut Self {
        self.context_used.insert(
            key.to_string(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
        self
    }

    pub fn is_denied(&self) -> bool {
        !self.denials.is_empty()
    }

    pub fn finish(self, approval_message: &str) -> DecisionResult {
        let approved = self.denials.is_empty();
        let reason = if approved {
            approval_message.to_string()
        } else {
            self.denials.join("; ")
        };

        DecisionResult {
            approved,
            reason,
            recommendations: self.recommendations,
            context_used: self.context_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_parsing() {
        assert_eq!(PolicyAction::parse("CREATE_BOARD"), PolicyAction::CreateBoard);
        assert_eq!(PolicyAction::parse("process_payout"), PolicyAction::ProcessPayout);
        assert_eq!(
            PolicyAction::parse("MINT_PASS"),
            PolicyAction::Unknown("MINT_PASS".to_string())
        );
        assert_eq!(PolicyAction::RequestVrf.to_string(), "REQUEST_VRF");
        assert!(PolicyAction::ProcessPayout.is_financial());
        assert!(!PolicyAction::DeployCode.is_financial());
    }

    #[test]
    fn test_metric_labels_are_bounded() {
        assert_eq!(PolicyAction::parse("create_board").metric_label(), "CREATE_BOARD");
        assert_eq!(PolicyAction::DeployCode.metric_label(), "DEPLOY_CODE");

        let unknown = PolicyAction::parse("drop table boards");
        assert_eq!(unknown.metric_label(), "UNKNOWN");
        assert_eq!(PolicyAction::parse("MINT_PASS").metric_label(), "UNKNOWN");
        // The caller's name is still available for logs and audit events
        assert_eq!(unknown.as_str(), "drop table boards");
    }

    #[test]
    fn test_params_lookups() {
        let params = DecisionParams::try_from(json!({
            "wallet": "W1",
            "amount": 4.5,
            "urgent": true,
            "gameStartTime": "2026-02-08T23:30:00Z",
            "epochStart": 1_770_593_400_000i64,
        }))
        .unwrap();

        assert_eq!(params.get_str("wallet"), Some("W1"));
        assert_eq!(params.get_f64("amount"), Some(4.5));
        assert!(params.flag("urgent"));
        assert!(!params.flag("emergency"));
        assert_eq!(
            params.get_datetime("gameStartTime"),
            Some(Utc.with_ymd_and_hms(2026, 2, 8, 23, 30, 0).unwrap())
        );
        assert_eq!(
            params.get_datetime("epochStart"),
            Some(Utc.with_ymd_and_hms(2026, 2, 8, 23, 30, 0).unwrap())
        );
        assert_eq!(params.get_datetime("wallet"), None);
    }

    #[test]
    fn test_params_reject_non_objects() {
        assert!(DecisionParams::try_from(json!([1, 2])).is_err());
        assert_eq!(DecisionParams::try_from(Value::Null).unwrap(), DecisionParams::new());
    }

    #[test]
    fn test_builder_joins_denials() {
        let mut builder = DecisionBuilder::new();
        builder
            .deny("first")
            .deny("second")
            .recommend("wait")
            .consulted("threatLevel", "LOW");

        let result = builder.finish("ok");
        assert!(!result.approved);
        assert_eq!(result.reason, "first; second");
        assert_eq!(result.recommendations, vec!["wait".to_string()]);
        assert_eq!(result.context_used["threatLevel"], json!("LOW"));
    }

    #[test]
    fn test_late_denial_replaces_approval_message() {
        let mut result = DecisionBuilder::new().finish("Payout approved");
        result.deny("Context snapshot is stale");
        assert!(!result.approved);
        assert_eq!(result.reason, "Context snapshot is stale");

        result.deny("another");
        assert_eq!(result.reason, "Context snapshot is stale; another");
    }
}

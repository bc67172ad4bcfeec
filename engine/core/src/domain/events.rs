// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::context::ContextDomain;

/// Audit trail of the engine: one event per cycle outcome and per decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextEvent {
    SnapshotPublished {
        cycle: u64,
        captured_at: DateTime<Utc>,
        duration_ms: u64,
    },
    CycleFailed {
        cycle: u64,
        /// `None` when the failure was not attributable to one domain
        domain: Option<ContextDomain>,
        error: String,
        failed_at: DateTime<Utc>,
    },
    DecisionEvaluated {
        action: String,
        approved: bool,
        reason: String,
        snapshot_cycle: u64,
        evaluated_at: DateTime<Utc>,
    },
}

impl ContextEvent {
    pub fn is_decision(&self) -> bool {
        matches!(self, ContextEvent::DecisionEvaluated { .. })
    }
}

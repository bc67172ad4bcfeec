// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Squares Context Engine
//!
//! Aggregates financial, network, game, security and operational state into
//! one immutable snapshot on a fixed cadence, pushes each snapshot to
//! subscribers, and answers approve/deny questions for gated actions against
//! the current snapshot.
//!
//! # Architecture
//!
//! - **domain:** snapshot types, derived metrics, provider contracts, rules
//! - **application:** store, aggregation loop, fan-out, evaluator, service
//! - **infrastructure:** event bus and fixture-backed providers
//! - **presentation:** HTTP API

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::service::ContextService;
pub use domain::config::{EngineConfig, EngineConfigManifest};
pub use domain::context::{ContextDomain, ContextSnapshot, SystemContext};
pub use domain::decision::{DecisionParams, DecisionResult};
pub use domain::providers::ContextProviders;

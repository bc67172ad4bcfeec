// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application layer: the snapshot store, the aggregation loop, listener
//! fan-out, policy evaluation and the service facade that ties them together.

pub mod aggregator;
pub mod context_store;
pub mod policy;
pub mod service;
pub mod subscribers;

pub use aggregator::{AggregationError, ContextAggregator};
pub use context_store::ContextStore;
pub use policy::PolicyEvaluator;
pub use service::ContextService;
pub use subscribers::{ContextSubscriber, ListenerError, SubscriberRegistry, SubscriptionId};

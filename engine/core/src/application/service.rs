// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Context Service - the engine's public surface
//!
//! Wires the store, aggregator, subscriber registry, notification dispatcher
//! and policy evaluator around one provider set. Build one at startup and
//! share it as `Arc<ContextService>`; there is no global instance.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Facade consumed by agents, the HTTP API and the CLI

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::aggregator::{AggregationError, ContextAggregator};
use crate::application::context_store::ContextStore;
use crate::application::policy::PolicyEvaluator;
use crate::application::subscribers::{
    notification_channel, ContextSubscriber, SubscriberRegistry, SubscriptionId,
};
use crate::domain::config::EngineConfig;
use crate::domain::context::{
    ContextDomain, ContextSnapshot, DomainContext, FinancialContext, GameContext, NetworkContext,
    OperationalContext, SecurityContext,
};
use crate::domain::decision::{DecisionParams, DecisionResult};
use crate::domain::providers::ContextProviders;
use crate::infrastructure::event_bus::{EventBus, EventReceiver};

pub struct ContextService {
    config: Arc<EngineConfig>,
    store: Arc<ContextStore>,
    registry: Arc<SubscriberRegistry>,
    aggregator: Arc<ContextAggregator>,
    evaluator: PolicyEvaluator,
    event_bus: EventBus,
    dispatcher_token: CancellationToken,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl ContextService {
    /// Build the engine and spawn its notification dispatcher.
    ///
    /// Must be called from within a Tokio runtime. Aggregation does not begin
    /// until [`start`](Self::start) or [`refresh_now`](Self::refresh_now).
    pub fn new(providers: ContextProviders, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(ContextStore::new());
        store.set_refresh_interval(config.refresh.interval());
        let event_bus = EventBus::with_default_capacity();
        let registry = Arc::new(SubscriberRegistry::new(config.refresh.listener_timeout()));

        let (notifier, dispatcher) =
            notification_channel(registry.clone(), config.refresh.notification_queue);
        let dispatcher_token = CancellationToken::new();
        let dispatcher_handle = dispatcher.spawn(dispatcher_token.clone());

        let aggregator = Arc::new(ContextAggregator::new(
            providers,
            store.clone(),
            notifier,
            event_bus.clone(),
            config.clone(),
        ));
        let evaluator = PolicyEvaluator::new(store.clone(), config.policy.clone(), event_bus.clone());

        Self {
            config,
            store,
            registry,
            aggregator,
            evaluator,
            event_bus,
            dispatcher_token,
            dispatcher: Mutex::new(Some(dispatcher_handle)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // Context reads

    /// Current snapshot; never blocks on aggregation and never fails
    pub fn get_context(&self) -> Arc<ContextSnapshot> {
        self.store.get()
    }

    pub fn get_domain(&self, domain: ContextDomain) -> DomainContext {
        self.store.get_domain(domain)
    }

    pub fn financial(&self) -> FinancialContext {
        self.store.financial()
    }

    pub fn network(&self) -> NetworkContext {
        self.store.network()
    }

    pub fn game(&self) -> GameContext {
        self.store.game()
    }

    pub fn security(&self) -> SecurityContext {
        self.store.security()
    }

    pub fn operational(&self) -> OperationalContext {
        self.store.operational()
    }

    pub fn snapshot_age(&self) -> Duration {
        self.store.snapshot_age()
    }

    // Subscriptions

    pub fn subscribe(&self, listener: Arc<dyn ContextSubscriber>) -> SubscriptionId {
        self.registry.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    // Decisions

    pub fn evaluate(&self, action: &str, params: &DecisionParams) -> DecisionResult {
        self.evaluator.evaluate(action, params)
    }

    pub fn evaluator(&self) -> &PolicyEvaluator {
        &self.evaluator
    }

    // Lifecycle

    /// Start periodic aggregation at `interval`, replacing any running loop
    pub fn start(&self, interval: Duration) {
        self.aggregator.start(interval);
    }

    /// Start periodic aggregation at the configured refresh interval
    pub fn start_default(&self) {
        self.start(self.config.refresh.interval());
    }

    pub fn stop(&self) -> bool {
        self.aggregator.stop()
    }

    pub fn is_running(&self) -> bool {
        self.aggregator.is_running()
    }

    pub fn current_interval(&self) -> Option<Duration> {
        self.aggregator.current_interval()
    }

    /// Run one aggregation cycle right now, outside the periodic loop
    pub async fn refresh_now(&self) -> Result<Arc<ContextSnapshot>, AggregationError> {
        self.aggregator.run_cycle().await
    }

    /// Stop aggregation, wait for an in-flight cycle, then stop delivery
    pub async fn shutdown(&self) {
        info!("Shutting down context service");
        self.aggregator.shutdown().await;
        self.dispatcher_token.cancel();

        let dispatcher = self.dispatcher.lock().take();
        if let Some(handle) = dispatcher {
            if let Err(e) = handle.await {
                warn!("Notification dispatcher ended abnormally: {}", e);
            }
        }
    }

    // Events

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe_events(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }
}

impl Drop for ContextService {
    fn drop(&mut self) {
        self.aggregator.stop();
        self.dispatcher_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::channel_subscriber::ChannelSubscriber;
    use crate::infrastructure::fixture_providers::FixtureProviders;

    fn service() -> (ContextService, Arc<FixtureProviders>) {
        let fixture = Arc::new(FixtureProviders::default());
        let service = ContextService::new(
            ContextProviders::from_shared(fixture.clone()),
            EngineConfig::default(),
        );
        (service, fixture)
    }

    #[tokio::test]
    async fn test_initial_context_is_conservative() {
        let (service, _) = service();

        let snapshot = service.get_context();

        assert!(snapshot.is_initial());
        assert!(!service.financial().can_create_board);
        assert!(!service.financial().can_process_payout);
    }

    #[tokio::test]
    async fn test_refresh_notifies_every_subscriber_with_same_snapshot() {
        let (service, _) = service();
        let mut receivers = Vec::new();
        for i in 0..3 {
            let (listener, rx) = ChannelSubscriber::new(format!("listener-{}", i), 4);
            service.subscribe(Arc::new(listener));
            receivers.push(rx);
        }

        let published = service.refresh_now().await.unwrap();

        for rx in receivers.iter_mut() {
            let received = rx.recv().await.unwrap();
            assert!(Arc::ptr_eq(&received, &published));
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_sends_no_notification() {
        let (service, fixture) = service();
        let (listener, mut rx) = ChannelSubscriber::new("watcher", 4);
        service.subscribe(Arc::new(listener));

        fixture.fail(ContextDomain::Operational);
        assert!(service.refresh_now().await.is_err());
        service.shutdown().await;

        assert!(service.get_context().is_initial());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribed_listener_is_not_notified() {
        let (service, _) = service();
        let (listener, mut rx) = ChannelSubscriber::new("watcher", 4);
        let id = service.subscribe(Arc::new(listener));
        assert_eq!(service.subscriber_count(), 1);

        assert!(service.unsubscribe(id));
        service.refresh_now().await.unwrap();
        service.shutdown().await;

        assert_eq!(service.subscriber_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_evaluate_reads_latest_snapshot() {
        let (service, fixture) = service();
        let payout = DecisionParams::new().with("wallet", "W1").with("amount", 25.0);

        // Initial snapshot has no available balance
        assert!(!service.evaluate("PROCESS_PAYOUT", &payout).approved);

        service.refresh_now().await.unwrap();
        assert!(service.evaluate("PROCESS_PAYOUT", &payout).approved);

        fixture.update(|f| {
            f.security.suspicious_wallets.insert("W1".to_string());
        });
        service.refresh_now().await.unwrap();
        let result = service.evaluate("PROCESS_PAYOUT", &payout);
        assert!(!result.approved);
        assert_eq!(result.reason, "Wallet flagged as suspicious");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_default_uses_configured_interval() {
        let (service, _) = service();

        service.start_default();

        assert!(service.is_running());
        assert_eq!(service.current_interval(), Some(Duration::from_millis(5000)));
        assert!(service.stop());
        assert!(!service.is_running());
    }
}

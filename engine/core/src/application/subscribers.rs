// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Subscriber Registry - push delivery of published snapshots
//!
//! Listeners register a [`ContextSubscriber`] and receive every snapshot the
//! aggregator publishes. Delivery runs on a dispatcher task fed through a
//! bounded queue, so a slow or failing listener never holds up aggregation.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Listener bookkeeping and isolated fan-out
//!
//! Each listener runs in its own task with a timeout; an error, a timeout or a
//! panic in one listener is logged and counted but never reaches the others.

use async_trait::async_trait;
use futures::future::join_all;
use metrics::counter;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::context::ContextSnapshot;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Listener rejected snapshot: {0}")]
    Rejected(String),

    #[error("Listener cannot keep up: {0}")]
    Backpressure(String),

    #[error("Listener is closed")]
    Closed,
}

/// Receives each published snapshot
#[async_trait]
pub trait ContextSubscriber: Send + Sync {
    async fn on_context_update(&self, snapshot: Arc<ContextSnapshot>) -> Result<(), ListenerError>;

    /// Label used in logs
    fn name(&self) -> &str {
        "anonymous"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct SubscriberRegistry {
    listeners: RwLock<HashMap<SubscriptionId, Arc<dyn ContextSubscriber>>>,
    listener_timeout: Duration,
}

impl SubscriberRegistry {
    pub fn new(listener_timeout: Duration) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            listener_timeout,
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn ContextSubscriber>) -> SubscriptionId {
        let id = SubscriptionId::new();
        debug!(subscription_id = %id, listener = listener.name(), "Registered context subscriber");
        self.listeners.write().insert(id, listener);
        id
    }

    /// Returns false when `id` was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.listeners.write().remove(&id).is_some();
        if removed {
            debug!(subscription_id = %id, "Removed context subscriber");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Deliver `snapshot` to every listener registered at call time.
    ///
    /// Works on a copy of the listener map, so listeners may subscribe or
    /// unsubscribe (even from inside a callback) while a fan-out is running.
    pub async fn broadcast(&self, snapshot: Arc<ContextSnapshot>) -> BroadcastReport {
        let listeners: Vec<(SubscriptionId, Arc<dyn ContextSubscriber>)> = self
            .listeners
            .read()
            .iter()
            .map(|(id, listener)| (*id, listener.clone()))
            .collect();

        if listeners.is_empty() {
            return BroadcastReport::default();
        }

        let timeout = self.listener_timeout;
        let cycle = snapshot.cycle;

        let (labels, deliveries): (Vec<_>, Vec<_>) = listeners
            .into_iter()
            .map(|(id, listener)| {
                let label = (id, listener.name().to_string());
                let snapshot = snapshot.clone();
                let delivery: JoinHandle<_> = tokio::spawn(async move {
                    tokio::time::timeout(timeout, listener.on_context_update(snapshot)).await
                });
                (label, delivery)
            })
            .unzip();

        let mut report = BroadcastReport::default();
        for ((id, name), outcome) in labels.into_iter().zip(join_all(deliveries).await) {
            match outcome {
                Ok(Ok(Ok(()))) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Ok(Err(e))) => {
                    warn!(cycle, subscription_id = %id, listener = %name, "Context listener failed: {}", e);
                }
                Ok(Err(_)) => {
                    warn!(
                        cycle,
                        subscription_id = %id,
                        listener = %name,
                        timeout_ms = timeout.as_millis() as u64,
                        "Context listener timed out"
                    );
                }
                Err(e) if e.is_panic() => {
                    error!(cycle, subscription_id = %id, listener = %name, "Context listener panicked");
                }
                Err(e) => {
                    warn!(cycle, subscription_id = %id, listener = %name, "Context listener task aborted: {}", e);
                }
            }
            report.failed += 1;
            counter!("context_listener_failures_total").increment(1);
        }

        debug!(
            cycle,
            delivered = report.delivered,
            failed = report.failed,
            "Snapshot fan-out complete"
        );
        report
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

/// Producer side of the notification queue, held by the aggregator
#[derive(Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Arc<ContextSnapshot>>,
}

impl NotificationSender {
    /// Queue `snapshot` for delivery without waiting.
    ///
    /// When the queue is full the notification is dropped; listeners still
    /// see the next cycle and can always read the store directly.
    pub fn notify(&self, snapshot: Arc<ContextSnapshot>) -> bool {
        match self.tx.try_send(snapshot) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(snapshot)) => {
                warn!(
                    cycle = snapshot.cycle,
                    "Notification queue full, dropping snapshot notification"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(snapshot)) => {
                debug!(
                    cycle = snapshot.cycle,
                    "Notification dispatcher stopped, snapshot not delivered"
                );
                false
            }
        }
    }
}

/// Consumer side of the notification queue
pub struct NotificationDispatcher {
    registry: Arc<SubscriberRegistry>,
    rx: mpsc::Receiver<Arc<ContextSnapshot>>,
}

/// Create a bounded queue between the aggregator and the listener fan-out
pub fn notification_channel(
    registry: Arc<SubscriberRegistry>,
    capacity: usize,
) -> (NotificationSender, NotificationDispatcher) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (NotificationSender { tx }, NotificationDispatcher { registry, rx })
}

impl NotificationDispatcher {
    pub fn spawn(self, shutdown_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown_token))
    }

    /// Deliver queued snapshots one cycle at a time until shutdown or until
    /// every sender is gone
    pub async fn run(mut self, shutdown_token: CancellationToken) {
        debug!("Notification dispatcher started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping notification dispatcher");
                    break;
                }
                next = self.rx.recv() => match next {
                    Some(snapshot) => {
                        self.registry.broadcast(snapshot).await;
                    }
                    None => break,
                }
            }
        }

        debug!("Notification dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::SystemContext;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(cycle: u64) -> Arc<ContextSnapshot> {
        Arc::new(ContextSnapshot {
            cycle,
            captured_at: Utc::now(),
            context: SystemContext::default(),
        })
    }

    #[derive(Default)]
    struct CountingListener {
        calls: AtomicUsize,
        last_cycle: parking_lot::Mutex<Option<u64>>,
    }

    #[async_trait]
    impl ContextSubscriber for CountingListener {
        async fn on_context_update(&self, snapshot: Arc<ContextSnapshot>) -> Result<(), ListenerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_cycle.lock() = Some(snapshot.cycle);
            Ok(())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct FailingListener;

    #[async_trait]
    impl ContextSubscriber for FailingListener {
        async fn on_context_update(&self, _snapshot: Arc<ContextSnapshot>) -> Result<(), ListenerError> {
            Err(ListenerError::Rejected("boom".to_string()))
        }
    }

    struct PanickingListener;

    #[async_trait]
    impl ContextSubscriber for PanickingListener {
        async fn on_context_update(&self, _snapshot: Arc<ContextSnapshot>) -> Result<(), ListenerError> {
            panic!("listener bug");
        }
    }

    struct SlowListener;

    #[async_trait]
    impl ContextSubscriber for SlowListener {
        async fn on_context_update(&self, _snapshot: Arc<ContextSnapshot>) -> Result<(), ListenerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_listener_once() {
        let registry = SubscriberRegistry::default();
        let listeners: Vec<Arc<CountingListener>> =
            (0..3).map(|_| Arc::new(CountingListener::default())).collect();
        for listener in &listeners {
            registry.subscribe(listener.clone());
        }

        let report = registry.broadcast(snapshot(4)).await;

        assert_eq!(report, BroadcastReport { delivered: 3, failed: 0 });
        for listener in &listeners {
            assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
            assert_eq!(*listener.last_cycle.lock(), Some(4));
        }
    }

    #[tokio::test]
    async fn test_failing_and_panicking_listeners_are_isolated() {
        let registry = SubscriberRegistry::default();
        let healthy = Arc::new(CountingListener::default());
        registry.subscribe(Arc::new(FailingListener));
        registry.subscribe(Arc::new(PanickingListener));
        registry.subscribe(healthy.clone());

        let report = registry.broadcast(snapshot(1)).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_listener_times_out() {
        let registry = SubscriberRegistry::new(Duration::from_millis(100));
        let healthy = Arc::new(CountingListener::default());
        registry.subscribe(Arc::new(SlowListener));
        registry.subscribe(healthy.clone());

        let report = registry.broadcast(snapshot(1)).await;

        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let registry = SubscriberRegistry::default();
        let listener = Arc::new(CountingListener::default());
        let id = registry.subscribe(listener.clone());

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(registry.is_empty());

        registry.broadcast(snapshot(1)).await;
        assert_eq!(listener.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_queued_snapshots() {
        let registry = Arc::new(SubscriberRegistry::default());
        let listener = Arc::new(CountingListener::default());
        registry.subscribe(listener.clone());

        let (sender, dispatcher) = notification_channel(registry, 4);
        let token = CancellationToken::new();
        let handle = dispatcher.spawn(token.clone());

        assert!(sender.notify(snapshot(1)));
        assert!(sender.notify(snapshot(2)));
        drop(sender);

        handle.await.unwrap();
        assert_eq!(listener.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*listener.last_cycle.lock(), Some(2));
    }

    #[tokio::test]
    async fn test_full_queue_drops_notification() {
        let registry = Arc::new(SubscriberRegistry::default());
        let (sender, _dispatcher) = notification_channel(registry, 1);

        assert!(sender.notify(snapshot(1)));
        assert!(!sender.notify(snapshot(2)));
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Context Events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Carries cycle outcomes and policy decisions to log shippers, the CLI and
// any audit consumer. Events are not persisted.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::ContextEvent;

/// Event bus for publishing and subscribing to context events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ContextEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers; never blocks
    pub fn publish(&self, event: ContextEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all context events
    pub fn subscribe(&self) -> EventReceiver {
        let receiver = self.sender.subscribe();
        EventReceiver { receiver }
    }

    /// Subscribe to policy decisions only
    pub fn subscribe_decisions(&self) -> DecisionEventReceiver {
        let receiver = self.sender.subscribe();
        DecisionEventReceiver { receiver }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all context events
pub struct EventReceiver {
    receiver: broadcast::Receiver<ContextEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<ContextEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<ContextEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver that filters out everything except `DecisionEvaluated`
pub struct DecisionEventReceiver {
    receiver: broadcast::Receiver<ContextEvent>,
}

impl DecisionEventReceiver {
    pub async fn recv(&mut self) -> Result<ContextEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.is_decision() {
                return Ok(event);
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn published(cycle: u64) -> ContextEvent {
        ContextEvent::SnapshotPublished {
            cycle,
            captured_at: Utc::now(),
            duration_ms: 3,
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish(published(7));

        match receiver.recv().await.unwrap() {
            ContextEvent::SnapshotPublished { cycle, .. } => assert_eq!(cycle, 7),
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decision_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_decisions();

        event_bus.publish(published(1));
        event_bus.publish(ContextEvent::DecisionEvaluated {
            action: "PROCESS_PAYOUT".to_string(),
            approved: false,
            reason: "Wallet flagged as suspicious".to_string(),
            snapshot_cycle: 1,
            evaluated_at: Utc::now(),
        });

        match receiver.recv().await.unwrap() {
            ContextEvent::DecisionEvaluated { action, approved, .. } => {
                assert_eq!(action, "PROCESS_PAYOUT");
                assert!(!approved);
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish(published(2));

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
        assert!(matches!(receiver1.try_recv(), Err(EventBusError::Empty)));
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let event_bus = EventBus::default();
        event_bus.publish(published(3));
        assert_eq!(event_bus.subscriber_count(), 0);
    }
}

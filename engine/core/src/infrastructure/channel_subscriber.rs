// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Channel-backed listener: bridges snapshot pushes into a tokio mpsc queue for
// consumers that prefer pulling (the SSE stream, tests, the CLI watcher).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::subscribers::{ContextSubscriber, ListenerError};
use crate::domain::context::ContextSnapshot;

pub struct ChannelSubscriber {
    name: String,
    tx: mpsc::Sender<Arc<ContextSnapshot>>,
}

impl ChannelSubscriber {
    /// Create a listener plus the receiving end of its queue
    pub fn new(
        name: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Arc<ContextSnapshot>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }
}

#[async_trait]
impl ContextSubscriber for ChannelSubscriber {
    async fn on_context_update(&self, snapshot: Arc<ContextSnapshot>) -> Result<(), ListenerError> {
        self.tx.try_send(snapshot).map_err(|e| match e {
            mpsc::error::TrySendError::Full(snapshot) => ListenerError::Backpressure(format!(
                "{} queue full, cycle {} dropped",
                self.name, snapshot.cycle
            )),
            mpsc::error::TrySendError::Closed(_) => ListenerError::Closed,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forwards_snapshots() {
        let (listener, mut rx) = ChannelSubscriber::new("test", 2);

        listener
            .on_context_update(Arc::new(ContextSnapshot::initial()))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().cycle, 0);
    }

    #[test]
    fn test_full_and_closed_queues_are_errors() {
        let (listener, rx) = ChannelSubscriber::new("test", 1);
        let snapshot = Arc::new(ContextSnapshot::initial());

        tokio_test::block_on(listener.on_context_update(snapshot.clone())).unwrap();
        assert!(matches!(
            tokio_test::block_on(listener.on_context_update(snapshot.clone())),
            Err(ListenerError::Backpressure(_))
        ));

        drop(rx);
        assert!(matches!(
            tokio_test::block_on(listener.on_context_update(snapshot)),
            Err(ListenerError::Closed)
        ));
    }
}

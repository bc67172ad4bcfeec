// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Context Store
//!
//! Holds exactly one current [`ContextSnapshot`] behind an `Arc`.
//!
//! The pointer lives in an [`ArcSwap`]: readers load it without taking a
//! lock and then work on their own reference, and the writer installs a new
//! snapshot with a single compare-and-swap. No reader can observe a
//! half-installed snapshot and no reader can hold up the writer.
//!
//! The store also records the refresh interval of the active aggregation
//! loop, which the policy evaluator uses to judge staleness.

use arc_swap::ArcSwap;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::context::{
    ContextDomain, ContextSnapshot, DomainContext, FinancialContext, GameContext, NetworkContext,
    OperationalContext, SecurityContext,
};

const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5000;

pub struct ContextStore {
    current: ArcSwap<ContextSnapshot>,
    refresh_interval_ms: AtomicU64,
}

impl ContextStore {
    /// Store pre-populated with the conservative initial snapshot
    pub fn new() -> Self {
        Self::with_snapshot(ContextSnapshot::initial())
    }

    pub fn with_snapshot(snapshot: ContextSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            refresh_interval_ms: AtomicU64::new(DEFAULT_REFRESH_INTERVAL_MS),
        }
    }

    /// Current snapshot; the returned reference stays valid and unchanged
    /// even if a newer snapshot is installed afterwards
    pub fn get(&self) -> Arc<ContextSnapshot> {
        self.current.load_full()
    }

    pub fn get_domain(&self, domain: ContextDomain) -> DomainContext {
        self.get().domain(domain)
    }

    pub fn financial(&self) -> FinancialContext {
        self.get().financial.clone()
    }

    pub fn network(&self) -> NetworkContext {
        self.get().network.clone()
    }

    pub fn game(&self) -> GameContext {
        self.get().game.clone()
    }

    pub fn security(&self) -> SecurityContext {
        self.get().security.clone()
    }

    pub fn operational(&self) -> OperationalContext {
        self.get().operational.clone()
    }

    /// Install `snapshot` if it comes from a later cycle than the current one.
    ///
    /// Returns the installed reference, or `None` when a newer snapshot is
    /// already in place (a slow cycle finishing after a faster successor).
    pub fn publish(&self, snapshot: ContextSnapshot) -> Option<Arc<ContextSnapshot>> {
        let next = Arc::new(snapshot);
        let mut current = self.current.load();

        loop {
            if next.cycle <= current.cycle {
                debug!(
                    cycle = next.cycle,
                    current = current.cycle,
                    "Discarding snapshot older than the installed one"
                );
                return None;
            }

            let previous = self.current.compare_and_swap(&*current, next.clone());
            if Arc::ptr_eq(&*previous, &*current) {
                return Some(next);
            }
            // Another writer got in first; re-check against what it installed
            current = previous;
        }
    }

    pub fn current_cycle(&self) -> u64 {
        self.current.load().cycle
    }

    /// Refresh interval of the aggregation loop feeding this store
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.load(Ordering::Relaxed))
    }

    pub fn set_refresh_interval(&self, interval: Duration) {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
        self.refresh_interval_ms.store(ms, Ordering::Relaxed);
    }

    /// Time since the current snapshot was captured
    pub fn snapshot_age(&self) -> Duration {
        self.get().age_at(Utc::now())
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

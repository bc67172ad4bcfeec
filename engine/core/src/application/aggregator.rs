// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Context Aggregator - periodic collection of the five context domains
//!
//! Every cycle fetches all domains concurrently, each fetch bounded by the
//! configured timeout, derives the domain records and installs one new
//! snapshot. A cycle is all-or-nothing: the first failing or timed-out fetch
//! abandons the cycle, the remaining fetches are dropped, and the previous
//! snapshot stays current.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Sole writer of the context store
//!
//! Only one loop runs per aggregator. `start` replaces a running loop and
//! `stop` cancels the timer; a cycle already in flight runs to completion and
//! may still publish.

use chrono::{DateTime, Local, Utc};
use metrics::{counter, gauge, histogram};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::context_store::ContextStore;
use crate::application::subscribers::NotificationSender;
use crate::domain::config::EngineConfig;
use crate::domain::context::{
    ContextDomain, ContextSnapshot, FinancialContext, GameContext, NetworkContext,
    NetworkReadings, OperationalContext, SecurityContext, SystemContext,
};
use crate::domain::events::ContextEvent;
use crate::domain::providers::{ContextProviders, ProviderError};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("{domain} provider failed: {source}")]
    Provider {
        domain: ContextDomain,
        #[source]
        source: ProviderError,
    },

    #[error("{domain} fetch timed out after {}ms", .timeout.as_millis())]
    Timeout {
        domain: ContextDomain,
        timeout: Duration,
    },
}

impl AggregationError {
    pub fn domain(&self) -> ContextDomain {
        match self {
            AggregationError::Provider { domain, .. } | AggregationError::Timeout { domain, .. } => {
                *domain
            }
        }
    }
}

struct RunningLoop {
    token: CancellationToken,
    interval: Duration,
    handle: JoinHandle<()>,
}

pub struct ContextAggregator {
    providers: ContextProviders,
    store: Arc<ContextStore>,
    notifier: NotificationSender,
    event_bus: EventBus,
    config: Arc<EngineConfig>,
    cycle_counter: AtomicU64,
    running: Mutex<Option<RunningLoop>>,
}

impl ContextAggregator {
    pub fn new(
        providers: ContextProviders,
        store: Arc<ContextStore>,
        notifier: NotificationSender,
        event_bus: EventBus,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            providers,
            store,
            notifier,
            event_bus,
            config,
            cycle_counter: AtomicU64::new(0),
            running: Mutex::new(None),
        }
    }

    /// Start the periodic loop; the first cycle runs immediately.
    ///
    /// A loop that is already running is cancelled first, so at most one loop
    /// is ever active. Must be called from within a Tokio runtime.
    pub fn start(self: &Arc<Self>, period: Duration) {
        let period = if period.is_zero() {
            warn!("Refresh interval of zero requested, using 1ms");
            Duration::from_millis(1)
        } else {
            period
        };

        let mut running = self.running.lock();
        if let Some(previous) = running.take() {
            info!(
                previous_interval_ms = previous.interval.as_millis() as u64,
                interval_ms = period.as_millis() as u64,
                "Restarting context aggregation loop"
            );
            previous.token.cancel();
        }

        self.store.set_refresh_interval(period);

        let token = CancellationToken::new();
        let aggregator = Arc::clone(self);
        let loop_token = token.clone();
        let handle = tokio::spawn(async move {
            aggregator.run(period, loop_token).await;
        });

        *running = Some(RunningLoop {
            token,
            interval: period,
            handle,
        });
    }

    /// Cancel the loop timer. Returns false when no loop was running.
    pub fn stop(&self) -> bool {
        match self.running.lock().take() {
            Some(running) => {
                running.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel the loop and wait until its in-flight cycle, if any, has finished
    pub async fn shutdown(&self) {
        let running = self.running.lock().take();
        if let Some(running) = running {
            running.token.cancel();
            if let Err(e) = running.handle.await {
                warn!("Context aggregation loop ended abnormally: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Interval of the active loop
    pub fn current_interval(&self) -> Option<Duration> {
        self.running.lock().as_ref().map(|running| running.interval)
    }

    /// Number of cycles started so far, successful or not
    pub fn cycles_started(&self) -> u64 {
        self.cycle_counter.load(Ordering::SeqCst)
    }

    async fn run(&self, period: Duration, shutdown_token: CancellationToken) {
        info!(
            interval_ms = period.as_millis() as u64,
            "Starting context aggregation loop"
        );

        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_token.cancelled() => {
                    break;
                }
                _ = tick.tick() => {}
            }

            // Errors are logged and published by run_cycle; the loop keeps going
            let _ = self.run_cycle().await;
        }

        info!("Context aggregation loop stopped");
    }

    /// Run one aggregation cycle and publish its snapshot.
    ///
    /// When a later cycle has already been installed (concurrent refreshes)
    /// the result is discarded and the newer snapshot is returned instead.
    pub async fn run_cycle(&self) -> Result<Arc<ContextSnapshot>, AggregationError> {
        let cycle = self.cycle_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        let now = Utc::now();
        let local_now = now.with_timezone(&Local);

        debug!(cycle, "Running context aggregation cycle");

        let fetched = tokio::try_join!(
            self.fetch_financial(),
            self.fetch_network(now),
            self.fetch_game(&local_now),
            self.fetch_security(),
            self.fetch_operational(&local_now),
        );

        let (financial, network, game, security, operational) = match fetched {
            Ok(domains) => domains,
            Err(e) => {
                let domain = e.domain();
                warn!(
                    cycle,
                    domain = %domain,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Context aggregation cycle failed, keeping previous snapshot: {}",
                    e
                );
                counter!("context_cycles_total", "outcome" => "failed").increment(1);
                counter!("context_provider_failures_total", "domain" => domain.as_str())
                    .increment(1);
                self.event_bus.publish(ContextEvent::CycleFailed {
                    cycle,
                    domain: Some(domain),
                    error: e.to_string(),
                    failed_at: Utc::now(),
                });
                return Err(e);
            }
        };

        let snapshot = ContextSnapshot {
            cycle,
            captured_at: Utc::now(),
            context: SystemContext {
                financial,
                network,
                game,
                security,
                operational,
            },
        };

        let Some(installed) = self.store.publish(snapshot) else {
            counter!("context_cycles_total", "outcome" => "superseded").increment(1);
            return Ok(self.store.get());
        };

        let elapsed = started.elapsed();
        counter!("context_cycles_total", "outcome" => "published").increment(1);
        histogram!("context_cycle_duration_seconds").record(elapsed.as_secs_f64());
        gauge!("context_snapshot_cycle").set(cycle as f64);

        self.notifier.notify(installed.clone());
        self.event_bus.publish(ContextEvent::SnapshotPublished {
            cycle,
            captured_at: installed.captured_at,
            duration_ms: elapsed.as_millis() as u64,
        });

        debug!(
            cycle,
            elapsed_ms = elapsed.as_millis() as u64,
            risk_level = %installed.financial.risk_level,
            threat_level = %installed.security.threat_level,
            "Published context snapshot"
        );

        Ok(installed)
    }

    async fn bounded<T>(
        &self,
        domain: ContextDomain,
        fetch: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, AggregationError> {
        let timeout = self.config.refresh.fetch_timeout();
        match tokio::time::timeout(timeout, fetch).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(AggregationError::Provider { domain, source }),
            Err(_) => Err(AggregationError::Timeout { domain, timeout }),
        }
    }

    async fn fetch_financial(&self) -> Result<FinancialContext, AggregationError> {
        let provider = &self.providers.financial;
        let (treasury, pending) = self
            .bounded(ContextDomain::Financial, async {
                tokio::try_join!(
                    provider.current_treasury_balance(),
                    provider.current_pending_payouts()
                )
            })
            .await?;

        Ok(FinancialContext::derive(
            treasury,
            pending,
            &self.config.financial,
        ))
    }

    async fn fetch_network(&self, now: DateTime<Utc>) -> Result<NetworkContext, AggregationError> {
        let provider = &self.providers.network;
        let (slot_and_fee, tps, queue_depth, estimated_wait, status) = self
            .bounded(ContextDomain::Network, async {
                tokio::try_join!(
                    provider.current_slot_and_fee(),
                    provider.estimated_throughput(),
                    provider.randomness_queue_depth(),
                    provider.randomness_estimated_wait(),
                    provider.randomness_service_health()
                )
            })
            .await?;

        let readings = NetworkReadings {
            tps,
            current_slot: slot_and_fee.slot,
            average_fee: slot_and_fee.average_fee,
            vrf_queue_depth: queue_depth,
            vrf_estimated_wait: estimated_wait,
            switchboard_status: status,
        };
        Ok(NetworkContext::derive(readings, now, &self.config.network))
    }

    async fn fetch_game(&self, local_now: &DateTime<Local>) -> Result<GameContext, AggregationError> {
        let provider = &self.providers.game;
        let (active, upcoming, boards) = self
            .bounded(ContextDomain::Game, async {
                tokio::try_join!(
                    provider.active_games(),
                    provider.upcoming_games(),
                    provider.active_boards()
                )
            })
            .await?;

        Ok(GameContext::derive(
            active,
            upcoming,
            &boards,
            local_now,
            &self.config.game,
        ))
    }

    async fn fetch_security(&self) -> Result<SecurityContext, AggregationError> {
        let provider = &self.providers.security;
        let (threats, suspicious, attacks, blacklisted, whitelisted) = self
            .bounded(ContextDomain::Security, async {
                tokio::try_join!(
                    provider.detect_threats(),
                    provider.suspicious_wallets(),
                    provider.recent_attacks(),
                    provider.blacklisted_wallets(),
                    provider.whitelisted_wallets()
                )
            })
            .await?;

        Ok(SecurityContext::derive(
            threats,
            suspicious,
            attacks,
            blacklisted,
            whitelisted,
        ))
    }

    async fn fetch_operational(
        &self,
        local_now: &DateTime<Local>,
    ) -> Result<OperationalContext, AggregationError> {
        let provider = &self.providers.operational;
        let (agents, incidents, performance, deployment_active) = self
            .bounded(ContextDomain::Operational, async {
                tokio::try_join!(
                    provider.agent_statuses(),
                    provider.active_incidents(),
                    provider.performance_metrics(),
                    provider.is_deployment_active()
                )
            })
            .await?;

        Ok(OperationalContext::derive(
            agents,
            incidents,
            performance,
            deployment_active,
            local_now,
            &self.config.operational,
        ))
    }
}

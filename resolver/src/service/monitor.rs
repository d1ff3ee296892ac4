//! Swap Monitor
//!
//! Releases `DestLocked` orders once their confirmation delay has passed.
//!
//! Checks are kept in a min-heap keyed by due time, so each wake-up only
//! touches orders that are actually due instead of scanning the registry.
//! The orchestrator feeds new checks through a `MonitorHandle`; on startup the
//! queue is seeded from every `DestLocked` record in the registry.
//!
//! Release is idempotent: an order is re-read from the registry before every
//! action, and the release itself is guarded by a persisted claim, so a
//! terminal order is never released twice. A release that times out keeps
//! its claim: the order is neither re-sent nor failed, and waits for an
//! operator.

use chain_clients_common::{AdapterError, LegRef};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::chains::AdapterSet;
use crate::config::Config;
use crate::error::ResolverError;
use crate::order::OrderHash;
use crate::registry::{FailureKind, LegKind, OrderRecord, OrderRegistry, OrderStatus};
use crate::timelock::now_secs;

/// Minimum interval between eviction passes.
const EVICTION_INTERVAL_SECS: u64 = 3600;

/// Queue entry: check `order_hash` at or after `due_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduledCheck {
    pub due_at: u64,
    pub order_hash: OrderHash,
}

/// Sender side of the monitor queue, held by the orchestrator.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::UnboundedSender<ScheduledCheck>,
}

impl MonitorHandle {
    pub fn schedule(&self, order_hash: OrderHash, due_at: u64) {
        if self
            .tx
            .send(ScheduledCheck { due_at, order_hash })
            .is_err()
        {
            warn!("Monitor stopped; order {} not scheduled", order_hash);
        }
    }
}

/// Outcome counts of one `tick`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub completed: usize,
    pub failed: usize,
    pub deferred: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        *self == TickReport::default()
    }
}

enum CheckOutcome {
    Completed,
    Failed,
    Deferred(u64),
    Skipped,
}

pub struct SwapMonitor {
    config: Arc<Config>,
    registry: Arc<OrderRegistry>,
    adapters: Arc<AdapterSet>,
    queue: Mutex<BinaryHeap<Reverse<ScheduledCheck>>>,
    inbox: Mutex<mpsc::UnboundedReceiver<ScheduledCheck>>,
    last_eviction: AtomicU64,
}

impl SwapMonitor {
    /// Creates the monitor and the handle used to schedule checks on it.
    pub fn new(
        config: Arc<Config>,
        registry: Arc<OrderRegistry>,
        adapters: Arc<AdapterSet>,
    ) -> (Self, MonitorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Self {
            config,
            registry,
            adapters,
            queue: Mutex::new(BinaryHeap::new()),
            inbox: Mutex::new(rx),
            last_eviction: AtomicU64::new(0),
        };
        (monitor, MonitorHandle { tx })
    }

    /// Queues every `DestLocked` order found in the registry.
    ///
    /// Orders whose release was claimed before a restart are not re-queued;
    /// the release may already be on-chain and needs operator reconciliation.
    pub async fn seed_from_registry(&self) -> usize {
        let records = self.registry.orders_with_status(OrderStatus::DestLocked).await;
        let mut queue = self.queue.lock().await;
        let mut seeded = 0;
        for record in records {
            if record.release_in_flight {
                warn!(
                    "Order {} has an unresolved release from a previous run; not retrying",
                    record.order_hash()
                );
                continue;
            }
            queue.push(Reverse(ScheduledCheck {
                due_at: self.confirmation_deadline(&record),
                order_hash: record.order_hash(),
            }));
            seeded += 1;
        }
        info!("Monitor seeded with {} locked orders", seeded);
        seeded
    }

    /// Number of queued checks (including ones not yet drained from the inbox).
    pub async fn pending(&self) -> usize {
        self.drain_inbox().await;
        self.queue.lock().await.len()
    }

    /// Earliest due time in the queue.
    pub async fn next_due(&self) -> Option<u64> {
        self.drain_inbox().await;
        self.queue.lock().await.peek().map(|Reverse(c)| c.due_at)
    }

    async fn drain_inbox(&self) {
        let mut inbox = self.inbox.lock().await;
        let mut queue = self.queue.lock().await;
        while let Ok(check) = inbox.try_recv() {
            queue.push(Reverse(check));
        }
    }

    async fn push(&self, order_hash: OrderHash, due_at: u64) {
        self.queue
            .lock()
            .await
            .push(Reverse(ScheduledCheck { due_at, order_hash }));
    }

    fn confirmation_deadline(&self, record: &OrderRecord) -> u64 {
        record.created_at + self.config.monitor.min_confirmation_secs
    }

    /// Processes every check due at `now`.
    ///
    /// A failing order is logged and re-queued one period later; it never
    /// stops the remaining checks.
    pub async fn tick(&self, now: u64) -> TickReport {
        self.drain_inbox().await;

        let due: Vec<ScheduledCheck> = {
            let mut queue = self.queue.lock().await;
            let mut due = Vec::new();
            while let Some(Reverse(check)) = queue.peek() {
                if check.due_at > now {
                    break;
                }
                due.push(*check);
                queue.pop();
            }
            due
        };

        let mut report = TickReport::default();
        for check in due {
            match self.check_order(&check.order_hash, now).await {
                Ok(CheckOutcome::Completed) => report.completed += 1,
                Ok(CheckOutcome::Failed) => report.failed += 1,
                Ok(CheckOutcome::Skipped) => report.skipped += 1,
                Ok(CheckOutcome::Deferred(due_at)) => {
                    report.deferred += 1;
                    self.push(check.order_hash, due_at).await;
                }
                Err(e) => {
                    report.errors += 1;
                    error!("Monitor check for order {} failed: {}", check.order_hash, e);
                    self.push(check.order_hash, now + self.config.monitor.period_secs)
                        .await;
                }
            }
        }

        if !report.is_empty() {
            info!(
                "Monitor tick: {} completed, {} failed, {} deferred, {} skipped, {} errors",
                report.completed, report.failed, report.deferred, report.skipped, report.errors
            );
        }
        report
    }

    async fn check_order(&self, order_hash: &OrderHash, now: u64) -> Result<CheckOutcome, ResolverError> {
        let record = match self.registry.get_status(order_hash).await {
            Ok(record) => record,
            // Evicted or never persisted
            Err(ResolverError::NotFound(_)) => return Ok(CheckOutcome::Skipped),
            Err(e) => return Err(e),
        };
        if record.status != OrderStatus::DestLocked || record.release_in_flight {
            debug!("Order {} is {}, nothing to do", order_hash, record.status);
            return Ok(CheckOutcome::Skipped);
        }

        let confirmed_at = self.confirmation_deadline(&record);
        if now < confirmed_at {
            return Ok(CheckOutcome::Deferred(confirmed_at));
        }

        let leg = &record.destination_leg;
        let network = leg.network.as_str();
        let reference = leg.reference.clone().ok_or_else(|| {
            ResolverError::Validation(format!("Order {} has no destination leg reference", order_hash))
        })?;
        let is_escrow = leg.kind == Some(LegKind::Escrow);

        let phase = if is_escrow {
            self.adapters
                .get_state(network, &LegRef(reference.clone()))
                .await
                .map(Some)
                .map_err(|e| ResolverError::chain(network, e))?
        } else {
            record.time_lock.phase_at(now)
        };

        let phase = match phase {
            Some(phase) => phase,
            None => return Ok(CheckOutcome::Deferred(record.time_lock.private_withdrawal)),
        };

        if phase.is_cancellation() {
            let reason = format!(
                "destination leg reached {} before release",
                phase.as_str()
            );
            self.registry
                .mark_failed(order_hash, FailureKind::Expired, &reason, true, now)
                .await?;
            return Ok(CheckOutcome::Failed);
        }

        match self.registry.begin_release(order_hash, now).await {
            Ok(_) => {}
            Err(ResolverError::InvalidTransition { .. }) => return Ok(CheckOutcome::Skipped),
            Err(e) => return Err(e),
        }

        let order = &record.order;
        let release = if is_escrow {
            self.adapters
                .withdraw(network, &LegRef(reference), record.hash_lock.secret.as_bytes())
                .await
        } else {
            self.adapters
                .direct_transfer(network, &order.destination_asset, order.taking_amount, &order.receiver)
                .await
        };

        match release {
            Ok(tx) => {
                self.registry.mark_completed(order_hash, &tx.0, now).await?;
                Ok(CheckOutcome::Completed)
            }
            Err(AdapterError::Timeout) => {
                // A timed-out release may still land; keep the claim so it is never sent twice
                error!(
                    "Order {}: release {} on {} timed out, outcome unknown; leaving claimed for reconciliation",
                    order_hash,
                    if is_escrow { "withdraw" } else { "transfer" },
                    network
                );
                Ok(CheckOutcome::Skipped)
            }
            Err(e) => {
                self.registry.abort_release(order_hash, now).await?;
                Err(ResolverError::chain(network, e))
            }
        }
    }

    /// Evicts old terminal orders at most once per hour.
    async fn maybe_evict(&self, now: u64) {
        let last = self.last_eviction.load(Ordering::Relaxed);
        if now.saturating_sub(last) < EVICTION_INTERVAL_SECS {
            return;
        }
        self.last_eviction.store(now, Ordering::Relaxed);
        let cutoff = now.saturating_sub(self.config.monitor.retention_secs);
        if let Err(e) = self.registry.evict_terminal(cutoff).await {
            error!("Order eviction failed: {}", e);
        }
    }

    /// Runs the monitor until the task is dropped.
    ///
    /// Sleeps until the earliest due check, a newly scheduled check, or one
    /// monitor period, whichever comes first.
    pub async fn run(&self) -> anyhow::Result<()> {
        let period = self.config.monitor.period_secs.max(1);
        info!(
            "Monitor running (period {}s, confirmation delay {}s)",
            period, self.config.monitor.min_confirmation_secs
        );

        loop {
            let now = now_secs();
            self.tick(now).await;
            self.maybe_evict(now).await;

            let wait = match self.next_due().await {
                Some(due_at) => due_at.saturating_sub(now).clamp(1, period),
                None => period,
            };

            let received = {
                let mut inbox = self.inbox.lock().await;
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(wait)) => None,
                    received = inbox.recv() => Some(received),
                }
            };

            match received {
                Some(Some(check)) => self.push(check.order_hash, check.due_at).await,
                Some(None) => {
                    warn!("Monitor schedule channel closed");
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                None => {}
            }
        }
    }
}

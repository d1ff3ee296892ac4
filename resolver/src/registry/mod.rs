//! Order Registry
//!
//! Authoritative store of swap orders and their lifecycle state.
//!
//! Every mutation is a compare-and-set against the record's current status,
//! performed under the registry write lock and persisted before it becomes
//! visible. Callers never hold the lock across a chain call: they read a
//! snapshot, call the chain, then commit the result with a CAS that fails if
//! another path moved the order in the meantime.

pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::crypto::HashLock;
use crate::error::ResolverError;
use crate::order::{Order, OrderHash};
use crate::timelock::TimeLock;
use store::{MemoryOrderStore, OrderStore, StorageError};

// ============================================================================
// DATA MODEL
// ============================================================================

/// Order lifecycle: Pending -> SourceLocked -> DestLocked -> Completed,
/// with Failed reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    SourceLocked,
    DestLocked,
    Completed,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::SourceLocked => "source_locked",
            OrderStatus::DestLocked => "dest_locked",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Order created, waiting for source funds",
            OrderStatus::SourceLocked => "Source funds held by resolver, creating destination leg",
            OrderStatus::DestLocked => "Both legs locked, waiting for release",
            OrderStatus::Completed => "Funds released to receiver",
            OrderStatus::Failed => "Swap failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegRole {
    Source,
    Destination,
}

impl fmt::Display for LegRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegRole::Source => f.write_str("source"),
            LegRole::Destination => f.write_str("destination"),
        }
    }
}

/// How a leg holds its funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    /// HTLC escrow contract; reference is the escrow address
    Escrow,
    /// Funds held by the resolver account; reference is a transfer tx or custody marker
    Custody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegStatus {
    Pending,
    Locked,
    Released,
    Refunded,
}

/// One side of a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub role: LegRole,
    pub network: String,
    pub kind: Option<LegKind>,
    pub reference: Option<String>,
    pub status: LegStatus,
}

impl Leg {
    fn pending(role: LegRole, network: &str) -> Self {
        Self {
            role,
            network: network.to_string(),
            kind: None,
            reference: None,
            status: LegStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InsufficientAllowance,
    ChainCall,
    PartialCustody,
    /// Destination leg reached its cancellation phase before release
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
}

/// Order plus hashlock, timelock, legs and lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order: Order,
    pub hash_lock: HashLock,
    pub time_lock: TimeLock,
    pub source_leg: Leg,
    pub destination_leg: Leg,
    pub status: OrderStatus,
    pub failure: Option<Failure>,
    /// Source funds sit in resolver custody and need a compensating refund
    pub custody_held: bool,
    /// A release call has been issued and not yet resolved
    pub release_in_flight: bool,
    /// A refund call has been issued and not yet resolved
    #[serde(default)]
    pub refund_in_flight: bool,
    pub release_tx: Option<String>,
    pub refund_tx: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
    pub completed_at: Option<u64>,
}

impl OrderRecord {
    pub fn order_hash(&self) -> OrderHash {
        self.order.order_hash
    }

    pub fn leg(&self, role: LegRole) -> &Leg {
        match role {
            LegRole::Source => &self.source_leg,
            LegRole::Destination => &self.destination_leg,
        }
    }

    fn leg_mut(&mut self, role: LegRole) -> &mut Leg {
        match role {
            LegRole::Source => &mut self.source_leg,
            LegRole::Destination => &mut self.destination_leg,
        }
    }

    fn transition_error(&self, action: &'static str) -> ResolverError {
        ResolverError::InvalidTransition {
            order_hash: self.order.order_hash.to_string(),
            from: self.status,
            action,
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

pub struct OrderRegistry {
    orders: RwLock<HashMap<OrderHash, OrderRecord>>,
    store: Arc<dyn OrderStore>,
}

impl OrderRegistry {
    /// Opens the registry, reloading every record persisted in `store`.
    pub fn open(store: Arc<dyn OrderStore>) -> Result<Self, ResolverError> {
        let records = store.load_all()?;
        let count = records.len();
        let orders = records
            .into_iter()
            .map(|r| (r.order.order_hash, r))
            .collect::<HashMap<_, _>>();
        info!("Order registry opened with {} orders", count);
        Ok(Self {
            orders: RwLock::new(orders),
            store,
        })
    }

    /// Registry backed by a non-durable memory store.
    pub fn in_memory() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            store: Arc::new(MemoryOrderStore::new()),
        }
    }

    /// Registers a new order in `Pending`. Rejects a duplicate hash.
    pub async fn create(
        &self,
        order: Order,
        hash_lock: HashLock,
        time_lock: TimeLock,
        now: u64,
    ) -> Result<OrderHash, ResolverError> {
        let order_hash = order.order_hash;
        let record = OrderRecord {
            source_leg: Leg::pending(LegRole::Source, &order.source_network),
            destination_leg: Leg::pending(LegRole::Destination, &order.destination_network),
            order,
            hash_lock,
            time_lock,
            status: OrderStatus::Pending,
            failure: None,
            custody_held: false,
            release_in_flight: false,
            refund_in_flight: false,
            release_tx: None,
            refund_tx: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let mut orders = self.orders.write().await;
        if orders.contains_key(&order_hash) {
            return Err(ResolverError::Duplicate(order_hash.to_string()));
        }
        let persisted = record.clone();
        self.on_store(move |store| store.put(&persisted)).await?;
        orders.insert(order_hash, record);
        debug!("Order {} created", order_hash);
        Ok(order_hash)
    }

    /// Snapshot of one order.
    pub async fn get_status(&self, order_hash: &OrderHash) -> Result<OrderRecord, ResolverError> {
        self.orders
            .read()
            .await
            .get(order_hash)
            .cloned()
            .ok_or_else(|| ResolverError::NotFound(order_hash.to_string()))
    }

    /// Snapshot of all orders, oldest first.
    pub async fn list_orders(&self) -> Vec<OrderRecord> {
        let mut records: Vec<OrderRecord> = self.orders.read().await.values().cloned().collect();
        records.sort_by_key(|r| (r.created_at, r.order.order_hash));
        records
    }

    pub async fn orders_with_status(&self, status: OrderStatus) -> Vec<OrderRecord> {
        let mut records: Vec<OrderRecord> = self
            .orders
            .read()
            .await
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.created_at, r.order.order_hash));
        records
    }

    /// Runs a store operation on the blocking pool.
    async fn on_store<T, F>(&self, op: F) -> Result<T, ResolverError>
    where
        F: FnOnce(&dyn OrderStore) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?;
        Ok(result?)
    }

    /// Applies `f` to a copy of the record, persists it, then publishes it.
    async fn mutate<F>(&self, order_hash: &OrderHash, now: u64, f: F) -> Result<OrderRecord, ResolverError>
    where
        F: FnOnce(&mut OrderRecord) -> Result<(), ResolverError>,
    {
        let mut orders = self.orders.write().await;
        let current = orders
            .get(order_hash)
            .ok_or_else(|| ResolverError::NotFound(order_hash.to_string()))?;
        let mut updated = current.clone();
        f(&mut updated)?;
        updated.updated_at = now;
        let persisted = updated.clone();
        self.on_store(move |store| store.put(&persisted)).await?;
        orders.insert(*order_hash, updated.clone());
        Ok(updated)
    }

    /// Records a locked leg and advances the status.
    ///
    /// Source: Pending -> SourceLocked. Destination: SourceLocked -> DestLocked.
    pub async fn update_leg(
        &self,
        order_hash: &OrderHash,
        role: LegRole,
        kind: LegKind,
        reference: &str,
        now: u64,
    ) -> Result<OrderRecord, ResolverError> {
        let record = self
            .mutate(order_hash, now, |record| {
                let (expected, next, action) = match role {
                    LegRole::Source => (OrderStatus::Pending, OrderStatus::SourceLocked, "lock source leg"),
                    LegRole::Destination => (
                        OrderStatus::SourceLocked,
                        OrderStatus::DestLocked,
                        "lock destination leg",
                    ),
                };
                if record.status != expected {
                    return Err(record.transition_error(action));
                }
                let leg = record.leg_mut(role);
                leg.kind = Some(kind);
                leg.reference = Some(reference.to_string());
                leg.status = LegStatus::Locked;
                record.status = next;
                Ok(())
            })
            .await?;
        info!("Order {}: {} leg locked ({})", order_hash, role, reference);
        Ok(record)
    }

    /// Claims the release of a `DestLocked` order.
    ///
    /// At most one caller wins; the claim is persisted so a crash between the
    /// release call and `mark_completed` never leads to a second release.
    pub async fn begin_release(&self, order_hash: &OrderHash, now: u64) -> Result<OrderRecord, ResolverError> {
        self.mutate(order_hash, now, |record| {
            if record.status != OrderStatus::DestLocked || record.release_in_flight {
                return Err(record.transition_error("begin release"));
            }
            record.release_in_flight = true;
            Ok(())
        })
        .await
    }

    /// Drops a release claim after a release call that definitely failed.
    pub async fn abort_release(&self, order_hash: &OrderHash, now: u64) -> Result<OrderRecord, ResolverError> {
        self.mutate(order_hash, now, |record| {
            if record.status != OrderStatus::DestLocked || !record.release_in_flight {
                return Err(record.transition_error("abort release"));
            }
            record.release_in_flight = false;
            Ok(())
        })
        .await
    }

    /// DestLocked (with release claimed) -> Completed.
    pub async fn mark_completed(
        &self,
        order_hash: &OrderHash,
        release_tx: &str,
        now: u64,
    ) -> Result<OrderRecord, ResolverError> {
        let record = self
            .mutate(order_hash, now, |record| {
                if record.status != OrderStatus::DestLocked || !record.release_in_flight {
                    return Err(record.transition_error("complete"));
                }
                record.status = OrderStatus::Completed;
                record.release_in_flight = false;
                record.release_tx = Some(release_tx.to_string());
                record.destination_leg.status = LegStatus::Released;
                record.completed_at = Some(now);
                Ok(())
            })
            .await?;
        info!("Order {} completed (release tx {})", order_hash, release_tx);
        Ok(record)
    }

    /// Any non-terminal state -> Failed.
    ///
    /// An order with an unresolved release claim may have paid out already,
    /// so it can never be failed as holding refundable custody.
    pub async fn mark_failed(
        &self,
        order_hash: &OrderHash,
        kind: FailureKind,
        reason: &str,
        custody_held: bool,
        now: u64,
    ) -> Result<OrderRecord, ResolverError> {
        let record = self
            .mutate(order_hash, now, |record| {
                if record.status.is_terminal() {
                    return Err(record.transition_error("fail"));
                }
                if custody_held && record.release_in_flight {
                    return Err(record.transition_error("fail with custody held"));
                }
                record.status = OrderStatus::Failed;
                record.release_in_flight = false;
                record.custody_held = custody_held;
                record.failure = Some(Failure {
                    kind,
                    reason: reason.to_string(),
                });
                Ok(())
            })
            .await?;
        warn!(
            "Order {} failed ({:?}, custody held: {}): {}",
            order_hash, kind, custody_held, reason
        );
        Ok(record)
    }

    /// Claims the compensating refund of a failed order holding custody.
    pub async fn begin_refund(&self, order_hash: &OrderHash, now: u64) -> Result<OrderRecord, ResolverError> {
        self.mutate(order_hash, now, |record| {
            if record.status != OrderStatus::Failed
                || !record.custody_held
                || record.refund_in_flight
            {
                return Err(ResolverError::NotRefundable(record.order.order_hash.to_string()));
            }
            record.refund_in_flight = true;
            Ok(())
        })
        .await
    }

    pub async fn abort_refund(&self, order_hash: &OrderHash, now: u64) -> Result<OrderRecord, ResolverError> {
        self.mutate(order_hash, now, |record| {
            record.refund_in_flight = false;
            Ok(())
        })
        .await
    }

    /// Records the refund transfer and clears the custody flag.
    pub async fn record_refund(
        &self,
        order_hash: &OrderHash,
        refund_tx: &str,
        now: u64,
    ) -> Result<OrderRecord, ResolverError> {
        let record = self
            .mutate(order_hash, now, |record| {
                if record.status != OrderStatus::Failed || !record.refund_in_flight {
                    return Err(ResolverError::NotRefundable(record.order.order_hash.to_string()));
                }
                record.refund_in_flight = false;
                record.custody_held = false;
                record.refund_tx = Some(refund_tx.to_string());
                record.source_leg.status = LegStatus::Refunded;
                Ok(())
            })
            .await?;
        info!("Order {} refunded (tx {})", order_hash, refund_tx);
        Ok(record)
    }

    /// Removes terminal orders holding no custody, last updated before `older_than`.
    pub async fn evict_terminal(&self, older_than: u64) -> Result<usize, ResolverError> {
        let mut orders = self.orders.write().await;
        let expired: Vec<OrderHash> = orders
            .values()
            .filter(|r| {
                r.status.is_terminal()
                    && !r.custody_held
                    && !r.release_in_flight
                    && !r.refund_in_flight
                    && r.updated_at < older_than
            })
            .map(|r| r.order.order_hash)
            .collect();

        for order_hash in &expired {
            let target = *order_hash;
            self.on_store(move |store| store.remove(&target)).await?;
            orders.remove(order_hash);
        }
        if !expired.is_empty() {
            info!("Evicted {} terminal orders", expired.len());
        }
        Ok(expired.len())
    }
}

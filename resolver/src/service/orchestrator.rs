//! Escrow Orchestrator
//!
//! Executes the two legs of a swap against the chain adapters and records
//! each step in the registry:
//!
//! 1. `lock_source`: check the maker's allowance, then pull the making amount
//!    into resolver custody (Pending -> SourceLocked)
//! 2. `lock_destination`: commit resolver liquidity on the destination network
//!    as an escrow or custody leg (SourceLocked -> DestLocked)
//!
//! The destination leg is never attempted before the source leg is recorded.
//! A destination failure leaves the source funds in custody; the order is
//! marked failed with `custody_held` and can be compensated with
//! `refund_source`.

use chain_clients_common::{AdapterError, EscrowRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::chains::AdapterSet;
use crate::config::{Config, NetworkConfig};
use crate::crypto::HashLock;
use crate::error::ResolverError;
use crate::order::{build_order, OrderHash, SwapRequest};
use crate::registry::{FailureKind, LegKind, LegRole, OrderRecord, OrderRegistry, OrderStatus};
use crate::service::monitor::MonitorHandle;
use crate::timelock::{compute_time_lock, now_secs};

/// Result of a successfully submitted swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReceipt {
    pub order_hash: OrderHash,
    pub hash_lock: String,
    pub src_leg: String,
    pub dst_leg: String,
}

pub struct EscrowOrchestrator {
    config: Arc<Config>,
    registry: Arc<OrderRegistry>,
    adapters: Arc<AdapterSet>,
    scheduler: MonitorHandle,
}

impl EscrowOrchestrator {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<OrderRegistry>,
        adapters: Arc<AdapterSet>,
        scheduler: MonitorHandle,
    ) -> Self {
        Self {
            config,
            registry,
            adapters,
            scheduler,
        }
    }

    fn network(&self, name: &str) -> Result<&NetworkConfig, ResolverError> {
        self.config
            .network(name)
            .ok_or_else(|| ResolverError::Config(format!("Network {} is not configured", name)))
    }

    /// Runs a swap from request to `DestLocked` and schedules its release.
    pub async fn submit_swap(&self, request: &SwapRequest) -> Result<SwapReceipt, ResolverError> {
        let order_hash = self.register_swap(request).await?;
        self.execute_swap(&order_hash).await
    }

    /// Validates the request and registers the order in `Pending`.
    /// No chain call is made.
    pub async fn register_swap(&self, request: &SwapRequest) -> Result<OrderHash, ResolverError> {
        let order = build_order(&self.config, request)?;
        let now = now_secs();
        let hash_lock = HashLock::generate();
        let time_lock = compute_time_lock(now, &self.config.timelock)?;
        let hash_lock_hex = hash_lock.hash_hex();

        info!(
            "New swap: {} {} on {} -> {} on {} (maker {}, receiver {})",
            order.making_amount,
            order.source_token,
            order.source_network,
            order.destination_token,
            order.destination_network,
            order.maker,
            order.receiver
        );

        let order_hash = self.registry.create(order, hash_lock, time_lock, now).await?;
        debug!("Order {} registered with hashlock {}", order_hash, hash_lock_hex);
        Ok(order_hash)
    }

    /// Locks both legs of a registered order and schedules its release.
    pub async fn execute_swap(&self, order_hash: &OrderHash) -> Result<SwapReceipt, ResolverError> {
        let source = self.lock_source(order_hash).await?;
        let destination = self.lock_destination(order_hash).await?;

        let due_at = destination.created_at + self.config.monitor.min_confirmation_secs;
        self.scheduler.schedule(*order_hash, due_at);

        Ok(SwapReceipt {
            order_hash: *order_hash,
            hash_lock: destination.hash_lock.hash_hex(),
            src_leg: source.source_leg.reference.unwrap_or_default(),
            dst_leg: destination.destination_leg.reference.unwrap_or_default(),
        })
    }

    /// Pulls the maker's funds into resolver custody.
    ///
    /// The allowance is checked first; a short allowance fails the order
    /// before any funds move.
    pub async fn lock_source(&self, order_hash: &OrderHash) -> Result<OrderRecord, ResolverError> {
        let record = self.registry.get_status(order_hash).await?;
        if record.status != OrderStatus::Pending {
            return Err(ResolverError::InvalidTransition {
                order_hash: order_hash.to_string(),
                from: record.status,
                action: "lock source leg",
            });
        }
        let order = &record.order;
        let network = self.network(&order.source_network)?;

        let allowance = match self
            .adapters
            .get_allowance(
                &network.name,
                &order.maker,
                &network.resolver_address,
                &order.source_asset,
            )
            .await
        {
            Ok(allowance) => allowance,
            Err(e) => return Err(self.fail_clean(order_hash, &network.name, e).await),
        };

        if allowance < order.making_amount {
            return Err(self
                .fail_insufficient(order_hash, order.making_amount, allowance)
                .await);
        }

        let tx = match self
            .adapters
            .pull_funds(&network.name, &order.maker, order.making_amount, &order.source_asset)
            .await
        {
            Ok(tx) => tx,
            Err(AdapterError::InsufficientAllowance { required, available }) => {
                return Err(self.fail_insufficient(order_hash, required, available).await);
            }
            Err(e) => return Err(self.fail_clean(order_hash, &network.name, e).await),
        };

        match self
            .registry
            .update_leg(order_hash, LegRole::Source, LegKind::Custody, &tx.0, now_secs())
            .await
        {
            Ok(record) => Ok(record),
            Err(e) => Err(self
                .fail_unrecorded(order_hash, LegRole::Source, &network.name, &tx.0, e)
                .await),
        }
    }

    /// Commits resolver liquidity on the destination network.
    ///
    /// Contract-based networks get an HTLC escrow; custodial networks get a
    /// custody leg backed by the resolver's balance and paid out on release.
    pub async fn lock_destination(&self, order_hash: &OrderHash) -> Result<OrderRecord, ResolverError> {
        let record = self.registry.get_status(order_hash).await?;
        if record.status != OrderStatus::SourceLocked {
            return Err(ResolverError::InvalidTransition {
                order_hash: order_hash.to_string(),
                from: record.status,
                action: "lock destination leg",
            });
        }
        let network = self.network(&record.order.destination_network)?;

        let leg = if network.is_contract_based() {
            self.create_escrow_leg(&record, network).await
        } else {
            self.reserve_custody_leg(&record, network).await
        };

        match leg {
            Ok((kind, reference)) => match self
                .registry
                .update_leg(order_hash, LegRole::Destination, kind, &reference, now_secs())
                .await
            {
                Ok(record) => Ok(record),
                Err(e) => Err(self
                    .fail_unrecorded(order_hash, LegRole::Destination, &network.name, &reference, e)
                    .await),
            },
            Err(reason) => {
                error!(
                    "Order {}: destination leg on {} failed with source funds in custody: {}",
                    order_hash, network.name, reason
                );
                if let Err(e) = self
                    .registry
                    .mark_failed(order_hash, FailureKind::PartialCustody, &reason, true, now_secs())
                    .await
                {
                    error!("Order {}: failed to record partial custody failure: {}", order_hash, e);
                }
                Err(ResolverError::PartialCustodyFailure {
                    order_hash: order_hash.to_string(),
                    reason,
                })
            }
        }
    }

    async fn create_escrow_leg(
        &self,
        record: &OrderRecord,
        network: &NetworkConfig,
    ) -> Result<(LegKind, String), String> {
        let order = &record.order;
        let request = EscrowRequest {
            order_hash: *order.order_hash.as_bytes(),
            asset: order.destination_asset.clone(),
            amount: order.taking_amount,
            hash_lock: record.hash_lock.hash,
            time_locks: record.time_lock.packed(),
            payer: network.resolver_address.clone(),
            payee: order.receiver.clone(),
        };
        self.adapters
            .create_escrow(&network.name, &request)
            .await
            .map(|leg| (LegKind::Escrow, leg.0))
            .map_err(|e| format!("createEscrow failed: {}", e))
    }

    async fn reserve_custody_leg(
        &self,
        record: &OrderRecord,
        network: &NetworkConfig,
    ) -> Result<(LegKind, String), String> {
        let order = &record.order;
        let balance = self
            .adapters
            .get_balance(&network.name, &network.resolver_address, &order.destination_asset)
            .await
            .map_err(|e| format!("balance check failed: {}", e))?;
        if balance < order.taking_amount {
            return Err(format!(
                "resolver liquidity {} below taking amount {}",
                balance, order.taking_amount
            ));
        }
        Ok((LegKind::Custody, format!("custody:{}", order.order_hash)))
    }

    /// Compensating action for a failed order holding source custody:
    /// returns the making amount to the maker on the source network.
    pub async fn refund_source(&self, order_hash: &OrderHash) -> Result<OrderRecord, ResolverError> {
        let record = self.registry.begin_refund(order_hash, now_secs()).await?;
        let order = &record.order;
        info!(
            "Order {}: refunding {} {} to {} on {}",
            order_hash, order.making_amount, order.source_token, order.maker, order.source_network
        );

        match self
            .adapters
            .direct_transfer(
                &order.source_network,
                &order.source_asset,
                order.making_amount,
                &order.maker,
            )
            .await
        {
            Ok(tx) => self.registry.record_refund(order_hash, &tx.0, now_secs()).await,
            Err(AdapterError::Timeout) => {
                // Outcome unknown; keep the claim so the refund is not sent twice
                warn!(
                    "Order {}: refund timed out, leaving refund claimed for manual reconciliation",
                    order_hash
                );
                Err(ResolverError::chain(&order.source_network, AdapterError::Timeout))
            }
            Err(e) => {
                self.registry.abort_refund(order_hash, now_secs()).await?;
                Err(ResolverError::chain(&order.source_network, e))
            }
        }
    }

    /// Fails an order whose leg moved funds on-chain but could not be recorded.
    ///
    /// The maker's funds are in custody either way, so the order is failed
    /// with `custody_held` and the on-chain reference kept in the reason.
    async fn fail_unrecorded(
        &self,
        order_hash: &OrderHash,
        role: LegRole,
        network: &str,
        reference: &str,
        cause: ResolverError,
    ) -> ResolverError {
        error!(
            "Order {}: {} leg {} on {} succeeded but was not recorded: {}",
            order_hash, role, reference, network, cause
        );
        let reason = format!(
            "{} leg {} on {} not recorded: {}",
            role, reference, network, cause
        );
        if let Err(e) = self
            .registry
            .mark_failed(order_hash, FailureKind::PartialCustody, &reason, true, now_secs())
            .await
        {
            error!(
                "Order {}: failed to record custody of {} on {}, reconcile manually: {}",
                order_hash, reference, network, e
            );
        }
        ResolverError::PartialCustodyFailure {
            order_hash: order_hash.to_string(),
            reason,
        }
    }

    /// Fails an order whose source leg never moved funds.
    async fn fail_clean(&self, order_hash: &OrderHash, network: &str, error: AdapterError) -> ResolverError {
        let reason = format!("{} chain call failed: {}", network, error);
        if let Err(e) = self
            .registry
            .mark_failed(order_hash, FailureKind::ChainCall, &reason, false, now_secs())
            .await
        {
            error!("Order {}: failed to record failure: {}", order_hash, e);
        }
        ResolverError::chain(network, error)
    }

    async fn fail_insufficient(&self, order_hash: &OrderHash, required: u128, available: u128) -> ResolverError {
        let err = ResolverError::InsufficientAllowance { required, available };
        let reason = format!(
            "{}. Please approve the resolver to spend your tokens first.",
            err
        );
        if let Err(e) = self
            .registry
            .mark_failed(order_hash, FailureKind::InsufficientAllowance, &reason, false, now_secs())
            .await
        {
            error!("Order {}: failed to record failure: {}", order_hash, e);
        }
        err
    }
}

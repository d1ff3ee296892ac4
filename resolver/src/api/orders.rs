//! Swap and order handlers
//!
//! Handlers never touch chain adapters directly; they go through the
//! orchestrator for writes and the registry for reads.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use super::generic::{error_reply, status_for, ApiResponse};
use crate::config::NetworkKind;
use crate::context::Resolver;
use crate::order::{OrderHash, SwapRequest};
use crate::registry::{Failure, Leg, OrderRecord, OrderStatus};
use crate::timelock::{now_secs, TimeLock, TimeLockDurations};

// ============================================================================
// RESPONSE STRUCTURES
// ============================================================================

/// Flat response of `POST /swap`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_lock: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_leg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_leg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full projection of one order.
///
/// The secret is only disclosed once the order is completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_hash: String,
    pub status: OrderStatus,
    pub status_description: String,
    pub maker: String,
    pub receiver: String,
    pub source_network: String,
    pub destination_network: String,
    pub source_token: String,
    pub destination_token: String,
    pub making_amount: String,
    pub taking_amount: String,
    pub hash_lock: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub time_lock: TimeLock,
    /// Current timelock phase, `null` before the private withdrawal deadline
    pub phase: Option<String>,
    pub seconds_until_public_cancellation: u64,
    pub source_leg: Leg,
    pub destination_leg: Leg,
    pub failure: Option<Failure>,
    pub custody_held: bool,
    pub release_tx: Option<String>,
    pub refund_tx: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
    pub completed_at: Option<u64>,
}

impl OrderView {
    pub fn from_record(record: &OrderRecord, now: u64) -> Self {
        let order = &record.order;
        let secret = (record.status == OrderStatus::Completed)
            .then(|| record.hash_lock.secret.to_hex());

        Self {
            order_hash: order.order_hash.to_string(),
            status: record.status,
            status_description: record.status.description().to_string(),
            maker: order.maker.clone(),
            receiver: order.receiver.clone(),
            source_network: order.source_network.clone(),
            destination_network: order.destination_network.clone(),
            source_token: order.source_token.clone(),
            destination_token: order.destination_token.clone(),
            making_amount: order.making_amount.to_string(),
            taking_amount: order.taking_amount.to_string(),
            hash_lock: record.hash_lock.hash_hex(),
            secret,
            time_lock: record.time_lock,
            phase: record
                .time_lock
                .phase_at(now)
                .map(|phase| phase.as_str().to_string()),
            seconds_until_public_cancellation: record
                .time_lock
                .remaining_until_public_cancellation(now),
            source_leg: record.source_leg.clone(),
            destination_leg: record.destination_leg.clone(),
            failure: record.failure.clone(),
            custody_held: record.custody_held,
            release_tx: record.release_tx.clone(),
            refund_tx: record.refund_tx.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            completed_at: record.completed_at,
        }
    }
}

/// One line of `GET /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_hash: String,
    pub status: OrderStatus,
    pub source_network: String,
    pub destination_network: String,
    pub source_token: String,
    pub destination_token: String,
    pub making_amount: String,
    pub custody_held: bool,
    pub created_at: u64,
    pub completed_at: Option<u64>,
}

impl From<&OrderRecord> for OrderSummary {
    fn from(record: &OrderRecord) -> Self {
        Self {
            order_hash: record.order.order_hash.to_string(),
            status: record.status,
            source_network: record.order.source_network.clone(),
            destination_network: record.order.destination_network.clone(),
            source_token: record.order.source_token.clone(),
            destination_token: record.order.destination_token.clone(),
            making_amount: record.order.making_amount.to_string(),
            custody_held: record.custody_held,
            created_at: record.created_at,
            completed_at: record.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub name: String,
    pub kind: String,
    pub chain_id: u64,
    pub resolver_address: String,
    pub address_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escrow_factory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_deposit_wei: Option<String>,
    pub tokens: Vec<TokenInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub networks: Vec<NetworkInfo>,
    pub time_locks: TimeLockDurations,
    pub monitor_period_secs: u64,
    pub min_confirmation_secs: u64,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /swap
///
/// Runs both legs synchronously. On success the order is `dest_locked` and the
/// monitor owns the release.
pub async fn swap_handler(
    request: SwapRequest,
    resolver: Arc<Resolver>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Rejection> {
    // Once registered, the order hash is returned even if a leg fails
    let mut order_hash = None;
    let result = match resolver.orchestrator.register_swap(&request).await {
        Ok(hash) => {
            order_hash = Some(hash);
            resolver.orchestrator.execute_swap(&hash).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(receipt) => {
            info!("Swap accepted: {}", receipt.order_hash);
            let response = SwapResponse {
                success: true,
                order_hash: Some(receipt.order_hash.to_string()),
                hash_lock: Some(receipt.hash_lock),
                src_leg: Some(receipt.src_leg),
                dst_leg: Some(receipt.dst_leg),
                error: None,
            };
            Ok(warp::reply::with_status(
                warp::reply::json(&response),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Swap failed: {}", e);
            } else {
                warn!("Swap rejected: {}", e);
            }
            let response = SwapResponse {
                success: false,
                order_hash: order_hash.map(|hash| hash.to_string()),
                hash_lock: None,
                src_leg: None,
                dst_leg: None,
                error: Some(e.to_string()),
            };
            Ok(warp::reply::with_status(warp::reply::json(&response), status))
        }
    }
}

fn parse_order_hash(raw: &str) -> Result<OrderHash, warp::reply::WithStatus<warp::reply::Json>> {
    OrderHash::from_str(raw).map_err(|e| {
        warp::reply::with_status(
            warp::reply::json(&ApiResponse::<()>::err(format!(
                "Invalid order hash {}: {}",
                raw, e
            ))),
            StatusCode::BAD_REQUEST,
        )
    })
}

/// GET /order/:orderHash
pub async fn get_order_handler(
    raw_hash: String,
    resolver: Arc<Resolver>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Rejection> {
    let order_hash = match parse_order_hash(&raw_hash) {
        Ok(hash) => hash,
        Err(reply) => return Ok(reply),
    };

    match resolver.registry.get_status(&order_hash).await {
        Ok(record) => Ok(warp::reply::with_status(
            warp::reply::json(&ApiResponse::ok(OrderView::from_record(&record, now_secs()))),
            StatusCode::OK,
        )),
        Err(e) => Ok(error_reply(&e)),
    }
}

/// GET /orders
pub async fn list_orders_handler(resolver: Arc<Resolver>) -> Result<impl Reply, Rejection> {
    let orders: Vec<OrderSummary> = resolver
        .registry
        .list_orders()
        .await
        .iter()
        .map(OrderSummary::from)
        .collect();
    let count = orders.len();
    Ok(warp::reply::json(&ApiResponse::ok(OrdersResponse {
        orders,
        count,
    })))
}

/// POST /order/:orderHash/refund
pub async fn refund_handler(
    raw_hash: String,
    resolver: Arc<Resolver>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Rejection> {
    let order_hash = match parse_order_hash(&raw_hash) {
        Ok(hash) => hash,
        Err(reply) => return Ok(reply),
    };

    match resolver.orchestrator.refund_source(&order_hash).await {
        Ok(record) => {
            info!("Refunded source funds for order {}", order_hash);
            Ok(warp::reply::with_status(
                warp::reply::json(&ApiResponse::ok(OrderView::from_record(&record, now_secs()))),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            warn!("Refund for order {} failed: {}", order_hash, e);
            Ok(error_reply(&e))
        }
    }
}

/// GET /info
pub async fn info_handler(resolver: Arc<Resolver>) -> Result<impl Reply, Rejection> {
    let config = &resolver.config;
    let networks = config
        .networks
        .iter()
        .map(|network| {
            let (escrow_factory, safety_deposit_wei) = match &network.kind {
                NetworkKind::ContractBased {
                    escrow_factory_addr,
                    safety_deposit_wei,
                } => (
                    Some(escrow_factory_addr.clone()),
                    Some(safety_deposit_wei.clone()),
                ),
                NetworkKind::Custodial => (None, None),
            };
            NetworkInfo {
                name: network.name.clone(),
                kind: network.kind_name().to_string(),
                chain_id: network.chain_id,
                resolver_address: network.resolver_address.clone(),
                address_format: network.address_format.as_str().to_string(),
                escrow_factory,
                safety_deposit_wei,
                tokens: network
                    .assets
                    .iter()
                    .map(|asset| TokenInfo {
                        symbol: asset.symbol.clone(),
                        address: asset.address.clone(),
                        decimals: asset.decimals,
                    })
                    .collect(),
            }
        })
        .collect();

    Ok(warp::reply::json(&ApiResponse::ok(InfoResponse {
        networks,
        time_locks: config.timelock,
        monitor_period_secs: config.monitor.period_secs,
        min_confirmation_secs: config.monitor.min_confirmation_secs,
    })))
}

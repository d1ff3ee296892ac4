//! Generic API structures and server
//!
//! Shared response envelope, warp filter helpers, the rejection handler and
//! the `ApiServer` that assembles all routes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};
use warp::hyper::body::Bytes;
use warp::{
    http::{Method, StatusCode},
    Filter, Rejection, Reply,
};

use super::orders;
use crate::context::Resolver;
use crate::error::ResolverError;

// ============================================================================
// SHARED REQUEST/RESPONSE STRUCTURES
// ============================================================================

/// Standardized response structure for all API endpoints except `POST /swap`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful)
    pub data: Option<T>,
    /// Error message (if failed)
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Maps the error taxonomy onto HTTP status codes.
pub(crate) fn status_for(error: &ResolverError) -> StatusCode {
    match error {
        ResolverError::Validation(_) | ResolverError::InsufficientAllowance { .. } => {
            StatusCode::BAD_REQUEST
        }
        ResolverError::ChainCall { .. } if error.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        ResolverError::ChainCall { .. } | ResolverError::PartialCustodyFailure { .. } => {
            StatusCode::BAD_GATEWAY
        }
        ResolverError::NotFound(_) => StatusCode::NOT_FOUND,
        ResolverError::Duplicate(_)
        | ResolverError::InvalidTransition { .. }
        | ResolverError::NotRefundable(_) => StatusCode::CONFLICT,
        ResolverError::Storage(_) | ResolverError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Error reply in the standard envelope.
pub(crate) fn error_reply(error: &ResolverError) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()>::err(error.to_string())),
        status_for(error),
    )
}

// ============================================================================
// WARP FILTER HELPERS
// ============================================================================

/// Creates a warp filter that injects the resolver context into handlers.
pub fn with_resolver(
    resolver: Arc<Resolver>,
) -> impl Filter<Extract = (Arc<Resolver>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || resolver.clone())
}

// ============================================================================
// CUSTOM REJECTION TYPES
// ============================================================================

/// Custom rejection for JSON deserialization errors
#[derive(Debug)]
pub struct JsonDeserializeError(pub String);

impl warp::reject::Reject for JsonDeserializeError {}

// ============================================================================
// CORS CONFIGURATION
// ============================================================================

/// Creates a CORS filter based on the configured allowed origins.
fn create_cors_filter(allowed_origins: &[String]) -> warp::cors::Builder {
    let methods = vec![Method::GET, Method::POST, Method::OPTIONS];

    if allowed_origins.iter().any(|o| o == "*") {
        warp::cors()
            .allow_any_origin()
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    } else {
        let origins: Vec<&str> = allowed_origins.iter().map(|s| s.as_str()).collect();
        warp::cors()
            .allow_origins(origins)
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    }
}

// ============================================================================
// REJECTION HANDLER
// ============================================================================

/// Global rejection handler for all API routes.
///
/// Converts warp rejections into the standard error envelope.
pub async fn handle_rejection(rej: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, message) = if let Some(err) = rej.find::<JsonDeserializeError>() {
        (StatusCode::BAD_REQUEST, err.0.clone())
    } else if let Some(err) = rej.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", err))
    } else if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "Endpoint not found".to_string())
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()>::err(message)),
        status,
    ))
}

// ============================================================================
// API SERVER IMPLEMENTATION
// ============================================================================

/// REST API server for the resolver.
pub struct ApiServer {
    resolver: Arc<Resolver>,
}

impl ApiServer {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self { resolver }
    }

    /// Starts the API server on the configured host and port.
    pub async fn run(&self) -> Result<()> {
        let api = &self.resolver.config.api;
        info!("Starting API server on {}:{}", api.host, api.port);

        let routes = self.create_routes();

        let addr: std::net::SocketAddr = format!("{}:{}", api.host, api.port)
            .parse()
            .context("Failed to parse API server address")?;

        warp::serve(routes).run(addr).await;

        Ok(())
    }

    /// Creates all API routes for the server.
    pub(crate) fn create_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        let resolver = self.resolver.clone();

        // Health check endpoint - returns service status
        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| {
                warp::reply::json(&ApiResponse::ok("Resolver Service is running".to_string()))
            });

        // GET /info - networks, tokens, timelocks and safety deposits
        let info = warp::path("info")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_resolver(resolver.clone()))
            .and_then(orders::info_handler);

        // POST /swap - submit a swap
        let swap_resolver = resolver.clone();
        let swap = warp::path("swap")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::bytes())
            .and_then(move |body: Bytes| {
                let resolver = swap_resolver.clone();
                async move {
                    debug!("POST /swap - Received body: {}", String::from_utf8_lossy(&body));
                    match serde_json::from_slice::<crate::order::SwapRequest>(&body) {
                        Ok(request) => orders::swap_handler(request, resolver).await,
                        Err(e) => {
                            error!("Swap request deserialization failed: {}", e);
                            Err(warp::reject::custom(JsonDeserializeError(format!(
                                "Invalid JSON: {}",
                                e
                            ))))
                        }
                    }
                }
            });

        // GET /order/:orderHash - order projection
        let get_order = warp::path("order")
            .and(warp::path::param::<String>())
            .and(warp::path::end())
            .and(warp::get())
            .and(with_resolver(resolver.clone()))
            .and_then(orders::get_order_handler);

        // POST /order/:orderHash/refund - compensating refund
        let refund = warp::path("order")
            .and(warp::path::param::<String>())
            .and(warp::path("refund"))
            .and(warp::path::end())
            .and(warp::post())
            .and(with_resolver(resolver.clone()))
            .and_then(orders::refund_handler);

        // GET /orders - order summaries
        let list_orders = warp::path("orders")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_resolver(resolver))
            .and_then(orders::list_orders_handler);

        health
            .or(info)
            .or(swap)
            .or(get_order)
            .or(refund)
            .or(list_orders)
            .with(create_cors_filter(&self.resolver.config.api.cors_origins))
            .recover(handle_rejection)
    }

    /// Public method for testing - exposes routes for integration tests
    pub fn test_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        self.create_routes()
    }
}

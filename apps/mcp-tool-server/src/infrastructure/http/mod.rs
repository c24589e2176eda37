//! HTTP Transport
//!
//! Serves MCP as JSON over HTTP alongside health and metrics endpoints.
//!
//! # Endpoints
//!
//! - `POST /mcp` - One JSON-RPC message. Requests get a JSON response;
//!   notifications get `202 Accepted` with no body
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /metrics` - Prometheus metrics in text format
//!
//! A client that disconnects mid-call drops the handler future, which
//! cancels the in-flight upstream request.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::protocol::{
    self, Incoming, McpHandler, PARSE_ERROR, SERVER_NAME, parse_value,
};

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process is serving.
    pub status: &'static str,
    /// Advertised server name.
    pub server: &'static str,
    /// Server version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Number of registered tools.
    pub tool_count: usize,
}

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the HTTP routes.
#[derive(Debug)]
pub struct HttpState {
    handler: McpHandler,
    version: String,
    started_at: Instant,
}

impl HttpState {
    /// Create new state.
    #[must_use]
    pub fn new(handler: McpHandler, version: impl Into<String>) -> Self {
        Self {
            handler,
            version: version.into(),
            started_at: Instant::now(),
        }
    }
}

/// Build the router.
#[must_use]
pub fn router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Server
// =============================================================================

/// MCP HTTP server.
pub struct HttpServer {
    addr: SocketAddr,
    state: Arc<HttpState>,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(addr: SocketAddr, state: Arc<HttpState>, cancel: CancellationToken) -> Self {
        Self {
            addr,
            state,
            cancel,
        }
    }

    /// Run until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.addr, e.to_string()))?;

        tracing::info!(
            addr = %self.addr,
            tools = self.state.handler.registry().len(),
            "Serving MCP over HTTP"
        );

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn mcp_handler(State(state): State<Arc<HttpState>>, body: Bytes) -> Response {
    let incoming = match serde_json::from_slice(&body) {
        Ok(value) => parse_value(value),
        Err(e) => {
            let response = protocol::Response::error(
                None,
                PARSE_ERROR,
                format!("parse error: {e}"),
                None,
            );
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    match incoming {
        Incoming::Request(request) => {
            let span = tracing::debug_span!(
                "mcp_http_request",
                request_id = %Uuid::new_v4(),
                method = %request.method,
            );
            match state.handler.handle_request(request).instrument(span).await {
                Some(response) => (StatusCode::OK, Json(response)).into_response(),
                None => StatusCode::ACCEPTED.into_response(),
            }
        }
        Incoming::Reply => StatusCode::ACCEPTED.into_response(),
        Incoming::Invalid(response) => (StatusCode::BAD_REQUEST, Json(response)).into_response(),
    }
}

async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(build_health_response(&state)))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HttpState) -> HealthResponse {
    HealthResponse {
        status: "healthy",
        server: SERVER_NAME,
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        tool_count: state.handler.registry().len(),
    }
}

// =============================================================================
// Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind the listener.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

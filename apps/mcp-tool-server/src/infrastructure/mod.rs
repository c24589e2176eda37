//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the two MCP transports.

/// Configuration snapshot, `.env` loading and credential resolution.
pub mod config;

/// reqwest client for upstream APIs.
pub mod upstream;

/// JSON-RPC message handling shared by both transports.
pub mod protocol;

/// Newline-delimited JSON-RPC over stdin/stdout.
pub mod stdio;

/// Streamable HTTP endpoint plus health and metrics routes.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Logging and OpenTelemetry tracing integration.
pub mod telemetry;

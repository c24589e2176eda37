#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::panic
    )
)]

//! MCP Tool Server - Brokerage and Market Data Tools
//!
//! Exposes a small set of read-only tools to MCP clients: an Alpaca account
//! lookup, an Alpaca positions listing, Polygon last-trade and daily
//! open/close lookups, and a connectivity `ping`. Each upstream tool makes
//! one GET and returns the upstream JSON unchanged.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Value types with no I/O
//!   - `credentials`: Upstreams, auth material, credential bundles
//!   - `market`: Validated symbols and trading dates
//!   - `tool`: Tool descriptors, parameter schemas, argument coercion
//!
//! - **Application**: Ports, dispatch and the tools themselves
//!   - `ports`: Upstream HTTP and credential interfaces
//!   - `services`: Write-once tool registry and invocation
//!   - `tools`: `ping`, Alpaca and Polygon tools
//!
//! - **Infrastructure**: Adapters and transports
//!   - `config`: Environment snapshot, `.env` loading, credential resolver
//!   - `upstream`: reqwest client
//!   - `protocol`: JSON-RPC / MCP method handling
//!   - `stdio`, `http`: transports
//!   - `metrics`, `telemetry`: Prometheus and tracing
//!
//! # Request Flow
//!
//! ```text
//! stdio / HTTP ──► McpHandler ──► ToolRegistry::invoke ──► handler
//!                                                           │
//!                           CredentialPort::resolve ◄───────┤
//!                           UpstreamPort::get_json  ◄───────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Value types with no external dependencies.
pub mod domain;

/// Application layer - Ports, dispatch and tools.
pub mod application;

/// Infrastructure layer - Adapters and transports.
pub mod infrastructure;

/// Structured error payloads returned to clients.
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::credentials::{AuthMaterial, ConfigError, CredentialBundle, Upstream};
pub use domain::market::{MarketValueError, Symbol, TradingDate};
pub use domain::tool::{
    ParamSpec, ParamType, RegistrationError, ToolArguments, ToolDescriptor, ValidationError,
};

// Application
pub use application::ports::{CredentialPort, UpstreamError, UpstreamPort, UpstreamRequest};
pub use application::services::{
    DispatchError, ToolError, ToolHandler, ToolRegistry, async_handler, sync_handler,
};
pub use application::tools::{ToolDependencies, build_registry, register_all};

// Errors
pub use error::{ErrorCode, ErrorPayload};

// Infrastructure config
pub use infrastructure::config::{CredentialResolver, DotenvStatus, ToolsConfig, load_dotenv};

// Upstream client
pub use infrastructure::upstream::HttpUpstreamClient;

// Transports
pub use infrastructure::http::{HttpServer, HttpServerError, HttpState};
pub use infrastructure::protocol::McpHandler;
pub use infrastructure::stdio::StdioServer;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};

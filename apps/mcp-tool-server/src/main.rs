//! MCP Tool Server Binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin mcp-tool-server            # stdio (default)
//! cargo run --bin mcp-tool-server -- http    # HTTP on MCP_HTTP_HOST:MCP_HTTP_PORT
//! ```
//!
//! # Environment Variables
//!
//! ## Credentials (each tool fails on its own if its keys are missing)
//! - `ALPACA_API_KEY`, `ALPACA_SECRET_KEY`: Alpaca trading API keys
//! - `ALPACA_BASE_URL`: Alpaca base URL (default: paper trading)
//! - `POLYGON_API_KEY`: Polygon API key
//! - `POLYGON_BASE_URL`: Polygon base URL (default: <https://api.polygon.io>)
//!
//! ## Optional
//! - `MCP_HTTP_HOST`: HTTP bind address (default: 127.0.0.1)
//! - `MCP_HTTP_PORT`: HTTP port (default: 8000)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: mcp-tool-server)
//! - `RUST_LOG`: Log filter (default: mcp_tool_server=info)
//!
//! A `.env` file in the working directory or any ancestor is loaded first.
//! Variables already set in the environment take precedence.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use mcp_tool_server::infrastructure::telemetry;
use mcp_tool_server::{
    CredentialResolver, DotenvStatus, HttpServer, HttpState, HttpUpstreamClient, McpHandler,
    StdioServer, ToolDependencies, ToolsConfig, build_registry, init_metrics, load_dotenv,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only Alpaca and Polygon tools for MCP clients.
#[derive(Debug, Parser)]
#[command(name = "mcp-tool-server", version, about)]
struct Cli {
    /// Transport to serve on.
    #[arg(value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Newline-delimited JSON-RPC on stdin/stdout.
    Stdio,
    /// JSON-RPC over HTTP POST /mcp.
    Http,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let dotenv_status = load_dotenv();

    // Initialize telemetry (tracing to stderr, optional OTLP)
    let telemetry_guard = telemetry::init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?cli.transport,
        otel = telemetry_guard.is_exporting(),
        "Starting MCP tool server"
    );
    match &dotenv_status {
        DotenvStatus::Loaded(path) => tracing::info!(path = %path.display(), "Loaded .env"),
        DotenvStatus::NotFound => tracing::debug!("No .env file found"),
        DotenvStatus::Invalid { path, error } => {
            tracing::warn!(path = %path.display(), error = %error, "Failed to parse .env");
        }
    }

    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Prometheus recorder unavailable, metrics disabled");
    }

    let config = ToolsConfig::from_env();
    log_config(&config);

    let upstream = HttpUpstreamClient::new().context("failed to build upstream HTTP client")?;
    let deps = ToolDependencies::new(
        Arc::new(upstream),
        Arc::new(CredentialResolver::new(config.clone())),
    );
    let registry = Arc::new(build_registry(&deps).context("failed to register tools")?);
    let handler = McpHandler::new(registry);

    let shutdown_token = CancellationToken::new();
    tokio::spawn(await_shutdown(shutdown_token.clone()));

    let result = match cli.transport {
        Transport::Stdio => StdioServer::new(handler, shutdown_token.clone())
            .run()
            .await
            .context("stdio transport failed"),
        Transport::Http => {
            let state = Arc::new(HttpState::new(handler, env!("CARGO_PKG_VERSION")));
            HttpServer::new(config.server.addr(), state, shutdown_token.clone())
                .run()
                .await
                .context("HTTP transport failed")
        }
    };

    tracing::info!("MCP tool server stopped");

    if cli.transport == Transport::Stdio && shutdown_token.is_cancelled() {
        // A pending blocking read on stdin would hold up runtime shutdown.
        drop(telemetry_guard);
        std::process::exit(i32::from(result.is_err()));
    }
    result
}

/// Log the parsed configuration. Never logs secret values.
fn log_config(config: &ToolsConfig) {
    tracing::info!(
        alpaca_configured = config.alpaca_configured(),
        polygon_configured = config.polygon_configured(),
        http_addr = %config.server.addr(),
        "Configuration loaded"
    );
    tracing::debug!(
        alpaca_base_url = %config.alpaca.base_url,
        polygon_base_url = %config.polygon.base_url,
        "Upstream endpoints"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => return,
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );

    // Force exit if the transport does not wind down in time.
    tokio::time::sleep(SHUTDOWN_TIMEOUT).await;
    tracing::warn!("Graceful shutdown timed out, exiting");
    std::process::exit(1);
}

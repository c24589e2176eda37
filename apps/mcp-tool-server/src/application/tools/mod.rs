//! Concrete Tools
//!
//! | Tool | Upstream | Request |
//! |------|----------|---------|
//! | `ping` | none | - |
//! | `alpaca_get_account` | Alpaca | `GET /v2/account` |
//! | `alpaca_list_positions` | Alpaca | `GET /v2/positions` |
//! | `polygon_last_trade` | Polygon | `GET /v2/last/trade/{SYMBOL}` |
//! | `polygon_daily_ohlc` | Polygon | `GET /v1/open-close/{SYMBOL}/{date}` |
//!
//! Every upstream tool resolves credentials first and makes at most one
//! upstream call per invocation.

mod alpaca;
mod ping;
mod polygon;

use std::sync::Arc;

use crate::application::ports::{CredentialPort, UpstreamPort};
use crate::application::services::ToolRegistry;
use crate::domain::tool::RegistrationError;

pub use alpaca::{AlpacaGet, alpaca_get_account, alpaca_list_positions};
pub use ping::ping;
pub use polygon::{PolygonDailyOhlc, PolygonLastTrade, polygon_daily_ohlc, polygon_last_trade};

/// Collaborators injected into every upstream tool.
#[derive(Clone)]
pub struct ToolDependencies {
    /// Performs the outbound HTTP call.
    pub upstream: Arc<dyn UpstreamPort>,
    /// Resolves auth material at call time.
    pub credentials: Arc<dyn CredentialPort>,
}

impl ToolDependencies {
    /// Bundle the collaborators.
    #[must_use]
    pub fn new(upstream: Arc<dyn UpstreamPort>, credentials: Arc<dyn CredentialPort>) -> Self {
        Self {
            upstream,
            credentials,
        }
    }
}

/// Register every tool on an existing registry.
pub fn register_all(
    registry: &mut ToolRegistry,
    deps: &ToolDependencies,
) -> Result<(), RegistrationError> {
    let (descriptor, handler) = ping();
    registry.register(descriptor, handler)?;

    for (descriptor, handler) in [
        alpaca_get_account(deps),
        alpaca_list_positions(deps),
        polygon_last_trade(deps),
        polygon_daily_ohlc(deps),
    ] {
        registry.register(descriptor, handler)?;
    }
    Ok(())
}

/// Build a registry holding every tool.
pub fn build_registry(deps: &ToolDependencies) -> Result<ToolRegistry, RegistrationError> {
    let mut registry = ToolRegistry::new();
    register_all(&mut registry, deps)?;
    tracing::info!(tools = registry.len(), "Tool registry built");
    Ok(registry)
}

//! Polygon market data tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::ToolDependencies;
use crate::application::ports::UpstreamRequest;
use crate::application::services::{ToolError, ToolHandler};
use crate::domain::credentials::Upstream;
use crate::domain::market::{MarketValueError, Symbol, TradingDate};
use crate::domain::tool::{ParamSpec, ParamType, ToolArguments, ToolDescriptor, ValidationError};

fn symbol_arg(args: &ToolArguments) -> Result<Symbol, ToolError> {
    Symbol::parse(args.string("symbol")?).map_err(|e| invalid("symbol", &e))
}

fn date_arg(args: &ToolArguments) -> Result<TradingDate, ToolError> {
    TradingDate::parse(args.string("date")?).map_err(|e| invalid("date", &e))
}

fn invalid(name: &str, error: &MarketValueError) -> ToolError {
    ToolError::Validation(ValidationError::InvalidValue {
        name: name.to_string(),
        reason: error.to_string(),
    })
}

// =============================================================================
// Last Trade
// =============================================================================

/// Latest trade for a symbol.
pub struct PolygonLastTrade {
    deps: ToolDependencies,
}

#[async_trait]
impl ToolHandler for PolygonLastTrade {
    async fn call(&self, args: ToolArguments) -> Result<Value, ToolError> {
        let symbol = symbol_arg(&args)?;
        let bundle = self.deps.credentials.resolve(Upstream::Polygon)?;
        let request = UpstreamRequest::get(&bundle, &format!("/v2/last/trade/{symbol}"));
        Ok(self.deps.upstream.get_json(request).await?)
    }
}

/// `polygon_last_trade(symbol) -> GET /v2/last/trade/{SYMBOL}`.
#[must_use]
pub fn polygon_last_trade(deps: &ToolDependencies) -> (ToolDescriptor, Arc<dyn ToolHandler>) {
    (
        ToolDescriptor::new(
            "polygon_last_trade",
            "Get the last trade for a symbol from Polygon. Example symbols: AAPL, TSLA, SPY.",
        )
        .param(ParamSpec::required(
            "symbol",
            ParamType::String,
            "Ticker symbol, case-insensitive",
        )),
        Arc::new(PolygonLastTrade { deps: deps.clone() }),
    )
}

// =============================================================================
// Daily Open/Close
// =============================================================================

/// Daily open, high, low, close for a symbol on one date.
pub struct PolygonDailyOhlc {
    deps: ToolDependencies,
}

#[async_trait]
impl ToolHandler for PolygonDailyOhlc {
    async fn call(&self, args: ToolArguments) -> Result<Value, ToolError> {
        let symbol = symbol_arg(&args)?;
        let date = date_arg(&args)?;
        let bundle = self.deps.credentials.resolve(Upstream::Polygon)?;
        let request = UpstreamRequest::get(&bundle, &format!("/v1/open-close/{symbol}/{date}"));
        Ok(self.deps.upstream.get_json(request).await?)
    }
}

/// `polygon_daily_ohlc(symbol, date) -> GET /v1/open-close/{SYMBOL}/{date}`.
#[must_use]
pub fn polygon_daily_ohlc(deps: &ToolDependencies) -> (ToolDescriptor, Arc<dyn ToolHandler>) {
    (
        ToolDescriptor::new(
            "polygon_daily_ohlc",
            "Get daily OHLC data for a symbol on a given date (YYYY-MM-DD).",
        )
        .param(ParamSpec::required(
            "symbol",
            ParamType::String,
            "Ticker symbol, case-insensitive",
        ))
        .param(ParamSpec::required(
            "date",
            ParamType::Date,
            "Trading date as YYYY-MM-DD",
        )),
        Arc::new(PolygonDailyOhlc { deps: deps.clone() }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockCredentialPort, MockUpstreamPort};
    use crate::application::services::{DispatchError, ToolRegistry};
    use crate::domain::credentials::{ConfigError, CredentialBundle};
    use serde_json::json;
    use test_case::test_case;

    fn credentials() -> MockCredentialPort {
        let mut credentials = MockCredentialPort::new();
        credentials
            .expect_resolve()
            .returning(|_| Ok(CredentialBundle::polygon("https://polygon.test", "pk")));
        credentials
    }

    fn registry(upstream: MockUpstreamPort, credentials: MockCredentialPort) -> ToolRegistry {
        let deps = ToolDependencies::new(Arc::new(upstream), Arc::new(credentials));
        let mut registry = ToolRegistry::new();
        for (descriptor, handler) in [polygon_last_trade(&deps), polygon_daily_ohlc(&deps)] {
            registry.register(descriptor, handler).unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn last_trade_uppercases_symbol() {
        let mut upstream = MockUpstreamPort::new();
        upstream
            .expect_get_json()
            .withf(|req| {
                req.upstream == Upstream::Polygon
                    && req.url == "https://polygon.test/v2/last/trade/AAPL"
                    && req.auth.get("apiKey") == Some("pk")
            })
            .times(1)
            .returning(|_| Ok(json!({"status": "OK", "results": {"p": 189.5}})));

        let value = registry(upstream, credentials())
            .invoke("polygon_last_trade", Some(json!({"symbol": "aapl"})))
            .await
            .unwrap();
        assert_eq!(value, json!({"status": "OK", "results": {"p": 189.5}}));
    }

    #[tokio::test]
    async fn daily_ohlc_builds_path_with_date() {
        let mut upstream = MockUpstreamPort::new();
        upstream
            .expect_get_json()
            .withf(|req| req.url == "https://polygon.test/v1/open-close/TSLA/2024-03-15")
            .times(1)
            .returning(|_| Ok(json!({"open": 1.0, "close": 2.0})));

        let value = registry(upstream, credentials())
            .invoke(
                "polygon_daily_ohlc",
                Some(json!({"symbol": "tsla", "date": "2024-03-15"})),
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"open": 1.0, "close": 2.0}));
    }

    #[tokio::test]
    async fn bad_symbol_rejected_before_network() {
        let mut upstream = MockUpstreamPort::new();
        upstream.expect_get_json().never();

        let err = registry(upstream, credentials())
            .invoke("polygon_last_trade", Some(json!({"symbol": "../admin"})))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Tool {
                source: ToolError::Validation(ValidationError::InvalidValue { ref name, .. }),
                ..
            } if name == "symbol"
        ));
    }

    #[test_case("polygon_last_trade", json!({"symbol": "."}) ; "last trade single dot")]
    #[test_case("polygon_last_trade", json!({"symbol": ".."}) ; "last trade dot dot")]
    #[test_case("polygon_daily_ohlc", json!({"symbol": "..", "date": "2024-01-02"}) ; "ohlc dot dot")]
    #[tokio::test]
    async fn dot_segment_symbols_make_no_upstream_call(tool: &str, arguments: Value) {
        let mut upstream = MockUpstreamPort::new();
        upstream.expect_get_json().never();

        let err = registry(upstream, credentials())
            .invoke(tool, Some(arguments))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Tool { source: ToolError::Validation(_), .. }
        ));
    }

    #[tokio::test]
    async fn bad_date_rejected_before_network() {
        let mut upstream = MockUpstreamPort::new();
        upstream.expect_get_json().never();

        let err = registry(upstream, credentials())
            .invoke(
                "polygon_daily_ohlc",
                Some(json!({"symbol": "AAPL", "date": "15/03/2024"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation { .. }));
    }

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let mut upstream = MockUpstreamPort::new();
        upstream.expect_get_json().never();

        let mut credentials = MockCredentialPort::new();
        credentials.expect_resolve().returning(|upstream| {
            Err(ConfigError::MissingCredential {
                upstream,
                variable: "POLYGON_API_KEY",
            })
        });

        let err = registry(upstream, credentials)
            .invoke("polygon_last_trade", Some(json!({"symbol": "SPY"})))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Tool { source: ToolError::Configuration(_), .. }
        ));
    }
}

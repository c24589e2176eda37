//! Alpaca account tools (read-only).
//!
//! No orders are placed by anything in this module.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::ToolDependencies;
use crate::application::ports::UpstreamRequest;
use crate::application::services::{ToolError, ToolHandler};
use crate::domain::credentials::Upstream;
use crate::domain::tool::{ToolArguments, ToolDescriptor};

/// Parameterless GET against the Alpaca trading API.
pub struct AlpacaGet {
    path: &'static str,
    deps: ToolDependencies,
}

impl AlpacaGet {
    /// Create a handler for `path`.
    #[must_use]
    pub const fn new(path: &'static str, deps: ToolDependencies) -> Self {
        Self { path, deps }
    }
}

#[async_trait]
impl ToolHandler for AlpacaGet {
    async fn call(&self, _args: ToolArguments) -> Result<Value, ToolError> {
        let bundle = self.deps.credentials.resolve(Upstream::Alpaca)?;
        let request = UpstreamRequest::get(&bundle, self.path);
        Ok(self.deps.upstream.get_json(request).await?)
    }
}

/// `alpaca_get_account() -> GET /v2/account`.
#[must_use]
pub fn alpaca_get_account(deps: &ToolDependencies) -> (ToolDescriptor, Arc<dyn ToolHandler>) {
    (
        ToolDescriptor::new(
            "alpaca_get_account",
            "Get Alpaca account information. Read-only: no orders are placed.",
        ),
        Arc::new(AlpacaGet::new("/v2/account", deps.clone())),
    )
}

/// `alpaca_list_positions() -> GET /v2/positions`.
#[must_use]
pub fn alpaca_list_positions(deps: &ToolDependencies) -> (ToolDescriptor, Arc<dyn ToolHandler>) {
    (
        ToolDescriptor::new("alpaca_list_positions", "List current Alpaca positions."),
        Arc::new(AlpacaGet::new("/v2/positions", deps.clone())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockCredentialPort, MockUpstreamPort, UpstreamError};
    use crate::domain::credentials::{ConfigError, CredentialBundle};
    use serde_json::json;

    fn credentials() -> MockCredentialPort {
        let mut credentials = MockCredentialPort::new();
        credentials
            .expect_resolve()
            .returning(|_| Ok(CredentialBundle::alpaca("https://alpaca.test", "key", "secret")));
        credentials
    }

    #[tokio::test]
    async fn account_hits_v2_account_with_header_auth() {
        let mut upstream = MockUpstreamPort::new();
        upstream
            .expect_get_json()
            .withf(|req| {
                req.upstream == Upstream::Alpaca
                    && req.url == "https://alpaca.test/v2/account"
                    && req.auth.get("APCA-API-KEY-ID") == Some("key")
                    && req.auth.get("APCA-API-SECRET-KEY") == Some("secret")
                    && req.query.is_empty()
            })
            .times(1)
            .returning(|_| Ok(json!({"id": "acct", "cash": "100.00"})));

        let deps = ToolDependencies::new(Arc::new(upstream), Arc::new(credentials()));
        let (_, handler) = alpaca_get_account(&deps);

        let value = handler.call(ToolArguments::default()).await.unwrap();
        assert_eq!(value, json!({"id": "acct", "cash": "100.00"}));
    }

    #[tokio::test]
    async fn positions_passes_array_through() {
        let mut upstream = MockUpstreamPort::new();
        upstream
            .expect_get_json()
            .withf(|req| req.url.ends_with("/v2/positions"))
            .times(1)
            .returning(|_| Ok(json!([{"symbol": "AAPL"}, {"symbol": "SPY"}])));

        let deps = ToolDependencies::new(Arc::new(upstream), Arc::new(credentials()));
        let (_, handler) = alpaca_list_positions(&deps);

        let value = handler.call(ToolArguments::default()).await.unwrap();
        assert_eq!(value, json!([{"symbol": "AAPL"}, {"symbol": "SPY"}]));
    }

    #[tokio::test]
    async fn missing_credentials_make_no_upstream_call() {
        let mut upstream = MockUpstreamPort::new();
        upstream.expect_get_json().never();

        let mut credentials = MockCredentialPort::new();
        credentials.expect_resolve().returning(|upstream| {
            Err(ConfigError::MissingCredential {
                upstream,
                variable: "ALPACA_API_KEY",
            })
        });

        let deps = ToolDependencies::new(Arc::new(upstream), Arc::new(credentials));
        let (_, handler) = alpaca_get_account(&deps);

        let err = handler.call(ToolArguments::default()).await.unwrap_err();
        assert!(matches!(
            err,
            ToolError::Configuration(ConfigError::MissingCredential {
                variable: "ALPACA_API_KEY",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn upstream_error_propagates() {
        let mut upstream = MockUpstreamPort::new();
        upstream.expect_get_json().times(1).returning(|_| {
            Err(UpstreamError::Http {
                upstream: Upstream::Alpaca,
                status: 403,
                body: r#"{"message":"forbidden"}"#.into(),
            })
        });

        let deps = ToolDependencies::new(Arc::new(upstream), Arc::new(credentials()));
        let (_, handler) = alpaca_list_positions(&deps);

        let err = handler.call(ToolArguments::default()).await.unwrap_err();
        assert_eq!(err.to_string(), r#"alpaca returned HTTP 403: {"message":"forbidden"}"#);
    }
}

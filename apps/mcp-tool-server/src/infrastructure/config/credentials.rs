//! Credential resolution from the configuration snapshot.

use super::settings::{ALPACA_API_KEY, ALPACA_SECRET_KEY, POLYGON_API_KEY, ToolsConfig};
use crate::application::ports::CredentialPort;
use crate::domain::credentials::{ConfigError, CredentialBundle, Upstream};

/// Resolves credential bundles from [`ToolsConfig`].
///
/// Resolution happens on every call, so a tool invoked without credentials
/// fails on its own without affecting other tools.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    config: ToolsConfig,
}

impl CredentialResolver {
    /// Create a resolver over a configuration snapshot.
    #[must_use]
    pub const fn new(config: ToolsConfig) -> Self {
        Self { config }
    }

    fn alpaca(&self) -> Result<CredentialBundle, ConfigError> {
        let settings = &self.config.alpaca;
        let api_key = settings
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential {
                upstream: Upstream::Alpaca,
                variable: ALPACA_API_KEY,
            })?;
        let secret_key = settings
            .secret_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential {
                upstream: Upstream::Alpaca,
                variable: ALPACA_SECRET_KEY,
            })?;
        Ok(CredentialBundle::alpaca(&settings.base_url, api_key, secret_key))
    }

    fn polygon(&self) -> Result<CredentialBundle, ConfigError> {
        let settings = &self.config.polygon;
        let api_key = settings
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential {
                upstream: Upstream::Polygon,
                variable: POLYGON_API_KEY,
            })?;
        Ok(CredentialBundle::polygon(&settings.base_url, api_key))
    }
}

impl CredentialPort for CredentialResolver {
    fn resolve(&self, upstream: Upstream) -> Result<CredentialBundle, ConfigError> {
        let resolved = match upstream {
            Upstream::Alpaca => self.alpaca(),
            Upstream::Polygon => self.polygon(),
        };
        if let Err(e) = &resolved {
            tracing::warn!(upstream = %upstream, error = %e, "Credentials unavailable");
        }
        resolved
    }
}

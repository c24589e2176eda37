//! Tool Server Configuration Settings
//!
//! Configuration snapshot for the tool server, loaded from environment
//! variables once at startup and passed to whoever needs it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default Alpaca trading API base URL (paper account).
pub const DEFAULT_ALPACA_BASE_URL: &str = "https://paper-api.alpaca.markets";

/// Default Polygon API base URL.
pub const DEFAULT_POLYGON_BASE_URL: &str = "https://api.polygon.io";

/// Per-request upstream timeout. Fixed, not configurable per call.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

/// Alpaca API key variable.
pub const ALPACA_API_KEY: &str = "ALPACA_API_KEY";
/// Alpaca secret key variable.
pub const ALPACA_SECRET_KEY: &str = "ALPACA_SECRET_KEY";
/// Alpaca base URL variable.
pub const ALPACA_BASE_URL: &str = "ALPACA_BASE_URL";
/// Polygon API key variable.
pub const POLYGON_API_KEY: &str = "POLYGON_API_KEY";
/// Polygon base URL variable.
pub const POLYGON_BASE_URL: &str = "POLYGON_BASE_URL";

/// Alpaca API settings.
#[derive(Clone, PartialEq, Eq)]
pub struct AlpacaSettings {
    /// API key, if configured.
    pub api_key: Option<String>,
    /// Secret key, if configured.
    pub secret_key: Option<String>,
    /// Trading API base URL.
    pub base_url: String,
}

impl Default for AlpacaSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            secret_key: None,
            base_url: DEFAULT_ALPACA_BASE_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for AlpacaSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaSettings")
            .field("api_key", &redact(self.api_key.as_ref()))
            .field("secret_key", &redact(self.secret_key.as_ref()))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Polygon API settings.
#[derive(Clone, PartialEq, Eq)]
pub struct PolygonSettings {
    /// API key, if configured.
    pub api_key: Option<String>,
    /// API base URL.
    pub base_url: String,
}

impl Default for PolygonSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_POLYGON_BASE_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for PolygonSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolygonSettings")
            .field("api_key", &redact(self.api_key.as_ref()))
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn redact(value: Option<&String>) -> &'static str {
    if value.is_some() { "[REDACTED]" } else { "<unset>" }
}

/// HTTP transport bind settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Bind address.
    pub host: IpAddr,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
        }
    }
}

impl ServerSettings {
    /// Socket address to bind.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Complete tool server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolsConfig {
    /// Alpaca settings.
    pub alpaca: AlpacaSettings,
    /// Polygon settings.
    pub polygon: PolygonSettings,
    /// HTTP transport settings.
    pub server: ServerSettings,
}

impl ToolsConfig {
    /// Create configuration from environment variables.
    ///
    /// Missing credentials are not an error here; they fail only the tool
    /// calls that need them.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let alpaca = AlpacaSettings {
            api_key: non_empty(ALPACA_API_KEY),
            secret_key: non_empty(ALPACA_SECRET_KEY),
            base_url: non_empty(ALPACA_BASE_URL)
                .map_or_else(|| DEFAULT_ALPACA_BASE_URL.to_string(), |url| normalize_url(&url)),
        };

        let polygon = PolygonSettings {
            api_key: non_empty(POLYGON_API_KEY),
            base_url: non_empty(POLYGON_BASE_URL)
                .map_or_else(|| DEFAULT_POLYGON_BASE_URL.to_string(), |url| normalize_url(&url)),
        };

        let defaults = ServerSettings::default();
        let server = ServerSettings {
            host: non_empty("MCP_HTTP_HOST")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.host),
            port: non_empty("MCP_HTTP_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
        };

        Self {
            alpaca,
            polygon,
            server,
        }
    }

    /// Whether both Alpaca keys are present.
    #[must_use]
    pub const fn alpaca_configured(&self) -> bool {
        self.alpaca.api_key.is_some() && self.alpaca.secret_key.is_some()
    }

    /// Whether the Polygon key is present.
    #[must_use]
    pub const fn polygon_configured(&self) -> bool {
        self.polygon.api_key.is_some()
    }
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ToolsConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ToolsConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.alpaca.base_url, DEFAULT_ALPACA_BASE_URL);
        assert_eq!(config.polygon.base_url, DEFAULT_POLYGON_BASE_URL);
        assert!(!config.alpaca_configured());
        assert!(!config.polygon_configured());
        assert_eq!(config.server.addr().to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn reads_credentials_and_trims_base_urls() {
        let config = config_from(&[
            ("ALPACA_API_KEY", "k"),
            ("ALPACA_SECRET_KEY", "s"),
            ("ALPACA_BASE_URL", "https://api.alpaca.markets/"),
            ("POLYGON_API_KEY", "p"),
            ("POLYGON_BASE_URL", " http://localhost:9000// "),
        ]);
        assert!(config.alpaca_configured());
        assert!(config.polygon_configured());
        assert_eq!(config.alpaca.base_url, "https://api.alpaca.markets");
        assert_eq!(config.polygon.base_url, "http://localhost:9000");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[
            ("ALPACA_API_KEY", ""),
            ("ALPACA_SECRET_KEY", "s"),
            ("ALPACA_BASE_URL", "  "),
        ]);
        assert_eq!(config.alpaca.api_key, None);
        assert!(!config.alpaca_configured());
        assert_eq!(config.alpaca.base_url, DEFAULT_ALPACA_BASE_URL);
    }

    #[test]
    fn server_settings_from_env() {
        let config = config_from(&[("MCP_HTTP_HOST", "0.0.0.0"), ("MCP_HTTP_PORT", "9100")]);
        assert_eq!(config.server.addr().to_string(), "0.0.0.0:9100");

        let bad = config_from(&[("MCP_HTTP_PORT", "not-a-port")]);
        assert_eq!(bad.server.port, 8000);
    }

    #[test]
    fn settings_debug_is_redacted() {
        let config = config_from(&[("ALPACA_API_KEY", "key123"), ("POLYGON_API_KEY", "poly456")]);
        let debug = format!("{config:?}");
        assert!(!debug.contains("key123"));
        assert!(!debug.contains("poly456"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("<unset>"));
    }

    #[test]
    fn upstream_timeout_is_fifteen_seconds() {
        assert_eq!(UPSTREAM_TIMEOUT, Duration::from_secs(15));
    }
}

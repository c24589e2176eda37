//! Credential Types
//!
//! A [`CredentialBundle`] is everything one upstream needs to authenticate a
//! request: the base URL plus either header or query-parameter auth.
//!
//! # Auth Placement
//!
//! | Upstream | Placement | Names |
//! |----------|-----------|-------|
//! | Alpaca   | headers   | `APCA-API-KEY-ID`, `APCA-API-SECRET-KEY` |
//! | Polygon  | query     | `apiKey` |

use std::fmt;

/// Alpaca key header.
pub const ALPACA_KEY_HEADER: &str = "APCA-API-KEY-ID";

/// Alpaca secret header.
pub const ALPACA_SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

/// Polygon API key query parameter.
pub const POLYGON_KEY_PARAM: &str = "apiKey";

// =============================================================================
// Upstream
// =============================================================================

/// Third-party REST API a tool forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    /// Alpaca brokerage (trading) API.
    Alpaca,
    /// Polygon market data API.
    Polygon,
}

impl Upstream {
    /// Get the upstream name used in logs, metrics and errors.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Alpaca => "alpaca",
            Self::Polygon => "polygon",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Auth Material
// =============================================================================

/// Where and how credentials are attached to an upstream request.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMaterial {
    /// Attach as request headers.
    Headers(Vec<(String, String)>),
    /// Attach as query parameters.
    Query(Vec<(String, String)>),
}

impl AuthMaterial {
    /// Names of the headers or parameters carried, without their values.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Headers(pairs) | Self::Query(pairs) => {
                pairs.iter().map(|(name, _)| name.as_str()).collect()
            }
        }
    }

    /// Look up a value by header or parameter name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Self::Headers(pairs) | Self::Query(pairs) => pairs
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
        }
    }
}

impl fmt::Debug for AuthMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, pairs) = match self {
            Self::Headers(pairs) => ("Headers", pairs),
            Self::Query(pairs) => ("Query", pairs),
        };
        f.write_str(kind)?;
        let mut map = f.debug_map();
        for (name, value) in pairs {
            if is_secret(name) {
                map.entry(name, &"[REDACTED]");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

fn is_secret(name: &str) -> bool {
    [ALPACA_KEY_HEADER, ALPACA_SECRET_HEADER, POLYGON_KEY_PARAM]
        .iter()
        .any(|secret| secret.eq_ignore_ascii_case(name))
}

// =============================================================================
// Credential Bundle
// =============================================================================

/// Resolved credentials for one upstream, valid for a single tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    /// Upstream these credentials belong to.
    pub upstream: Upstream,
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Auth headers or query parameters.
    pub auth: AuthMaterial,
}

impl CredentialBundle {
    /// Build an Alpaca bundle using header auth.
    #[must_use]
    pub fn alpaca(base_url: &str, api_key: &str, secret_key: &str) -> Self {
        Self {
            upstream: Upstream::Alpaca,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: AuthMaterial::Headers(vec![
                (ALPACA_KEY_HEADER.to_string(), api_key.to_string()),
                (ALPACA_SECRET_HEADER.to_string(), secret_key.to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ]),
        }
    }

    /// Build a Polygon bundle using query-parameter auth.
    #[must_use]
    pub fn polygon(base_url: &str, api_key: &str) -> Self {
        Self {
            upstream: Upstream::Polygon,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: AuthMaterial::Query(vec![(
                POLYGON_KEY_PARAM.to_string(),
                api_key.to_string(),
            )]),
        }
    }

    /// Join a path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration error raised before any network I/O.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required credential is unset or empty.
    #[error("{upstream} credentials unavailable: {variable} must be set")]
    MissingCredential {
        /// Upstream the credential belongs to.
        upstream: Upstream,
        /// Environment variable that was missing.
        variable: &'static str,
    },
}

//! Port Interfaces
//!
//! Driven ports used by tool handlers. Infrastructure adapters implement
//! them; tests substitute spies.
//!
//! - `UpstreamPort`: performs exactly one HTTP GET against an upstream API
//! - `CredentialPort`: resolves auth material for an upstream at call time

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::credentials::{AuthMaterial, ConfigError, CredentialBundle, Upstream};

// =============================================================================
// Upstream Port
// =============================================================================

/// A single outbound GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Upstream being called.
    pub upstream: Upstream,
    /// Fully built URL, without auth.
    pub url: String,
    /// Auth headers or query parameters.
    pub auth: AuthMaterial,
    /// Additional query parameters.
    pub query: Vec<(String, String)>,
}

impl UpstreamRequest {
    /// Build a request for `path` relative to the bundle's base URL.
    #[must_use]
    pub fn get(bundle: &CredentialBundle, path: &str) -> Self {
        Self {
            upstream: bundle.upstream,
            url: bundle.url(path),
            auth: bundle.auth.clone(),
            query: Vec::new(),
        }
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// URL path, for logs. Never includes the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url
            .find("://")
            .and_then(|scheme_end| {
                let rest = &self.url[scheme_end + 3..];
                rest.find('/').map(|i| &rest[i..])
            })
            .unwrap_or("/")
    }
}

/// Failure of one upstream call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-2xx status.
    #[error("{upstream} returned HTTP {status}: {body}")]
    Http {
        /// Upstream that answered.
        upstream: Upstream,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Request exceeded the per-call timeout.
    #[error("{upstream} request timed out after {timeout_secs}s")]
    Timeout {
        /// Upstream that was called.
        upstream: Upstream,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },

    /// Connection could not be established or broke mid-request.
    #[error("{upstream} network error: {message}")]
    Network {
        /// Upstream that was called.
        upstream: Upstream,
        /// Transport error description.
        message: String,
    },

    /// 2xx response whose body was not JSON.
    #[error("{upstream} returned invalid JSON: {message}")]
    Decode {
        /// Upstream that answered.
        upstream: Upstream,
        /// Parser error description.
        message: String,
    },
}

impl UpstreamError {
    /// HTTP status, when the upstream answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a caller might reasonably try the same call again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Decode { .. } => false,
        }
    }
}

/// Performs one upstream GET and returns the decoded JSON body.
///
/// Implementations must not retry. Dropping the future cancels the request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamPort: Send + Sync {
    /// Execute the request.
    async fn get_json(&self, request: UpstreamRequest) -> Result<Value, UpstreamError>;
}

// =============================================================================
// Credential Port
// =============================================================================

/// Resolves credentials for an upstream at call time.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialPort: Send + Sync {
    /// Resolve the bundle, failing if any required value is absent.
    fn resolve(&self, upstream: Upstream) -> Result<CredentialBundle, ConfigError>;
}

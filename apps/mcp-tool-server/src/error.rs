//! Structured error reporting for tool calls.
//!
//! Every failure crossing the protocol boundary is classified with an
//! [`ErrorCode`] and rendered as an [`ErrorPayload`]:
//!
//! ```json
//! {"code": "UPSTREAM_HTTP_ERROR", "message": "...", "tool": "alpaca_get_account",
//!  "retryable": true, "details": {"upstream": "alpaca", "status": 503, "body": "..."}}
//! ```
//!
//! | Code | Raised when | Retryable |
//! |------|-------------|-----------|
//! | `CONFIGURATION_ERROR` | credential variable unset | no |
//! | `UPSTREAM_HTTP_ERROR` | non-2xx upstream status | 429 and 5xx |
//! | `NETWORK_ERROR` | connection failure | yes |
//! | `TIMEOUT` | upstream exceeded the timeout | yes |
//! | `UPSTREAM_DECODE_ERROR` | 2xx body was not JSON | no |
//! | `TOOL_NOT_FOUND` | unregistered tool name | no |
//! | `VALIDATION_ERROR` | bad arguments | no |
//! | `REGISTRATION_ERROR` | invalid tool definition at startup | no |
//! | `INTERNAL_ERROR` | anything else | no |

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::application::ports::UpstreamError;
use crate::application::services::{DispatchError, ToolError};
use crate::domain::credentials::ConfigError;
use crate::domain::tool::{RegistrationError, ValidationError};

/// Classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Required configuration is missing.
    ConfigurationError,
    /// Upstream answered with a non-2xx status.
    UpstreamHttpError,
    /// Upstream could not be reached.
    NetworkError,
    /// Upstream did not answer in time.
    Timeout,
    /// Upstream answered 2xx with a body that is not JSON.
    UpstreamDecodeError,
    /// No tool with the requested name.
    ToolNotFound,
    /// Arguments were rejected.
    ValidationError,
    /// A tool definition was rejected at startup.
    RegistrationError,
    /// Unexpected failure.
    InternalError,
}

impl ErrorCode {
    /// Get the error reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::UpstreamHttpError => "UPSTREAM_HTTP_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::UpstreamDecodeError => "UPSTREAM_DECODE_ERROR",
            Self::ToolNotFound => "TOOL_NOT_FOUND",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::RegistrationError => "REGISTRATION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether failures with this code are transient.
    ///
    /// Upstream HTTP errors depend on the status; see
    /// [`UpstreamError::is_retryable`].
    #[must_use]
    pub const fn retryable(&self) -> bool {
        matches!(self, Self::NetworkError | Self::Timeout)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Structured error returned to MCP clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error classification.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Tool the error belongs to, if any.
    pub tool: Option<String>,
    /// Whether the same call may succeed if repeated.
    pub retryable: bool,
    /// Code-specific detail object.
    pub details: Value,
}

impl ErrorPayload {
    /// Create a payload with an empty detail object.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            tool: None,
            retryable: code.retryable(),
            details: json!({}),
        }
    }

    /// Attach the tool name.
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Replace the detail object.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Render as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({"code": self.code.reason()}))
    }
}

impl From<&ConfigError> for ErrorPayload {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::MissingCredential { upstream, variable } => {
                Self::new(ErrorCode::ConfigurationError, err.to_string())
                    .with_details(json!({"upstream": upstream.as_str(), "variable": variable}))
            }
        }
    }
}

impl From<&UpstreamError> for ErrorPayload {
    fn from(err: &UpstreamError) -> Self {
        let payload = match err {
            UpstreamError::Http {
                upstream,
                status,
                body,
            } => {
                // Upstream error bodies are usually JSON; keep them structured.
                let body = serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.clone()));
                Self::new(ErrorCode::UpstreamHttpError, err.to_string()).with_details(json!({
                    "upstream": upstream.as_str(),
                    "status": status,
                    "body": body,
                }))
            }
            UpstreamError::Timeout {
                upstream,
                timeout_secs,
            } => Self::new(ErrorCode::Timeout, err.to_string()).with_details(json!({
                "upstream": upstream.as_str(),
                "timeout_secs": timeout_secs,
            })),
            UpstreamError::Network { upstream, .. } => {
                Self::new(ErrorCode::NetworkError, err.to_string())
                    .with_details(json!({"upstream": upstream.as_str()}))
            }
            UpstreamError::Decode { upstream, .. } => {
                Self::new(ErrorCode::UpstreamDecodeError, err.to_string())
                    .with_details(json!({"upstream": upstream.as_str()}))
            }
        };
        Self {
            retryable: err.is_retryable(),
            ..payload
        }
    }
}

impl From<&ValidationError> for ErrorPayload {
    fn from(err: &ValidationError) -> Self {
        let details = err
            .argument()
            .map_or_else(|| json!({}), |name| json!({"argument": name}));
        Self::new(ErrorCode::ValidationError, err.to_string()).with_details(details)
    }
}

impl From<&RegistrationError> for ErrorPayload {
    fn from(err: &RegistrationError) -> Self {
        Self::new(ErrorCode::RegistrationError, err.to_string())
    }
}

impl From<&ToolError> for ErrorPayload {
    fn from(err: &ToolError) -> Self {
        match err {
            ToolError::Configuration(e) => e.into(),
            ToolError::Upstream(e) => e.into(),
            ToolError::Validation(e) => e.into(),
        }
    }
}

impl From<&DispatchError> for ErrorPayload {
    fn from(err: &DispatchError) -> Self {
        match err {
            DispatchError::NotFound(tool) => {
                Self::new(ErrorCode::ToolNotFound, err.to_string()).with_tool(tool.clone())
            }
            DispatchError::Validation { tool, source } => {
                Self::from(source).with_tool(tool.clone())
            }
            DispatchError::Tool { tool, source } => Self::from(source).with_tool(tool.clone()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

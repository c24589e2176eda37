//! reqwest-backed upstream client.
//!
//! One request per call, no retry. A non-2xx status is returned to the
//! caller as-is with its body.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::application::ports::{UpstreamError, UpstreamPort, UpstreamRequest};
use crate::domain::credentials::AuthMaterial;
use crate::infrastructure::config::UPSTREAM_TIMEOUT;
use crate::infrastructure::metrics;

/// HTTP client shared by every upstream tool.
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    client: Client,
    timeout: Duration,
}

impl HttpUpstreamClient {
    /// Create a client with the fixed upstream timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(UPSTREAM_TIMEOUT)
    }

    /// Create a client with a specific timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mcp-tool-server/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, request: &UpstreamRequest, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout {
                upstream: request.upstream,
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            // The URL may carry the Polygon key as a query parameter.
            UpstreamError::Network {
                upstream: request.upstream,
                message: err.without_url().to_string(),
            }
        }
    }
}

#[async_trait]
impl UpstreamPort for HttpUpstreamClient {
    async fn get_json(&self, request: UpstreamRequest) -> Result<Value, UpstreamError> {
        let upstream = request.upstream;
        let mut builder = self.client.get(&request.url);
        match &request.auth {
            AuthMaterial::Headers(headers) => {
                for (name, value) in headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
            }
            AuthMaterial::Query(params) => {
                builder = builder.query(params);
            }
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let error = self.classify(&request, e);
                tracing::warn!(
                    upstream = %upstream,
                    path = %request.path(),
                    error = %error,
                    "Upstream request failed"
                );
                metrics::record_upstream_request(upstream, None, started.elapsed());
                return Err(error);
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify(&request, e))?;
        let elapsed = started.elapsed();
        metrics::record_upstream_request(upstream, Some(status.as_u16()), elapsed);

        tracing::debug!(
            upstream = %upstream,
            path = %request.path(),
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis(),
            "Upstream responded"
        );

        if !status.is_success() {
            return Err(UpstreamError::Http {
                upstream,
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode {
            upstream,
            message: e.to_string(),
        })
    }
}

//! Prometheus Metrics Module
//!
//! # Metrics
//!
//! - `mcp_tool_invocations_total{tool, outcome}`: tool calls by result
//! - `mcp_tool_invocation_duration_seconds{tool}`: handler latency
//! - `mcp_upstream_requests_total{upstream, outcome}`: outbound GETs by status class
//! - `mcp_upstream_request_duration_seconds{upstream}`: outbound latency
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder, so
//! unit tests never need to set it up.
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` by the HTTP transport.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::credentials::Upstream;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Calling it again returns the existing handle.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "mcp_tool_invocations_total",
        "Total tool invocations by tool and outcome"
    );
    describe_histogram!(
        "mcp_tool_invocation_duration_seconds",
        "Time spent inside tool handlers"
    );
    describe_counter!(
        "mcp_upstream_requests_total",
        "Total upstream HTTP requests by upstream and status class"
    );
    describe_histogram!(
        "mcp_upstream_request_duration_seconds",
        "Upstream HTTP request latency"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Result label for a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Handler returned a result.
    Success,
    /// Handler ran and failed.
    Failure,
    /// Arguments were rejected.
    Invalid,
    /// No tool with that name.
    NotFound,
}

impl InvocationOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Invalid => "invalid",
            Self::NotFound => "not_found",
        }
    }
}

/// Record one tool invocation. `elapsed` is `None` when no handler ran.
pub fn record_tool_invocation(tool: &str, outcome: InvocationOutcome, elapsed: Option<Duration>) {
    // Unknown names are caller-supplied; collapse them to bound cardinality.
    let tool_label = if outcome == InvocationOutcome::NotFound {
        "unknown".to_string()
    } else {
        tool.to_string()
    };

    counter!(
        "mcp_tool_invocations_total",
        "tool" => tool_label.clone(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    if let Some(elapsed) = elapsed {
        histogram!(
            "mcp_tool_invocation_duration_seconds",
            "tool" => tool_label
        )
        .record(elapsed.as_secs_f64());
    }
}

/// Record one upstream request. `status` is `None` for transport failures.
pub fn record_upstream_request(upstream: Upstream, status: Option<u16>, elapsed: Duration) {
    counter!(
        "mcp_upstream_requests_total",
        "upstream" => upstream.as_str(),
        "outcome" => status_class(status)
    )
    .increment(1);

    histogram!(
        "mcp_upstream_request_duration_seconds",
        "upstream" => upstream.as_str()
    )
    .record(elapsed.as_secs_f64());
}

const fn status_class(status: Option<u16>) -> &'static str {
    match status {
        Some(200..=299) => "2xx",
        Some(300..=399) => "3xx",
        Some(400..=499) => "4xx",
        Some(500..=599) => "5xx",
        Some(_) => "other",
        None => "error",
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Tool Registry and Dispatcher
//!
//! Tools are registered once at startup, then the registry is shared
//! read-only (usually behind an `Arc`). Each `invoke` is independent: there
//! is no lock and no state shared between calls, so concurrent invocations
//! never wait on each other.
//!
//! # Invocation
//!
//! ```text
//! invoke(name, args)
//!   ├─ lookup ─────────── unknown → DispatchError::NotFound
//!   ├─ coerce args ────── bad     → DispatchError::Validation
//!   └─ handler.call(args)
//!        ├─ Ok(value) ─── returned unchanged
//!        └─ Err(e) ────── DispatchError::Tool { tool, e }
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::Instrument;

use crate::application::ports::UpstreamError;
use crate::domain::credentials::ConfigError;
use crate::domain::tool::{RegistrationError, ToolArguments, ToolDescriptor, ValidationError};
use crate::infrastructure::metrics::{self, InvocationOutcome};

// =============================================================================
// Errors
// =============================================================================

/// Error raised by a tool handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// Required configuration is missing.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The upstream call failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The handler rejected an argument value that passed the schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Error returned by [`ToolRegistry::invoke`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// No tool is registered under this name.
    #[error("unknown tool `{0}`")]
    NotFound(String),

    /// Arguments did not match the tool's schema.
    #[error("invalid arguments for tool `{tool}`: {source}")]
    Validation {
        /// Tool name.
        tool: String,
        /// What was wrong.
        source: ValidationError,
    },

    /// The handler ran and failed.
    #[error("tool `{tool}` failed: {source}")]
    Tool {
        /// Tool name.
        tool: String,
        /// Handler error.
        source: ToolError,
    },
}

impl DispatchError {
    /// Name of the tool the error belongs to.
    #[must_use]
    pub fn tool(&self) -> &str {
        match self {
            Self::NotFound(tool) | Self::Validation { tool, .. } | Self::Tool { tool, .. } => tool,
        }
    }

    /// Whether the caller misused the dispatcher, as opposed to the tool
    /// failing while running. Values a handler rejects count as tool
    /// failures.
    #[must_use]
    pub const fn is_caller_fault(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Validation { .. })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// An invocable tool implementation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with schema-checked arguments.
    async fn call(&self, args: ToolArguments) -> Result<Value, ToolError>;
}

/// Adapter for synchronous closures.
pub struct SyncHandler<F> {
    handler: F,
}

#[async_trait]
impl<F> ToolHandler for SyncHandler<F>
where
    F: Fn(ToolArguments) -> Result<Value, ToolError> + Send + Sync,
{
    async fn call(&self, args: ToolArguments) -> Result<Value, ToolError> {
        (self.handler)(args)
    }
}

/// Wrap a synchronous closure as a handler.
pub fn sync_handler<F>(handler: F) -> Arc<dyn ToolHandler>
where
    F: Fn(ToolArguments) -> Result<Value, ToolError> + Send + Sync + 'static,
{
    Arc::new(SyncHandler { handler })
}

/// Adapter for closures returning a future.
pub struct AsyncHandler<F, Fut> {
    handler: F,
    _future: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> ToolHandler for AsyncHandler<F, Fut>
where
    F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    async fn call(&self, args: ToolArguments) -> Result<Value, ToolError> {
        (self.handler)(args).await
    }
}

/// Wrap an async closure as a handler.
pub fn async_handler<F, Fut>(handler: F) -> Arc<dyn ToolHandler>
where
    F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    Arc::new(AsyncHandler {
        handler,
        _future: PhantomData,
    })
}

// =============================================================================
// Registry
// =============================================================================

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Mapping from tool name to descriptor and handler.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// The descriptor is validated and the name must not already be taken.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistrationError> {
        descriptor.validate()?;
        if self.tools.contains_key(&descriptor.name) {
            return Err(RegistrationError::DuplicateTool(descriptor.name));
        }

        tracing::debug!(
            tool = %descriptor.name,
            params = descriptor.params.len(),
            "Tool registered"
        );
        self.tools.insert(
            descriptor.name.clone(),
            RegisteredTool {
                descriptor,
                handler,
            },
        );
        Ok(())
    }

    /// Registered descriptors in name order.
    pub fn list(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().map(|tool| &tool.descriptor)
    }

    /// Look up a descriptor.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name).map(|tool| &tool.descriptor)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name.
    ///
    /// The handler result is returned unchanged. Nothing is retried.
    pub async fn invoke(&self, name: &str, arguments: Option<Value>) -> Result<Value, DispatchError> {
        let Some(tool) = self.tools.get(name) else {
            tracing::warn!(tool = %name, "Unknown tool requested");
            metrics::record_tool_invocation(name, InvocationOutcome::NotFound, None);
            return Err(DispatchError::NotFound(name.to_string()));
        };

        let args = match ToolArguments::coerce(&tool.descriptor.params, arguments) {
            Ok(args) => args,
            Err(source) => {
                tracing::info!(tool = %name, error = %source, "Tool arguments rejected");
                metrics::record_tool_invocation(name, InvocationOutcome::Invalid, None);
                return Err(DispatchError::Validation {
                    tool: name.to_string(),
                    source,
                });
            }
        };

        let span = tracing::info_span!("tool_call", tool = %name);
        let started = Instant::now();
        let result = tool.handler.call(args).instrument(span).await;
        let elapsed = started.elapsed();

        match result {
            Ok(value) => {
                tracing::debug!(tool = %name, elapsed_ms = elapsed.as_millis(), "Tool succeeded");
                metrics::record_tool_invocation(name, InvocationOutcome::Success, Some(elapsed));
                Ok(value)
            }
            Err(source @ ToolError::Validation(_)) => {
                tracing::info!(tool = %name, error = %source, "Tool rejected argument value");
                metrics::record_tool_invocation(name, InvocationOutcome::Invalid, Some(elapsed));
                Err(DispatchError::Tool {
                    tool: name.to_string(),
                    source,
                })
            }
            Err(source) => {
                tracing::warn!(
                    tool = %name,
                    error = %source,
                    elapsed_ms = elapsed.as_millis(),
                    "Tool failed"
                );
                metrics::record_tool_invocation(name, InvocationOutcome::Failure, Some(elapsed));
                Err(DispatchError::Tool {
                    tool: name.to_string(),
                    source,
                })
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

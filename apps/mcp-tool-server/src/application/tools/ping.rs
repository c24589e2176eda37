//! Health-check tool.

use std::sync::Arc;

use serde_json::Value;

use crate::application::services::{ToolHandler, sync_handler};
use crate::domain::tool::{ParamSpec, ParamType, ToolDescriptor};

/// Message used when the caller supplies none.
pub const DEFAULT_MESSAGE: &str = "hello";

/// `ping(message = "hello") -> "pong: {message}"`.
#[must_use]
pub fn ping() -> (ToolDescriptor, Arc<dyn ToolHandler>) {
    let descriptor = ToolDescriptor::new(
        "ping",
        "Simple health-check tool. Call it first to confirm the server is wired correctly.",
    )
    .param(
        ParamSpec::optional("message", ParamType::String, "Text echoed back after `pong: `")
            .with_default(DEFAULT_MESSAGE),
    );

    let handler = sync_handler(|args| {
        let message = args.string("message")?;
        Ok(Value::String(format!("pong: {message}")))
    });

    (descriptor, handler)
}

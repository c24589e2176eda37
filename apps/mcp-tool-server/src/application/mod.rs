//! Application Layer - Ports, dispatch and the concrete tools.

/// Interfaces to upstream APIs and credential sources.
pub mod ports;

/// Tool registry and invocation dispatch.
pub mod services;

/// Concrete tool handlers.
pub mod tools;

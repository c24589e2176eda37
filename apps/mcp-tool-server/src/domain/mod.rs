//! Domain Layer - Tool schema, credential and market value types.
//!
//! Pure types with no I/O. Everything here can be constructed and tested
//! without a runtime or network.

/// Upstream selection, credential bundles and auth material.
pub mod credentials;

/// Validated market identifiers (symbols, trading dates).
pub mod market;

/// Tool descriptors, parameter schema and argument coercion.
pub mod tool;

//! Application Services
//!
//! - `ToolRegistry`: write-once tool registration and per-call dispatch

mod registry;

pub use registry::{
    AsyncHandler, DispatchError, SyncHandler, ToolError, ToolHandler, ToolRegistry,
    async_handler, sync_handler,
};

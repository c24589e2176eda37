//! MCP Protocol Module
//!
//! JSON-RPC 2.0 framing and the MCP methods served by both transports.

mod handler;
mod message;

pub use handler::{CancelledParams, McpHandler, SERVER_NAME, SUPPORTED_PROTOCOL_VERSIONS};
pub use message::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, Incoming, JSONRPC_VERSION, METHOD_NOT_FOUND,
    PARSE_ERROR, Request, RequestId, Response, RpcError, parse_message, parse_value,
};

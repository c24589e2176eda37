//! MCP method dispatch over the tool registry.
//!
//! | Method | Result |
//! |--------|--------|
//! | `initialize` | server info and capabilities |
//! | `ping` | `{}` |
//! | `tools/list` | every registered descriptor |
//! | `tools/call` | `CallToolResult` |
//!
//! Notifications are accepted and never answered. Cancellation is the
//! transport's job: it owns the task running each request.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};

use super::message::{
    INVALID_PARAMS, Incoming, METHOD_NOT_FOUND, Request, RequestId, Response, parse_message,
    parse_value,
};
use crate::application::services::{DispatchError, ToolRegistry};
use crate::error::ErrorPayload;

/// Name advertised in `serverInfo`.
pub const SERVER_NAME: &str = "gartmann-mcp";

/// Protocol revisions this server understands, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    protocol_version: Option<String>,
    #[serde(default)]
    client_info: Option<Value>,
}

/// Parameters of `notifications/cancelled`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledParams {
    /// Request to cancel.
    pub request_id: RequestId,
    /// Optional reason given by the client.
    #[serde(default)]
    pub reason: Option<String>,
}

impl CancelledParams {
    /// Read cancellation parameters from a notification.
    #[must_use]
    pub fn from_request(request: &Request) -> Option<Self> {
        request
            .params
            .clone()
            .and_then(|params| serde_json::from_value(params).ok())
    }
}

/// Protocol handler shared by the stdio and HTTP transports.
#[derive(Debug, Clone)]
pub struct McpHandler {
    registry: Arc<ToolRegistry>,
}

impl McpHandler {
    /// Create a handler over a fully built registry.
    #[must_use]
    pub const fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw message. Returns the response to send, if any.
    pub async fn handle_str(&self, raw: &str) -> Option<Response> {
        self.handle_incoming(parse_message(raw)).await
    }

    /// Handle one decoded message.
    pub async fn handle_value(&self, value: Value) -> Option<Response> {
        self.handle_incoming(parse_value(value)).await
    }

    async fn handle_incoming(&self, incoming: Incoming) -> Option<Response> {
        match incoming {
            Incoming::Request(request) => self.handle_request(request).await,
            Incoming::Reply => None,
            Incoming::Invalid(response) => Some(response),
        }
    }

    /// Handle a parsed request or notification.
    pub async fn handle_request(&self, request: Request) -> Option<Response> {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => self.initialize(id, request.params),
            "ping" => Response::success(Some(id), json!({})),
            "tools/list" => self.list_tools(id),
            "tools/call" => self.call_tool(id, request.params).await,
            method => {
                tracing::debug!(method, "Unknown method");
                Response::error(
                    Some(id),
                    METHOD_NOT_FOUND,
                    format!("method not found: {method}"),
                    None,
                )
            }
        };
        Some(response)
    }

    #[allow(clippy::unused_self)]
    fn handle_notification(&self, request: &Request) {
        match request.method.as_str() {
            "notifications/initialized" => tracing::info!("Client initialized"),
            "notifications/cancelled" => {
                if let Some(params) = CancelledParams::from_request(request) {
                    tracing::debug!(request_id = %params.request_id, "Cancellation received");
                }
            }
            method => tracing::debug!(method, "Ignoring notification"),
        }
    }

    fn initialize(&self, id: RequestId, params: Option<Value>) -> Response {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        let protocol_version = params
            .protocol_version
            .as_deref()
            .filter(|requested| SUPPORTED_PROTOCOL_VERSIONS.contains(requested))
            .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);

        let client = params.client_info.unwrap_or_default();
        tracing::info!(
            requested = params.protocol_version.as_deref().unwrap_or("none"),
            negotiated = protocol_version,
            client = %client,
            "Initialize"
        );

        Response::success(
            Some(id),
            json!({
                "protocolVersion": protocol_version,
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "instructions": format!(
                    "Read-only brokerage and market data tools. {} tools available.",
                    self.registry.len()
                ),
            }),
        )
    }

    fn list_tools(&self, id: RequestId) -> Response {
        let tools: Vec<Value> = self
            .registry
            .list()
            .map(|descriptor| {
                json!({
                    "name": descriptor.name,
                    "description": descriptor.description,
                    "inputSchema": descriptor.input_schema(),
                })
            })
            .collect();
        Response::success(Some(id), json!({"tools": tools}))
    }

    async fn call_tool(&self, id: RequestId, params: Option<Value>) -> Response {
        let params: CallParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return Response::error(
                    Some(id),
                    INVALID_PARAMS,
                    format!("invalid tools/call params: {e}"),
                    None,
                );
            }
            None => {
                return Response::error(
                    Some(id),
                    INVALID_PARAMS,
                    "tools/call requires params",
                    None,
                );
            }
        };

        match self.registry.invoke(&params.name, params.arguments).await {
            Ok(value) => Response::success(Some(id), call_result(&value)),
            Err(e) if e.is_caller_fault() => {
                let payload = ErrorPayload::from(&e);
                Response::error(Some(id), INVALID_PARAMS, e.to_string(), Some(payload.to_value()))
            }
            Err(e) => Response::success(Some(id), error_result(&e)),
        }
    }
}

/// Successful `CallToolResult`.
fn call_result(value: &Value) -> Value {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut result = json!({
        "content": [{"type": "text", "text": text}],
        "isError": false,
    });
    if value.is_object() {
        result["structuredContent"] = value.clone();
    }
    result
}

/// Failed `CallToolResult` carrying the structured error.
fn error_result(err: &DispatchError) -> Value {
    let payload = ErrorPayload::from(err).to_value();
    json!({
        "content": [{"type": "text", "text": payload.to_string()}],
        "structuredContent": payload,
        "isError": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockCredentialPort, MockUpstreamPort};
    use crate::application::tools::{ToolDependencies, build_registry};
    use crate::domain::credentials::{ConfigError, Upstream};
    use crate::infrastructure::protocol::message::{INVALID_REQUEST, PARSE_ERROR};

    fn handler(credentials: MockCredentialPort, upstream: MockUpstreamPort) -> McpHandler {
        let deps = ToolDependencies::new(Arc::new(upstream), Arc::new(credentials));
        McpHandler::new(Arc::new(build_registry(&deps).unwrap()))
    }

    fn idle_handler() -> McpHandler {
        handler(MockCredentialPort::new(), MockUpstreamPort::new())
    }

    async fn call(handler: &McpHandler, message: Value) -> Value {
        handler.handle_value(message).await.unwrap().to_value()
    }

    #[tokio::test]
    async fn initialize_advertises_server_name_and_tools() {
        let response = call(
            &idle_handler(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2024-11-05", "capabilities": {}}}),
        )
        .await;

        let result = &response["result"];
        assert_eq!(result["serverInfo"]["name"], "gartmann-mcp");
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn initialize_falls_back_to_latest_version() {
        let response = call(
            &idle_handler(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "1999-01-01"}}),
        )
        .await;
        assert_eq!(response["result"]["protocolVersion"], SUPPORTED_PROTOCOL_VERSIONS[0]);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let handler = idle_handler();
        assert!(
            handler
                .handle_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .await
                .is_none()
        );
        assert!(
            handler
                .handle_str(
                    r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":4}}"#
                )
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn ping_method_returns_empty_object() {
        let response = call(
            &idle_handler(),
            json!({"jsonrpc": "2.0", "id": "p", "method": "ping"}),
        )
        .await;
        assert_eq!(response, json!({"jsonrpc": "2.0", "id": "p", "result": {}}));
    }

    #[tokio::test]
    async fn tools_list_includes_schemas() {
        let response = call(
            &idle_handler(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        )
        .await;

        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 5);
        let last_trade = tools
            .iter()
            .find(|t| t["name"] == "polygon_last_trade")
            .unwrap();
        assert_eq!(last_trade["inputSchema"]["required"], json!(["symbol"]));
        assert_eq!(last_trade["inputSchema"]["additionalProperties"], false);
    }

    #[tokio::test]
    async fn ping_tool_returns_text_content() {
        let response = call(
            &idle_handler(),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "ping"}}),
        )
        .await;

        let result = &response["result"];
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["text"], "pong: hello");
        assert!(result.get("structuredContent").is_none());
    }

    #[tokio::test]
    async fn object_results_are_structured() {
        let mut credentials = MockCredentialPort::new();
        credentials.expect_resolve().returning(|_| {
            Ok(crate::domain::credentials::CredentialBundle::alpaca(
                "http://alpaca.test",
                "k",
                "s",
            ))
        });
        let mut upstream = MockUpstreamPort::new();
        upstream
            .expect_get_json()
            .times(1)
            .returning(|_| Ok(json!({"equity": "1000"})));

        let response = call(
            &handler(credentials, upstream),
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "alpaca_get_account", "arguments": {}}}),
        )
        .await;

        let result = &response["result"];
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"], json!({"equity": "1000"}));
        assert_eq!(result["content"][0]["text"], r#"{"equity":"1000"}"#);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let response = call(
            &idle_handler(),
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call",
                   "params": {"name": "place_order"}}),
        )
        .await;

        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["data"]["code"], "TOOL_NOT_FOUND");
    }

    #[tokio::test]
    async fn bad_arguments_are_invalid_params() {
        let response = call(
            &idle_handler(),
            json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call",
                   "params": {"name": "polygon_last_trade", "arguments": {}}}),
        )
        .await;

        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["data"]["code"], "VALIDATION_ERROR");
        assert_eq!(response["error"]["data"]["details"]["argument"], "symbol");
    }

    #[tokio::test]
    async fn rejected_symbol_is_error_result() {
        let mut upstream = MockUpstreamPort::new();
        upstream.expect_get_json().never();

        let response = call(
            &handler(MockCredentialPort::new(), upstream),
            json!({"jsonrpc": "2.0", "id": 10, "method": "tools/call",
                   "params": {"name": "polygon_last_trade", "arguments": {"symbol": "AA PL"}}}),
        )
        .await;

        assert!(response.get("error").is_none());
        let result = &response["result"];
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["code"], "VALIDATION_ERROR");
        assert_eq!(result["structuredContent"]["details"]["argument"], "symbol");
        assert_eq!(
            result["content"][0]["text"],
            result["structuredContent"].to_string()
        );
    }

    #[tokio::test]
    async fn tool_failure_is_error_result() {
        let mut credentials = MockCredentialPort::new();
        credentials.expect_resolve().returning(|upstream| {
            Err(ConfigError::MissingCredential {
                upstream,
                variable: "ALPACA_API_KEY",
            })
        });
        let mut upstream = MockUpstreamPort::new();
        upstream.expect_get_json().never();

        let response = call(
            &handler(credentials, upstream),
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call",
                   "params": {"name": "alpaca_list_positions"}}),
        )
        .await;

        let result = &response["result"];
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["code"], "CONFIGURATION_ERROR");
        assert_eq!(result["structuredContent"]["tool"], "alpaca_list_positions");
        assert_eq!(result["structuredContent"]["details"]["upstream"], Upstream::Alpaca.as_str());
    }

    #[tokio::test]
    async fn missing_call_params_is_invalid_params() {
        let response = call(
            &idle_handler(),
            json!({"jsonrpc": "2.0", "id": 8, "method": "tools/call"}),
        )
        .await;
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method_and_bad_input() {
        let handler = idle_handler();
        let response = call(
            &handler,
            json!({"jsonrpc": "2.0", "id": 9, "method": "resources/list"}),
        )
        .await;
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);

        let parse = handler.handle_str("not json").await.unwrap();
        assert_eq!(parse.error.unwrap().code, PARSE_ERROR);

        let batch = handler.handle_str("[]").await.unwrap();
        assert_eq!(batch.error.unwrap().code, INVALID_REQUEST);
    }

    #[test]
    fn cancelled_params_parse() {
        let request = Request {
            jsonrpc: "2.0".into(),
            id: None,
            method: "notifications/cancelled".into(),
            params: Some(json!({"requestId": "abc", "reason": "user"})),
        };
        let params = CancelledParams::from_request(&request).unwrap();
        assert_eq!(params.request_id, RequestId::String("abc".into()));
        assert_eq!(params.reason.as_deref(), Some("user"));
    }
}

//! JSON-RPC 2.0 message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Malformed JSON.
pub const PARSE_ERROR: i64 = -32700;
/// Not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// Method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters, including unknown tools and bad arguments.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// Request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id.
    Number(i64),
    /// String id.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// An incoming request or notification.
///
/// Notifications carry no `id` and never receive a response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    /// Protocol version; must be `"2.0"`.
    pub jsonrpc: String,
    /// Request id, absent for notifications.
    #[serde(default)]
    pub id: Option<RequestId>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    /// Whether the message expects no response.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Short description.
    pub message: String,
    /// Structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Outgoing response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    /// Id of the request being answered, `null` when it could not be read.
    pub id: Option<RequestId>,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Successful response.
    #[must_use]
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    #[must_use]
    pub fn error(
        id: Option<RequestId>,
        code: i64,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    /// Render as JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Outcome of reading one raw message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A request or notification to handle.
    Request(Request),
    /// A reply to a server-initiated request; nothing to do.
    Reply,
    /// The message was unusable; send this back.
    Invalid(Response),
}

/// Parse one raw JSON-RPC message.
#[must_use]
pub fn parse_message(raw: &str) -> Incoming {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => parse_value(value),
        Err(e) => Incoming::Invalid(Response::error(
            None,
            PARSE_ERROR,
            format!("parse error: {e}"),
            None,
        )),
    }
}

/// Interpret an already-decoded JSON value as a message.
#[must_use]
pub fn parse_value(value: Value) -> Incoming {
    let Value::Object(object) = &value else {
        let message = if value.is_array() {
            "batch requests are not supported"
        } else {
            "request must be a JSON object"
        };
        return Incoming::Invalid(Response::error(None, INVALID_REQUEST, message, None));
    };

    // Salvage the id so the error can still be correlated.
    let id = object
        .get("id")
        .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

    if !object.contains_key("method")
        && (object.contains_key("result") || object.contains_key("error"))
    {
        return Incoming::Reply;
    }

    match serde_json::from_value::<Request>(value) {
        Ok(request) if request.jsonrpc == JSONRPC_VERSION => Incoming::Request(request),
        Ok(request) => Incoming::Invalid(Response::error(
            request.id,
            INVALID_REQUEST,
            format!("unsupported jsonrpc version `{}`", request.jsonrpc),
            None,
        )),
        Err(e) => Incoming::Invalid(Response::error(
            id,
            INVALID_REQUEST,
            format!("invalid request: {e}"),
            None,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_request_and_notification() {
        let Incoming::Request(request) =
            parse_message(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#)
        else {
            panic!("expected request");
        };
        assert_eq!(request.id, Some(RequestId::Number(7)));
        assert!(!request.is_notification());

        let Incoming::Request(notification) =
            parse_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        else {
            panic!("expected notification");
        };
        assert!(notification.is_notification());
    }

    #[test]
    fn string_ids_are_preserved() {
        let Incoming::Request(request) =
            parse_message(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#)
        else {
            panic!("expected request");
        };
        assert_eq!(request.id, Some(RequestId::String("abc".into())));
        assert_eq!(
            Response::success(request.id, json!({})).to_value(),
            json!({"jsonrpc": "2.0", "id": "abc", "result": {}})
        );
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let Incoming::Invalid(response) = parse_message("{not json") else {
            panic!("expected error");
        };
        let value = response.to_value();
        assert_eq!(value["error"]["code"], PARSE_ERROR);
        assert_eq!(value["id"], Value::Null);
    }

    #[test]
    fn batches_are_rejected() {
        let Incoming::Invalid(response) =
            parse_message(r#"[{"jsonrpc":"2.0","id":1,"method":"ping"}]"#)
        else {
            panic!("expected error");
        };
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }

    #[test]
    fn missing_method_keeps_id() {
        let Incoming::Invalid(response) = parse_message(r#"{"jsonrpc":"2.0","id":3}"#) else {
            panic!("expected error");
        };
        assert_eq!(response.id, Some(RequestId::Number(3)));
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }

    #[test]
    fn wrong_version_is_invalid() {
        let Incoming::Invalid(response) =
            parse_message(r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#)
        else {
            panic!("expected error");
        };
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }

    #[test]
    fn client_replies_are_ignored() {
        assert_eq!(
            parse_message(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#),
            Incoming::Reply
        );
    }
}

//! JSON-RPC 2.0 types for tool-server communication.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// Any line a tool server writes to its stdout.
///
/// Responses, notifications and server-initiated requests share one shape on
/// the wire; [`JsonRpcMessage::kind`] tells them apart.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// What a [`JsonRpcMessage`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Response,
    Notification,
    Request,
}

impl JsonRpcMessage {
    pub fn kind(&self) -> MessageKind {
        match (&self.method, self.has_id()) {
            (Some(_), false) => MessageKind::Notification,
            (Some(_), true) => MessageKind::Request,
            (None, _) => MessageKind::Response,
        }
    }

    /// Whether this response answers request `id`.
    ///
    /// Error responses with a null id (e.g. a parse error on the server side)
    /// are attributed to the outstanding request.
    pub fn answers(&self, id: u64) -> bool {
        match &self.id {
            None | Some(serde_json::Value::Null) => self.error.is_some(),
            Some(value) => value.as_u64() == Some(id),
        }
    }

    fn has_id(&self) -> bool {
        !matches!(self.id, None | Some(serde_json::Value::Null))
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Displays as the error object's JSON, which is what a tool turn receives.
impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "error {}: {}", self.code, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialize_request_wire_format() {
        let req = JsonRpcRequest::new(1, "tools/list", json!({}));
        let line = serde_json::to_string(&req).unwrap();
        assert_eq!(
            line,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#
        );
    }

    #[test]
    fn serialize_call_request() {
        let req = JsonRpcRequest::new(
            7,
            "tools/call",
            json!({"name": "add", "arguments": {"a": 2, "b": 3}}),
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["params"]["name"], "add");
        assert_eq!(json["params"]["arguments"]["b"], 3);
    }

    #[test]
    fn response_with_result() {
        let msg: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#).unwrap();
        assert_eq!(msg.kind(), MessageKind::Response);
        assert!(msg.answers(1));
        assert!(!msg.answers(2));
        assert!(msg.result.is_some());
    }

    #[test]
    fn response_with_error() {
        let msg: JsonRpcMessage = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        let err = msg.error.unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Method not found");
        assert!(err.data.is_none());
    }

    #[test]
    fn error_displays_as_json() {
        let err = JsonRpcError {
            code: -32602,
            message: "Invalid params".into(),
            data: None,
        };
        assert_eq!(err.to_string(), r#"{"code":-32602,"message":"Invalid params"}"#);
    }

    #[test]
    fn null_id_error_answers_outstanding_request() {
        let msg: JsonRpcMessage = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}"#,
        )
        .unwrap();
        assert_eq!(msg.kind(), MessageKind::Response);
        assert!(msg.answers(42));
    }

    #[test]
    fn notification_is_not_a_response() {
        let msg: JsonRpcMessage = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"notifications/message","params":{"level":"info"}}"#,
        )
        .unwrap();
        assert_eq!(msg.kind(), MessageKind::Notification);
    }

    #[test]
    fn server_request_is_detected() {
        let msg: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"srv-1","method":"ping"}"#).unwrap();
        assert_eq!(msg.kind(), MessageKind::Request);
        assert!(!msg.answers(1));
    }
}

//! JSON-RPC 2.0 envelope types.
//!
//! The MCP automation server speaks plain JSON-RPC over HTTP POST. Only the
//! request/response halves are modelled; the client never receives
//! server-initiated requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// A request ID in JSON-RPC.
///
/// Can be either a string or number according to the JSON-RPC spec.
///
/// # Examples
///
/// ```rust
/// use dataprobe::types::RequestId;
/// use serde_json::json;
///
/// assert_eq!(json!(RequestId::from(42i64)), json!(42));
/// assert_eq!(json!(RequestId::from("req-1")), json!("req-1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String request ID
    String(String),
    /// Numeric request ID
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        Self::Number(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

/// A JSON-RPC request that expects a response.
///
/// # Examples
///
/// ```rust
/// use dataprobe::types::JSONRPCRequest;
/// use serde_json::json;
///
/// let request = JSONRPCRequest::new(7u64, "tools/call", Some(json!({"name": "list_feeds"})));
/// let wire = serde_json::to_value(&request).unwrap();
/// assert_eq!(wire["jsonrpc"], "2.0");
/// assert_eq!(wire["id"], 7);
/// assert_eq!(wire["params"]["name"], "list_feeds");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCRequest<P = Value> {
    /// Must be "2.0"
    pub jsonrpc: String,
    /// Method name to invoke
    pub method: String,
    /// Optional method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<P>,
    /// Unique request identifier
    pub id: RequestId,
}

impl<P> JSONRPCRequest<P> {
    /// Create a new JSON-RPC request.
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<P>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: id.into(),
        }
    }
}

/// A JSON-RPC response.
///
/// Both `result` and `error` are optional on the wire; [`Self::into_result`]
/// applies the precedence the client relies on (an `error` member wins).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JSONRPCResponse {
    /// Should be "2.0"; tolerated when missing
    #[serde(default)]
    pub jsonrpc: String,
    /// Request ID this response corresponds to (`null` for parse errors)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Successful result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JSONRPCError>,
}

impl JSONRPCResponse {
    /// Create a successful response.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn failure(id: Option<RequestId>, error: JSONRPCError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Collapse the response into the result value or a protocol error.
    pub fn into_result(self) -> crate::Result<Value> {
        if let Some(error) = self.error {
            return Err(crate::Error::from_jsonrpc_error(error));
        }
        self.result
            .ok_or_else(|| crate::Error::parse("response has neither result nor error"))
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Optional additional data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JSONRPCError {
    /// Create a new JSON-RPC error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl fmt::Display for JSONRPCError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_member_wins_over_result() {
        let response: JSONRPCResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {"content": "[]"},
            "error": {"code": -32602, "message": "bad keyword"}
        }))
        .unwrap();
        assert!(response.is_error());
        let err = response.into_result().unwrap_err();
        assert!(err.is_error_code(crate::error::ErrorCode::INVALID_PARAMS));
    }

    #[test]
    fn null_id_is_accepted() {
        let response: JSONRPCResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": {"code": -32700, "message": "Parse error"}
        }))
        .unwrap();
        assert!(response.id.is_none());
    }

    #[test]
    fn empty_response_is_a_parse_error() {
        let response: JSONRPCResponse = serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1})).unwrap();
        assert!(matches!(response.into_result(), Err(crate::Error::Parse(_))));
    }

    #[test]
    fn string_ids_round_trip() {
        let id: RequestId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(id, RequestId::from("abc"));
        assert_eq!(id.to_string(), "abc");
    }
}

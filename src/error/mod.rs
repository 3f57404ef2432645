//! Error types for dataprobe.
//!
//! Every probe (MCP tool calls, quote scraping, SQLite reads, report output)
//! reports failures through the single [`Error`] type below. Callers that
//! follow the "log and carry on" policy use the `try_*` helpers instead of
//! matching on variants.

use std::fmt;
use thiserror::Error;

/// Result type alias for dataprobe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Error, Debug)]
pub enum Error {
    /// JSON-RPC error object returned by the MCP server, or a tool result
    /// flagged with `isError`.
    #[error("Protocol error: {code} - {message}")]
    Protocol {
        /// Error code as defined in JSON-RPC spec
        code: ErrorCode,
        /// Human-readable error message
        message: String,
        /// Optional additional error data
        data: Option<serde_json::Value>,
    },

    /// HTTP-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A payload had an unexpected shape (positional quote text, embedded
    /// tool content, kline rows).
    #[error("Parse error: {0}")]
    Parse(String),

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout errors
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON-RPC error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Parse error (-32700)
    pub const PARSE_ERROR: Self = Self(-32700);
    /// Invalid request (-32600)
    pub const INVALID_REQUEST: Self = Self(-32600);
    /// Method not found (-32601)
    pub const METHOD_NOT_FOUND: Self = Self(-32601);
    /// Invalid params (-32602)
    pub const INVALID_PARAMS: Self = Self(-32602);
    /// Internal error (-32603)
    pub const INTERNAL_ERROR: Self = Self(-32603);
    /// Request timeout (-32001)
    pub const REQUEST_TIMEOUT: Self = Self(-32001);
    /// Tool reported a failure in its result (`isError: true`)
    pub const TOOL_ERROR: Self = Self(-32010);

    /// Create a custom error code.
    pub const fn other(code: i32) -> Self {
        Self(code)
    }

    /// Convert error code to i32 value.
    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// Classify a raw code received from a server.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dataprobe::error::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::from_i32(-32601), ErrorCode::METHOD_NOT_FOUND);
    /// // Implementation-defined server errors collapse to INTERNAL_ERROR
    /// assert_eq!(ErrorCode::from_i32(-32050), ErrorCode::INTERNAL_ERROR);
    /// assert_eq!(ErrorCode::from_i32(-40000).as_i32(), -40000);
    /// ```
    pub fn from_i32(code: i32) -> Self {
        match code {
            -32700 => Self::PARSE_ERROR,
            -32600 => Self::INVALID_REQUEST,
            -32601 => Self::METHOD_NOT_FOUND,
            -32602 => Self::INVALID_PARAMS,
            -32603 => Self::INTERNAL_ERROR,
            -32001 => Self::REQUEST_TIMEOUT,
            -32010 => Self::TOOL_ERROR,
            -32099..=-32000 => Self::INTERNAL_ERROR,
            other => Self::other(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP transport errors.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read
    #[error("Request error: {0}")]
    Request(String),

    /// The server answered with a non-success status
    #[error("HTTP status {status}: {body}")]
    Status {
        /// Status code
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// Response body was not a JSON-RPC message
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Invalid URL or request construction failure
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(TransportError::Request(err.to_string()))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Transport(TransportError::InvalidRequest(err.to_string()))
    }
}

impl Error {
    /// Create a protocol error with the given code and message.
    pub fn protocol(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an error for an unexpected HTTP status.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > 200 {
            let mut cut = 200;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Self::Transport(TransportError::Status { status, body })
    }

    /// Map a `reqwest` failure, reporting timeouts with the configured budget.
    pub fn from_reqwest(err: reqwest::Error, timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            return Self::Timeout(ms);
        }
        err.into()
    }

    /// Convert a JSON-RPC error object into an [`Error`].
    pub fn from_jsonrpc_error(error: crate::types::JSONRPCError) -> Self {
        Self::Protocol {
            code: ErrorCode::from_i32(error.code),
            message: error.message,
            data: error.data,
        }
    }

    /// Check if this is a protocol error with a specific code.
    pub fn is_error_code(&self, code: ErrorCode) -> bool {
        matches!(self, Self::Protocol { code: c, .. } if *c == code)
    }

    /// Get the error code if this is a protocol error.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_conversion() {
        assert_eq!(ErrorCode::PARSE_ERROR.as_i32(), -32700);
        assert_eq!(ErrorCode::from_i32(-32700), ErrorCode::PARSE_ERROR);
        assert_eq!(ErrorCode::from_i32(-32010), ErrorCode::TOOL_ERROR);
        assert_eq!(ErrorCode::from_i32(-32050), ErrorCode::INTERNAL_ERROR);
    }

    #[test]
    fn error_creation() {
        let err = Error::protocol(ErrorCode::INVALID_REQUEST, "bad request");
        assert!(err.is_error_code(ErrorCode::INVALID_REQUEST));
        assert_eq!(err.error_code(), Some(ErrorCode::INVALID_REQUEST));

        let err = Error::validation("invalid field");
        assert_eq!(err.error_code(), None);
    }

    #[test]
    fn status_body_is_truncated_on_char_boundary() {
        let body = "错".repeat(100);
        let err = Error::status(502, body);
        assert_eq!(err.http_status(), Some(502));
        match err {
            Error::Transport(TransportError::Status { body, .. }) => {
                assert!(body.len() <= 200);
                assert!(body.chars().all(|c| c == '错'));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn jsonrpc_error_maps_to_protocol() {
        let err = Error::from_jsonrpc_error(crate::types::JSONRPCError::new(-32601, "no such tool"));
        assert!(err.is_error_code(ErrorCode::METHOD_NOT_FOUND));
        assert!(err.to_string().contains("no such tool"));
    }
}

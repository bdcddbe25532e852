//! Error types for mailrpc
//!
//! This module provides the error model shared by every mailrpc crate.
//! It defines three types:
//!
//! - **ErrorCode**: The integer code carried on the wire, with its fixed category
//! - **RpcError**: Wire-format errors as defined by JSON-RPC 2.0
//! - **Error**: Application-level errors for internal use (uses thiserror)
//!
//! # Standard Error Codes
//!
//! JSON-RPC 2.0 defines standard error codes:
//! - `-32700`: Parse error (invalid JSON)
//! - `-32600`: Invalid request (version mismatch, ill-formed method name)
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error
//! - `-32000 to -32099`: Server error (implementation-defined)
//!
//! Any other code is an application error and is passed through untouched.
//!
//! # Examples
//!
//! ```rust
//! use mailrpc_core::{Error, ErrorCategory, RpcError};
//!
//! let wire = RpcError::method_not_found("rpc: can't find service \"Mail\"");
//! assert_eq!(wire.code.category(), ErrorCategory::MethodNotFound);
//!
//! // Handler errors that are not protocol errors become internal errors
//! let err = Error::Internal("smtp dial failed".into());
//! assert_eq!(err.into_rpc_error().code.code(), -32603);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use thiserror::Error;

/// Result type for mailrpc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric JSON-RPC error code
///
/// Serializes as a bare integer. The associated constants name the codes
/// reserved by JSON-RPC 2.0; anything else is application-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(i32);

impl ErrorCode {
    /// Invalid JSON was received by the server
    pub const PARSE_ERROR: ErrorCode = ErrorCode(-32700);
    /// The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: ErrorCode = ErrorCode(-32600);
    /// The method does not exist / is not available
    pub const METHOD_NOT_FOUND: ErrorCode = ErrorCode(-32601);
    /// Invalid method parameter(s)
    pub const INVALID_PARAMS: ErrorCode = ErrorCode(-32602);
    /// Internal JSON-RPC error
    pub const INTERNAL_ERROR: ErrorCode = ErrorCode(-32603);
    /// First code of the range reserved for implementation-defined server errors
    pub const SERVER_ERROR: ErrorCode = ErrorCode(-32000);

    /// Wrap an arbitrary integer code
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// The raw integer value
    pub const fn code(self) -> i32 {
        self.0
    }

    /// The fixed category this code belongs to
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            -32700 => ErrorCategory::Parse,
            -32600 => ErrorCategory::InvalidRequest,
            -32601 => ErrorCategory::MethodNotFound,
            -32602 => ErrorCategory::InvalidParams,
            -32603 => ErrorCategory::Internal,
            -32099..=-32000 => ErrorCategory::Server,
            _ => ErrorCategory::Application,
        }
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Parse,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    Internal,
    /// The `-32099..=-32000` range
    Server,
    /// Any code outside the reserved ranges
    Application,
}

/// JSON-RPC 2.0 error object as it appears on the wire
///
/// This is the `error` member of a response. Handlers that want a specific
/// code or `data` payload to reach the client return one of these wrapped in
/// [`Error::Rpc`]; the dispatcher forwards it verbatim.
///
/// # Examples
///
/// ```rust
/// use mailrpc_core::RpcError;
/// use serde_json::json;
///
/// let custom = RpcError::with_data(
///     1001,
///     "Mailbox full",
///     json!({"quota": "1GB"})
/// );
/// assert_eq!(custom.code.code(), 1001);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code indicating the error type
    pub code: ErrorCode,

    /// Short, single-sentence description of the error
    pub message: String,

    /// Optional structured information about the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new error with code and message
    pub fn new(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Create a new error carrying additional data
    pub fn with_data(
        code: impl Into<ErrorCode>,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create a parse error (-32700)
    ///
    /// The message is the parser's own description of what went wrong.
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::PARSE_ERROR, msg)
    }

    /// Create an invalid request error (-32600)
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::INVALID_REQUEST, msg)
    }

    /// Create a method not found error (-32601)
    pub fn method_not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::METHOD_NOT_FOUND, msg)
    }

    /// Create an invalid params error (-32602)
    ///
    /// The raw params that failed to bind are attached as `data` so the
    /// client can see exactly what the server received. Raw params are
    /// always valid JSON, so the `data` conversion only falls back to a
    /// string if the value somehow cannot be re-read.
    pub fn invalid_params(msg: impl Into<String>, params: &RawValue) -> Self {
        let data = serde_json::from_str(params.get())
            .unwrap_or_else(|_| serde_json::Value::String(params.get().to_string()));
        Self::with_data(ErrorCode::INVALID_PARAMS, msg, data)
    }

    /// Create an internal error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::INTERNAL_ERROR, msg)
    }

    /// Create a server error (-32000)
    pub fn server_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SERVER_ERROR, msg)
    }

    /// The category of this error's code
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Display for RpcError {
    /// Formats as "[code] message", e.g. "[-32601] rpc: can't find method"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Application-level error type for mailrpc operations
///
/// Handlers return this type. Only [`Error::Rpc`] reaches the client
/// unchanged; every other variant is reported as an internal error whose
/// message is the variant's display text.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// JSON-RPC protocol error, already in wire format
    #[error("JSON-RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Input/output error, including binding and network failures
    #[error("IO error: {0}")]
    Io(String),

    /// Unexpected failure while executing a method
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert into the error object written to the client
    pub fn into_rpc_error(self) -> RpcError {
        match self {
            Error::Rpc(err) => err,
            other => RpcError::internal_error(other.to_string()),
        }
    }
}

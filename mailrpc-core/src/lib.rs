//! Core JSON-RPC 2.0 types for mailrpc
//!
//! This crate holds everything about the protocol that does not depend on a
//! transport or on the service registry:
//!
//! - **Types**: the request and response shapes, and the raw request id
//! - **Codec**: decoding request payloads and encoding responses
//! - **Errors**: the wire error object and its fixed code categories
//! - **Params**: binding raw params into typed argument shapes
//! - **Observability**: JSON logging plus optional OTLP traces and metrics
//!
//! # Example
//!
//! ```rust
//! use mailrpc_core::{codec, Response};
//! use serde_json::json;
//!
//! let request = codec::decode(br#"{"jsonrpc":"2.0","method":"Service.SendMail","id":"a1"}"#).unwrap();
//! let response = Response::success(json!(true), request.id);
//!
//! let bytes = codec::encode_response(&response).unwrap();
//! assert_eq!(bytes, b"{\"jsonrpc\":\"2.0\",\"result\":true,\"id\":\"a1\"}\n");
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod params;
pub mod types;

pub use codec::Rejected;
pub use error::{Error, ErrorCategory, ErrorCode, Result, RpcError};
pub use observability::{
    init_observability, ObservabilityConfig, ObservabilityError, ObservabilityGuard,
};
pub use params::{BindError, Field, FieldKind, Hook, HookTable, JsonKind, ParamBinder, RpcParams};
pub use types::{Id, Request, Response, VERSION};

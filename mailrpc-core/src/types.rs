//! JSON-RPC 2.0 wire types
//!
//! The server only ever *receives* requests and *sends* responses, so this
//! module models exactly those two shapes plus the request identifier.
//!
//! # Request IDs
//!
//! The identifier is kept as raw JSON text. Whatever the client sent (a
//! string, a number, `null`, or something stranger) is echoed back byte for
//! byte. An absent or `null` id marks the request as a notification.
//!
//! # Params
//!
//! Params are also kept raw until a method has been resolved; only then do we
//! know which argument shape to bind them into (see [`crate::params`]).

use crate::error::{Error, Result, RpcError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// The only protocol version this server accepts
pub const VERSION: &str = "2.0";

/// JSON-RPC 2.0 request ID
///
/// Serializes transparently as the original JSON text, or `null` when the
/// request carried no id.
///
/// # Examples
///
/// ```rust
/// use mailrpc_core::Id;
///
/// let id = Id::new(&"req-123").unwrap();
/// assert_eq!(id.to_string(), "\"req-123\"");
/// assert!(Id::null().is_null());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Option<Box<RawValue>>);

impl Id {
    /// An absent id (serializes as `null`)
    pub fn null() -> Self {
        Self(None)
    }

    /// Build an id from any serializable value
    pub fn new<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let raw = serde_json::value::to_raw_value(value)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    /// Wrap raw JSON text; a literal `null` is treated as absent
    pub fn from_raw(raw: Box<RawValue>) -> Self {
        if raw.get().trim() == "null" {
            Self(None)
        } else {
            Self(Some(raw))
        }
    }

    /// True when the request had no usable id, i.e. it is a notification
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// The raw JSON text of the id, if any
    pub fn as_raw(&self) -> Option<&RawValue> {
        self.0.as_deref()
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.as_raw().map(RawValue::get) == other.as_raw().map(RawValue::get)
    }
}

impl Eq for Id {}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_raw() {
            Some(raw) => f.write_str(raw.get()),
            None => f.write_str("null"),
        }
    }
}

/// JSON-RPC 2.0 request as received by the server
///
/// Every field is optional at the serde level: a missing or `null` `jsonrpc`
/// or `method` decodes to an empty string and is then rejected by version or
/// method validation, rather than failing the whole parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Protocol version, must equal [`VERSION`]
    #[serde(rename = "jsonrpc", default, deserialize_with = "null_as_empty")]
    pub version: String,

    /// Dotted method name, e.g. `"Service.SendMail"`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub method: String,

    /// Raw, not yet bound, parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Box<RawValue>>,

    /// Request id; absent or `null` makes this a notification
    #[serde(default)]
    pub id: Id,
}

impl Request {
    /// True when no response is expected on success
    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }
}

/// JSON-RPC 2.0 response
///
/// Exactly one of `result` and `error` is present. The absent one is omitted
/// from the JSON entirely rather than written as `null`.
///
/// # Examples
///
/// ```rust
/// use mailrpc_core::{Id, Response};
/// use serde_json::json;
///
/// let response = Response::success(json!(true), Id::new(&1).unwrap());
/// let json = serde_json::to_string(&response).unwrap();
/// assert_eq!(json, r#"{"jsonrpc":"2.0","result":true,"id":1}"#);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Protocol version, always [`VERSION`]
    #[serde(rename = "jsonrpc")]
    pub version: String,

    /// Method result, present only on success
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub result: Option<serde_json::Value>,

    /// Error object, present only on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,

    /// Echo of the request id (`null` when it was absent or unreadable)
    pub id: Id,
}

impl Response {
    /// A successful response carrying `result`
    pub fn success(result: serde_json::Value, id: Id) -> Self {
        Self {
            version: VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// A failed response carrying `error`
    pub fn error(error: RpcError, id: Id) -> Self {
        Self {
            version: VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Keeps an explicit `"result": null` distinct from a missing member
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

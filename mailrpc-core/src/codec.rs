//! JSON codec for JSON-RPC requests and responses
//!
//! Decoding turns a transport payload into a [`Request`] and validates the
//! protocol version. A rejected payload still yields whatever id could be
//! recovered, because the error response has to echo it.
//!
//! # Error Mapping
//!
//! - Payload is not valid JSON, or has the wrong member types → `-32700`
//! - `jsonrpc` is anything but `"2.0"` (including missing) → `-32600`
//!
//! # Examples
//!
//! ```rust
//! use mailrpc_core::codec;
//!
//! let request = codec::decode(br#"{"jsonrpc":"2.0","method":"Service.SendMail","id":1}"#).unwrap();
//! assert_eq!(request.method, "Service.SendMail");
//!
//! let rejected = codec::decode(br#"{"jsonrpc":"1.0","method":"Service.SendMail","id":9}"#).unwrap_err();
//! assert_eq!(rejected.error.code.code(), -32600);
//! assert_eq!(rejected.id.to_string(), "9");
//! ```

use crate::error::{Error, Result, RpcError};
use crate::types::{Id, Request, Response, VERSION};
use serde::Deserialize;

/// A payload that could not be turned into a valid request
#[derive(Debug, Clone)]
pub struct Rejected {
    /// Parse or invalid-request error to report
    pub error: RpcError,
    /// Best-effort id recovered from the payload
    pub id: Id,
}

/// Decode a transport payload into a request
///
/// # Errors
///
/// Returns [`Rejected`] carrying a parse error when the payload is not a
/// JSON-RPC object, or an invalid-request error on a version mismatch.
pub fn decode(body: &[u8]) -> std::result::Result<Request, Rejected> {
    let request: Request = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            return Err(Rejected {
                error: RpcError::parse_error(e.to_string()),
                id: recover_id(body),
            })
        }
    };

    if request.version != VERSION {
        return Err(Rejected {
            error: RpcError::invalid_request(format!("jsonrpc must be {}", VERSION)),
            id: request.id,
        });
    }

    Ok(request)
}

/// Salvage the `id` member from a payload that failed to decode
///
/// Only JSON objects are probed; a syntactically broken payload or a
/// non-object (e.g. a batch array) yields a null id.
fn recover_id(body: &[u8]) -> Id {
    #[derive(Deserialize)]
    struct IdProbe {
        #[serde(default)]
        id: Id,
    }

    let is_object = body
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');
    if !is_object {
        return Id::null();
    }

    serde_json::from_slice::<IdProbe>(body)
        .map(|probe| probe.id)
        .unwrap_or_default()
}

/// Encode a response as a single line of JSON
///
/// # Errors
///
/// Returns `Error::Serialization` if the response cannot be serialized.
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    let mut bytes =
        serde_json::to_vec(response).map_err(|e| Error::Serialization(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode a response, e.g. on the client side of a test
pub fn decode_response(data: &[u8]) -> Result<Response> {
    serde_json::from_slice(data).map_err(|e| Error::Serialization(e.to_string()))
}

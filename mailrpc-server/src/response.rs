//! Response writing
//!
//! Whether a body is written at all is decided by a [`Disposition`] built once
//! from the request id. Only core failures that make the request itself
//! untrustworthy (an undecodable payload, a wrong version, an ill-formed
//! method name) escalate it so that a notification still gets an answer.

use crate::codec::Codec;
use mailrpc_core::{Id, Response, RpcError};
use serde_json::Value;

/// Whether the client expects an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    Notification,
}

/// Emission verdict for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disposition {
    kind: CallKind,
    must_respond: bool,
}

impl Disposition {
    /// A call if `id` is present, otherwise a notification
    pub fn for_id(id: &Id) -> Self {
        let kind = if id.is_null() {
            CallKind::Notification
        } else {
            CallKind::Call
        };
        Self {
            kind,
            must_respond: false,
        }
    }

    /// Force a body even for a notification
    pub fn escalate(&mut self) {
        self.must_respond = true;
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn must_respond(&self) -> bool {
        self.must_respond
    }

    pub fn emits_body(&self) -> bool {
        self.kind == CallKind::Call || self.must_respond
    }
}

/// What the transport should send back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// An encoded response body
    Body {
        content_type: &'static str,
        bytes: Vec<u8>,
    },
    /// A notification that gets no body
    Suppressed { content_type: &'static str },
    /// The response could not be encoded
    Failed(String),
}

/// Serializes outcomes through the request's codec
pub struct ResponseWriter<'a> {
    codec: &'a dyn Codec,
}

impl<'a> ResponseWriter<'a> {
    pub fn new(codec: &'a dyn Codec) -> Self {
        Self { codec }
    }

    /// Turn an outcome into a reply, consulting `disposition` once
    pub fn write(
        &self,
        disposition: Disposition,
        id: Id,
        outcome: Result<Value, RpcError>,
    ) -> Reply {
        let content_type = self.codec.content_type();
        if !disposition.emits_body() {
            return Reply::Suppressed { content_type };
        }

        let response = match outcome {
            Ok(result) => Response::success(result, id),
            Err(error) => Response::error(error, id),
        };

        match self.codec.encode(&response) {
            Ok(bytes) => Reply::Body {
                content_type,
                bytes,
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response");
                Reply::Failed(e.to_string())
            }
        }
    }
}

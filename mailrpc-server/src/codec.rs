//! Codecs and content-type negotiation
//!
//! A [`Codec`] turns request bodies into [`Request`]s and [`Response`]s back
//! into bytes. The [`CodecRegistry`] picks one per request from the
//! `Content-Type` header.

use crate::context::media_type;
use mailrpc_core::{codec, Rejected, Request, Response, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Content type written on every JSON response
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Wire format for requests and responses
pub trait Codec: Send + Sync {
    /// Decode a request body
    ///
    /// # Errors
    ///
    /// A [`Rejected`] carries the parse or invalid-request error plus
    /// whatever id could be recovered.
    fn decode(&self, body: &[u8]) -> std::result::Result<Request, Rejected>;

    /// Encode a response body
    fn encode(&self, response: &Response) -> Result<Vec<u8>>;

    /// `Content-Type` header value for encoded responses
    fn content_type(&self) -> &'static str;
}

/// JSON-RPC 2.0 over JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, body: &[u8]) -> std::result::Result<Request, Rejected> {
        codec::decode(body)
    }

    fn encode(&self, response: &Response) -> Result<Vec<u8>> {
        codec::encode_response(response)
    }

    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }
}

/// No codec is registered for the request's media type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rpc: unrecognized Content-Type: {0}")]
pub struct UnsupportedMediaType(pub String);

/// Codecs keyed by lower-cased media type
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `codec` for `content_type`; parameters after `;` are ignored
    pub fn register(&mut self, content_type: &str, codec: Arc<dyn Codec>) {
        self.codecs.insert(media_type(content_type), codec);
    }

    /// Pick the codec for a request's `Content-Type` header
    ///
    /// With no header and exactly one registered codec, that codec is used.
    ///
    /// # Errors
    ///
    /// Fails with the requested media type if nothing matches.
    pub fn select(
        &self,
        content_type: Option<&str>,
    ) -> std::result::Result<Arc<dyn Codec>, UnsupportedMediaType> {
        let requested = content_type.map(media_type).unwrap_or_default();

        if requested.is_empty() && self.codecs.len() == 1 {
            if let Some(codec) = self.codecs.values().next() {
                return Ok(Arc::clone(codec));
            }
        }

        self.codecs
            .get(&requested)
            .cloned()
            .ok_or(UnsupportedMediaType(requested))
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("content_types", &self.codecs.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_only() -> CodecRegistry {
        let mut codecs = CodecRegistry::new();
        codecs.register("application/json", Arc::new(JsonCodec));
        codecs
    }

    #[test]
    fn test_select_ignores_parameters_and_case() {
        let codecs = json_only();
        let codec = codecs.select(Some("Application/JSON; charset=utf-8")).unwrap();
        assert_eq!(codec.content_type(), JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_single_codec_is_default() {
        assert!(json_only().select(None).is_ok());
        assert!(json_only().select(Some("")).is_ok());
    }

    #[test]
    fn test_no_default_with_several_codecs() {
        let mut codecs = json_only();
        codecs.register("application/json-rpc", Arc::new(JsonCodec));

        assert_eq!(codecs.len(), 2);
        assert!(codecs.select(None).is_err());
        assert!(codecs.select(Some("application/json-rpc")).is_ok());
    }

    #[test]
    fn test_unknown_media_type() {
        let err = json_only().select(Some("text/plain; charset=utf-8")).err().unwrap();

        assert_eq!(err, UnsupportedMediaType("text/plain".into()));
        assert_eq!(err.to_string(), "rpc: unrecognized Content-Type: text/plain");
    }

    #[test]
    fn test_empty_registry_selects_nothing() {
        assert!(CodecRegistry::new().select(None).is_err());
    }
}

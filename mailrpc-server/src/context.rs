//! Transport context handed to every method invocation

use std::net::SocketAddr;
use warp::http::HeaderMap;

/// What the transport knows about the request being served
///
/// Methods receive this alongside their bound argument. It is cheap to clone
/// and owned by the invocation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            headers,
            remote_addr,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Media type of the request body, without parameters, lower-cased
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type")
            .map(media_type)
            .filter(|t| !t.is_empty())
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

/// Strip `;`-separated parameters and normalise case
pub(crate) fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

//! HTTP transport built on warp
//!
//! One endpoint accepts JSON-RPC over `POST`. Everything that is not a
//! JSON-RPC exchange (wrong method, unknown content type, oversized body) is
//! answered with a plain-text HTTP error; JSON-RPC outcomes, including
//! errors, are always `200`.
//!
//! The body limit is enforced while the body streams in, so chunked requests
//! without `Content-Length` are accepted as long as they stay under it.

use crate::codec::CodecRegistry;
use crate::context::RequestContext;
use crate::dispatcher::Dispatcher;
use crate::response::Reply;
use std::convert::Infallible;
use std::net::SocketAddr;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use warp::http::header::{HeaderValue, CONTENT_TYPE};
use warp::http::{HeaderMap, Method, StatusCode};
use warp::hyper::body::{Buf, Bytes};
use warp::{Filter, Rejection};

/// Header set on notification responses that carry no body
pub const NOTIFY_HEADER: &str = "json-rpc";
pub const NOTIFY_VALUE: &str = "notify";

/// Response type produced by every route
pub type HttpResponse = warp::http::Response<Vec<u8>>;

#[derive(Clone)]
pub(crate) struct RpcState {
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) codecs: Arc<CodecRegistry>,
}

#[derive(Debug)]
struct BodyTooLarge;

impl warp::reject::Reject for BodyTooLarge {}

#[derive(Debug)]
struct BodyUnreadable;

impl warp::reject::Reject for BodyUnreadable {}

/// Build the JSON-RPC endpoint
///
/// Bodies larger than `max_body_bytes` are refused with `413`, whether the
/// size is declared up front or only discovered while reading.
pub fn rpc_routes(
    dispatcher: Arc<Dispatcher>,
    codecs: Arc<CodecRegistry>,
    max_body_bytes: u64,
) -> impl Filter<Extract = (HttpResponse,), Error = Infallible> + Clone + Send + Sync + 'static {
    let state = RpcState { dispatcher, codecs };

    let not_post = warp::method().and_then(reject_non_post);

    let rpc = warp::post()
        .and(warp::header::headers_cloned())
        .and(warp::addr::remote())
        .and(limited_body(max_body_bytes))
        .and(warp::any().map(move || state.clone()))
        .and_then(handle_rpc);

    not_post
        .or(rpc)
        .unify()
        .recover(handle_rejection)
        .unify()
}

fn limited_body(limit: u64) -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and(warp::body::stream())
        .and_then(move |declared, stream| read_limited(declared, stream, limit))
}

/// Collect a body stream, refusing it as soon as it grows past `limit`
async fn read_limited<S, B>(declared: Option<u64>, stream: S, limit: u64) -> Result<Bytes, Rejection>
where
    S: Stream<Item = Result<B, warp::Error>> + Send,
    B: Buf + Send,
{
    if declared.is_some_and(|len| len > limit) {
        return Err(warp::reject::custom(BodyTooLarge));
    }

    let mut stream = Box::pin(stream);
    let mut body = Vec::with_capacity(declared.unwrap_or(0) as usize);
    while let Some(chunk) = stream.next().await {
        let mut chunk = chunk.map_err(|e| {
            tracing::debug!(error = %e, "failed reading request body");
            warp::reject::custom(BodyUnreadable)
        })?;

        if (body.len() + chunk.remaining()) as u64 > limit {
            return Err(warp::reject::custom(BodyTooLarge));
        }
        while chunk.has_remaining() {
            let bytes = chunk.chunk();
            let n = bytes.len();
            body.extend_from_slice(bytes);
            chunk.advance(n);
        }
    }

    Ok(Bytes::from(body))
}

async fn reject_non_post(method: Method) -> Result<HttpResponse, Rejection> {
    if method == Method::POST {
        return Err(warp::reject());
    }
    Ok(text_response(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("rpc: POST method required, received {}", method),
    ))
}

async fn handle_rpc(
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    body: Bytes,
    state: RpcState,
) -> Result<HttpResponse, Infallible> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let codec = match state.codecs.select(content_type) {
        Ok(codec) => codec,
        Err(e) => {
            tracing::debug!(error = %e, "no codec for request");
            return Ok(text_response(StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string()));
        }
    };

    let ctx = RequestContext::new(headers, remote_addr);
    let reply = state.dispatcher.dispatch(codec.as_ref(), ctx, &body).await;

    Ok(into_http(reply))
}

fn into_http(reply: Reply) -> HttpResponse {
    let (content_type, notify, bytes) = match reply {
        Reply::Body {
            content_type,
            bytes,
        } => (content_type, false, bytes),
        Reply::Suppressed { content_type } => (content_type, true, Vec::new()),
        Reply::Failed(message) => return text_response(StatusCode::BAD_REQUEST, message),
    };

    let mut response = HttpResponse::new(bytes);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    if notify {
        headers.insert(NOTIFY_HEADER, HeaderValue::from_static(NOTIFY_VALUE));
    }
    response
}

async fn handle_rejection(rejection: Rejection) -> Result<HttpResponse, Infallible> {
    let (status, message) = if rejection.find::<BodyTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "rpc: request body too large")
    } else if rejection.find::<BodyUnreadable>().is_some() {
        (StatusCode::BAD_REQUEST, "rpc: unreadable request body")
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "rpc: not found")
    } else {
        tracing::debug!(?rejection, "unhandled rejection");
        (StatusCode::BAD_REQUEST, "rpc: bad request")
    };

    Ok(text_response(status, message.to_string()))
}

fn text_response(status: StatusCode, message: String) -> HttpResponse {
    let mut response = HttpResponse::new(message.into_bytes());
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

//! JSON-RPC 2.0 server over HTTP
//!
//! This crate mounts a service registry and request dispatcher on a warp
//! HTTP endpoint.
//!
//! # Core Features
//!
//! - **Service Registry**: Receivers describe their methods explicitly and are
//!   registered under a service name; requests address them as
//!   `"Service.Method"`
//! - **Typed Params**: Params are bound into each method's argument type
//!   through a field table and a hook table of conversions
//! - **Notifications**: Requests without an `id` get no body unless the
//!   request itself was malformed
//! - **Codecs**: Content-type negotiation over a registry of codecs
//! - **Observability**: `tracing` spans per request and OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mailrpc_core::{Field, FieldKind, Result, RpcParams};
//! use mailrpc_server::{RequestContext, RpcServer, RpcService, ServiceMethod};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct AddParams {
//!     a: i64,
//!     b: i64,
//! }
//!
//! impl RpcParams for AddParams {
//!     const FIELDS: &'static [Field] = &[
//!         Field::new("a", FieldKind::Integer),
//!         Field::new("b", FieldKind::Integer),
//!     ];
//! }
//!
//! struct Arith;
//!
//! impl RpcService for Arith {
//!     fn methods(self: Arc<Self>) -> Vec<ServiceMethod> {
//!         vec![ServiceMethod::from_fn("Add", |_ctx: RequestContext, p: AddParams| async move {
//!             Ok(p.a + p.b)
//!         })]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = RpcServer::builder()
//!         .bind_str("127.0.0.1:9000")?
//!         .service(Arc::new(Arith), "")
//!         .build()?;
//!
//!     server.run().await
//! }
//! ```
//!
//! # Architecture
//!
//! warp runs each connection on its own task. Per request the flow is:
//!
//! transport → codec (decode) → registry (resolve) → binder → handler →
//! response writer → transport
//!
//! The registry's table is the only state shared between requests.

mod builder;
mod codec;
mod context;
mod dispatcher;
mod handler;
mod metrics;
mod registry;
mod response;
mod service;
mod transport;

pub use builder::{ServerBuilder, DEFAULT_MAX_BODY_BYTES};
pub use codec::{Codec, CodecRegistry, JsonCodec, UnsupportedMediaType, JSON_CONTENT_TYPE};
pub use context::RequestContext;
pub use dispatcher::Dispatcher;
pub use handler::{from_typed_fn, Handler, HandlerResult, TypedHandler};
pub use metrics::{ServerMetrics, UNRESOLVED_METHOD};
pub use registry::{LookupError, RegistryError, ServiceRegistry};
pub use response::{CallKind, Disposition, Reply, ResponseWriter};
pub use service::{is_exported, RpcService, Service, ServiceMethod};
pub use transport::{rpc_routes, HttpResponse, NOTIFY_HEADER, NOTIFY_VALUE};

use mailrpc_core::{Error, ObservabilityGuard, Result};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

/// JSON-RPC server bound to an address
///
/// Create one with [`RpcServer::builder`].
pub struct RpcServer {
    addr: SocketAddr,
    registry: Arc<ServiceRegistry>,
    dispatcher: Arc<Dispatcher>,
    codecs: Arc<CodecRegistry>,
    max_body_bytes: u64,
    observability: Option<ObservabilityGuard>,
}

impl RpcServer {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Address the server will listen on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The service table; services can still be added after build
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Register another service on the running table
    ///
    /// # Errors
    ///
    /// See [`ServiceRegistry::register`].
    pub fn register<S: RpcService>(
        &self,
        receiver: Arc<S>,
        name: &str,
    ) -> std::result::Result<String, RegistryError> {
        self.registry.register(receiver, name)
    }

    /// The HTTP filter serving this server's endpoint
    ///
    /// Useful for mounting under another warp filter or for in-process tests
    /// with `warp::test`.
    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (HttpResponse,), Error = Infallible> + Clone + Send + Sync + 'static
    {
        rpc_routes(
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.codecs),
            self.max_body_bytes,
        )
    }

    /// Serve until the process exits
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the address cannot be bound.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then drain and flush telemetry
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the address cannot be bound.
    #[tracing::instrument(skip_all, name = "server.run", fields(addr = %self.addr))]
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (bound, serving) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(self.addr, shutdown)
            .map_err(|e| Error::Io(format!("failed to bind {}: {}", self.addr, e)))?;

        tracing::info!(
            addr = %bound,
            services = ?self.registry.service_names(),
            "server listening"
        );
        serving.await;
        tracing::info!("server stopped");

        if let Some(guard) = &self.observability {
            guard.shutdown();
        }
        Ok(())
    }
}

//! Server builder for constructing JSON-RPC servers
//!
//! The builder provides a fluent API for configuring and creating an
//! [`RpcServer`]. It allows you to:
//! - Set the bind address
//! - Register services
//! - Register codecs by content type
//! - Add param conversion hooks, or enable positional params
//! - Limit request body size
//! - Enable observability
//!
//! # Examples
//!
//! ```rust,no_run
//! use mailrpc_core::{Field, FieldKind, RpcParams};
//! use mailrpc_server::{JsonCodec, RequestContext, RpcServer, RpcService, ServiceMethod};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Ping {}
//!
//! impl RpcParams for Ping {
//!     const FIELDS: &'static [Field] = &[];
//! }
//!
//! struct Health;
//!
//! impl RpcService for Health {
//!     fn methods(self: Arc<Self>) -> Vec<ServiceMethod> {
//!         vec![ServiceMethod::from_fn("Ping", |_ctx: RequestContext, _: Ping| async {
//!             Ok("pong")
//!         })]
//!     }
//! }
//!
//! # async fn example() -> mailrpc_core::Result<()> {
//! let server = RpcServer::builder()
//!     .bind_str("127.0.0.1:9000")?
//!     .codec("application/json", Arc::new(JsonCodec))
//!     .service(Arc::new(Health), "")
//!     .max_body_bytes(64 * 1024)
//!     .build()?;
//!
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

use crate::codec::{Codec, CodecRegistry, JsonCodec};
use crate::dispatcher::Dispatcher;
use crate::registry::{RegistryError, ServiceRegistry};
use crate::service::RpcService;
use crate::{RpcServer, ServerMetrics};
use mailrpc_core::{Error, FieldKind, HookTable, JsonKind, ObservabilityConfig, ParamBinder, Result};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

/// Default request body limit (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

type Registration = Box<dyn FnOnce(&ServiceRegistry) -> std::result::Result<String, RegistryError>>;

/// Builder for configuring and creating an [`RpcServer`]
pub struct ServerBuilder {
    addr: Option<SocketAddr>,
    registrations: Vec<Registration>,
    codecs: CodecRegistry,
    hooks: HookTable,
    positional_params: bool,
    max_body_bytes: u64,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            addr: None,
            registrations: Vec::new(),
            codecs: CodecRegistry::new(),
            hooks: HookTable::default(),
            positional_params: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            observability_config: None,
            service_name: None,
        }
    }

    pub fn bind(mut self, addr: impl Into<SocketAddr>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    /// Set the bind address from a string like `"0.0.0.0:9000"`
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the address does not parse.
    pub fn bind_str(mut self, addr: &str) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::Io(format!("invalid address {:?}: {}", addr, e)))?;
        self.addr = Some(addr);
        Ok(self)
    }

    /// Register a service; an empty `name` uses the receiver's type name
    ///
    /// Registration happens in [`build`](Self::build), in the order services
    /// were added.
    pub fn service<S: RpcService>(mut self, receiver: Arc<S>, name: impl Into<String>) -> Self {
        let name = name.into();
        self.registrations
            .push(Box::new(move |registry| registry.register(receiver, &name)));
        self
    }

    /// Register a codec for a content type
    ///
    /// Without any codec the server speaks JSON under `application/json`.
    pub fn codec(mut self, content_type: &str, codec: Arc<dyn Codec>) -> Self {
        self.codecs.register(content_type, codec);
        self
    }

    /// Add or replace a param conversion hook
    pub fn hook<F>(mut self, from: JsonKind, to: FieldKind, hook: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.hooks.register(from, to, hook);
        self
    }

    /// Replace the whole hook table
    pub fn hooks(mut self, hooks: HookTable) -> Self {
        self.hooks = hooks;
        self
    }

    /// Accept array params, bound onto argument fields in declaration order
    pub fn positional_params(mut self, enabled: bool) -> Self {
        self.positional_params = enabled;
        self
    }

    pub fn max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Service name reported to telemetry backends
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Register everything and assemble the server
    ///
    /// # Errors
    ///
    /// Fails if no bind address was set, a service fails to register, or
    /// observability cannot be initialized.
    pub fn build(self) -> Result<RpcServer> {
        let addr = self
            .addr
            .ok_or_else(|| Error::Io("no bind address specified".to_string()))?;

        let (observability, metrics) = match self.observability_config {
            Some(mut config) => {
                if let Some(name) = self.service_name {
                    config.service_name = name;
                }
                let guard = mailrpc_core::init_observability(config.clone()).map_err(|e| {
                    Error::Internal(format!("failed to initialize observability: {}", e))
                })?;
                (
                    Some(guard),
                    Some(Arc::new(ServerMetrics::new(config.service_name))),
                )
            }
            None => (None, None),
        };

        let registry = Arc::new(ServiceRegistry::new());
        for register in self.registrations {
            register(&registry).map_err(|e| Error::Internal(e.to_string()))?;
        }

        let mut codecs = self.codecs;
        if codecs.is_empty() {
            codecs.register("application/json", Arc::new(JsonCodec));
        }

        let binder = ParamBinder::new(self.hooks).positional(self.positional_params);
        let mut dispatcher = Dispatcher::new(Arc::clone(&registry), binder);
        if let Some(metrics) = metrics {
            dispatcher = dispatcher.with_metrics(metrics);
        }

        Ok(RpcServer {
            addr,
            registry,
            dispatcher: Arc::new(dispatcher),
            codecs: Arc::new(codecs),
            max_body_bytes: self.max_body_bytes,
            observability,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

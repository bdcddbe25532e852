//! mailrpc - JSON-RPC 2.0 over HTTP
//!
//! Convenience crate re-exporting the mailrpc sub-crates.
//!
//! - **mailrpc-core**: Wire types, request codec, error model, param binding,
//!   observability
//! - **mailrpc-server**: Service registry, dispatcher and warp transport
//! - **mailrpc-macros**: `#[derive(RpcParams)]`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mailrpc::server::{RequestContext, RpcService, ServiceMethod};
//! use mailrpc::{RpcParams, RpcServer};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Default, Serialize, Deserialize, RpcParams)]
//! struct Greet {
//!     name: String,
//! }
//!
//! struct Greeter;
//!
//! impl RpcService for Greeter {
//!     fn methods(self: Arc<Self>) -> Vec<ServiceMethod> {
//!         vec![ServiceMethod::from_fn("Hello", |_ctx: RequestContext, p: Greet| async move {
//!             Ok(format!("hello {}", p.name))
//!         })]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> mailrpc::core::Result<()> {
//!     RpcServer::builder()
//!         .bind_str("127.0.0.1:9000")?
//!         .service(Arc::new(Greeter), "Greeter")
//!         .build()?
//!         .run()
//!         .await
//! }
//! ```
//!
//! The derive expands to paths under `::mailrpc_core`, so crates using it
//! depend on `mailrpc-core` directly.
//!
//! # Serving in-process
//!
//! [`RpcServer::routes`] is a plain warp filter, which makes it easy to
//! exercise a service without binding a socket. Serde renames and skips are
//! followed when binding params:
//!
//! ```rust
//! use chrono::{DateTime, Utc};
//! use mailrpc::server::{RequestContext, RpcService, ServiceMethod};
//! use mailrpc::{RpcParams, RpcServer};
//! use serde::{Deserialize, Serialize};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! #[derive(Default, Serialize, Deserialize, RpcParams)]
//! struct Greet {
//!     name: String,
//!     #[serde(rename = "at")]
//!     when: Option<DateTime<Utc>>,
//!     #[serde(skip)]
//!     internal: u32,
//! }
//!
//! struct Greeter;
//!
//! impl RpcService for Greeter {
//!     fn methods(self: Arc<Self>) -> Vec<ServiceMethod> {
//!         vec![ServiceMethod::from_fn("Hello", |_ctx: RequestContext, p: Greet| async move {
//!             Ok(json!({
//!                 "greeting": format!("hello {}", p.name),
//!                 "year": p.when.map(|t| t.format("%Y").to_string()),
//!                 "internal": p.internal,
//!             }))
//!         })]
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let server = RpcServer::builder()
//!     .bind(([127, 0, 0, 1], 0))
//!     .service(Arc::new(Greeter), "")
//!     .build()
//!     .unwrap();
//! assert_eq!(server.registry().service_names(), vec!["Greeter".to_string()]);
//!
//! let res = warp::test::request()
//!     .method("POST")
//!     .header("content-type", "application/json")
//!     .body(r#"{"jsonrpc":"2.0","method":"Greeter.Hello","params":{"name":"ada","at":"1843-07-10T00:00:00Z","internal":7},"id":1}"#)
//!     .reply(&server.routes())
//!     .await;
//!
//! let body: Value = serde_json::from_slice(res.body()).unwrap();
//! assert_eq!(body["result"], json!({"greeting": "hello ada", "year": "1843", "internal": 0}));
//! # }
//! ```

pub use mailrpc_core as core;
pub use mailrpc_server as server;

pub use mailrpc_core::{Error, Result, RpcError};
pub use mailrpc_macros::RpcParams;
pub use mailrpc_server::RpcServer;

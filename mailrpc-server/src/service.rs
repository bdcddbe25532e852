//! Service and method descriptors
//!
//! A receiver describes its callable methods explicitly through
//! [`RpcService::methods`]. Each [`ServiceMethod`] pairs a public name with a
//! typed handler, so the argument shape is fixed at compile time: one
//! [`RequestContext`], one structured argument, and a result or error.
//!
//! # Examples
//!
//! ```rust
//! use mailrpc_core::{Field, FieldKind, Result, RpcParams};
//! use mailrpc_server::{RequestContext, RpcService, ServiceMethod};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Ping {
//!     payload: String,
//! }
//!
//! impl RpcParams for Ping {
//!     const FIELDS: &'static [Field] = &[Field::new("payload", FieldKind::String)];
//! }
//!
//! struct Health;
//!
//! impl Health {
//!     async fn ping(&self, _ctx: RequestContext, req: Ping) -> Result<String> {
//!         Ok(req.payload)
//!     }
//! }
//!
//! impl RpcService for Health {
//!     fn methods(self: Arc<Self>) -> Vec<ServiceMethod> {
//!         vec![ServiceMethod::bound(&self, "Ping", |svc, ctx, req| async move {
//!             svc.ping(ctx, req).await
//!         })]
//!     }
//! }
//!
//! let methods = Arc::new(Health).methods();
//! assert_eq!(methods[0].name(), "Ping");
//! ```

use crate::context::RequestContext;
use crate::handler::{from_typed_fn, Handler, HandlerResult};
use mailrpc_core::{Field, ParamBinder, Result, RpcError, RpcParams};
use serde::Serialize;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A receiver that exposes remotely callable methods
pub trait RpcService: Send + Sync + 'static {
    /// Describe the methods this receiver exposes
    ///
    /// Descriptors whose names are not exported identifiers are skipped at
    /// registration.
    fn methods(self: Arc<Self>) -> Vec<ServiceMethod>;
}

/// One callable method of a service
pub struct ServiceMethod {
    name: String,
    handler: Box<dyn Handler>,
}

impl ServiceMethod {
    /// Describe a method backed by an arbitrary handler
    pub fn new(name: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }

    /// Describe a method backed by an async fn
    pub fn from_fn<P, R, F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        P: RpcParams,
        R: Serialize + Send + 'static,
        F: Fn(RequestContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Self::new(name, from_typed_fn(func))
    }

    /// Describe a method bound to a shared receiver
    ///
    /// `func` gets its own handle to the receiver on every call, so the
    /// returned future does not borrow from the descriptor.
    pub fn bound<S, P, R, F, Fut>(receiver: &Arc<S>, name: impl Into<String>, func: F) -> Self
    where
        S: Send + Sync + 'static,
        P: RpcParams,
        R: Serialize + Send + 'static,
        F: Fn(Arc<S>, RequestContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let receiver = Arc::clone(receiver);
        Self::from_fn(name, move |ctx, params| func(Arc::clone(&receiver), ctx, params))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field table the params are bound into
    pub fn arg_shape(&self) -> &'static [Field] {
        self.handler.arg_shape()
    }

    /// Bind params and start the invocation
    pub fn bind(
        &self,
        binder: &ParamBinder,
        ctx: RequestContext,
        params: Option<&RawValue>,
    ) -> std::result::Result<HandlerResult, RpcError> {
        self.handler.bind(binder, ctx, params)
    }
}

impl fmt::Debug for ServiceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceMethod")
            .field("name", &self.name)
            .field("arg_shape", &self.arg_shape())
            .finish()
    }
}

/// A named set of eligible methods bound to one receiver
///
/// Built by the registry and never mutated afterwards.
#[derive(Debug)]
pub struct Service {
    name: String,
    type_name: &'static str,
    methods: HashMap<String, Arc<ServiceMethod>>,
}

impl Service {
    pub(crate) fn new(
        name: String,
        type_name: &'static str,
        methods: HashMap<String, Arc<ServiceMethod>>,
    ) -> Self {
        Self {
            name,
            type_name,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the receiver
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn method(&self, name: &str) -> Option<Arc<ServiceMethod>> {
        self.methods.get(name).cloned()
    }

    /// Method names, sorted
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// True if `name` starts with an uppercase letter and is otherwise made of
/// alphanumerics and `_`
pub fn is_exported(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Bare type name of `S`: last path segment, generics stripped
pub(crate) fn short_type_name<S: ?Sized>() -> &'static str {
    let full = std::any::type_name::<S>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailrpc_core::FieldKind;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Default, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl RpcParams for Note {
        const FIELDS: &'static [Field] = &[Field::new("text", FieldKind::String)];
    }

    struct Notebook {
        prefix: String,
    }

    struct Wrapper<T>(T);

    #[test]
    fn test_is_exported() {
        assert!(is_exported("Service"));
        assert!(is_exported("Send_Mail2"));
        assert!(!is_exported("service"));
        assert!(!is_exported("_Service"));
        assert!(!is_exported("Mail.Service"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Notebook>(), "Notebook");
        assert_eq!(short_type_name::<Wrapper<Notebook>>(), "Wrapper");
        assert_eq!(short_type_name::<u32>(), "u32");
    }

    #[tokio::test]
    async fn test_bound_method_uses_receiver() {
        let notebook = Arc::new(Notebook {
            prefix: "note: ".to_string(),
        });
        let method = ServiceMethod::bound(&notebook, "Write", |nb, _ctx, note: Note| async move {
            Ok(format!("{}{}", nb.prefix, note.text))
        });

        let raw = RawValue::from_string(r#"{"text":"milk"}"#.to_string()).unwrap();
        let call = method
            .bind(&ParamBinder::default(), RequestContext::default(), Some(&raw))
            .unwrap();

        assert_eq!(method.name(), "Write");
        assert_eq!(method.arg_shape().len(), 1);
        assert_eq!(call.await.unwrap(), json!("note: milk"));
    }
}

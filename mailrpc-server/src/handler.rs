//! Handler trait and typed handler construction
//!
//! A handler is the invocable half of a method descriptor. Invocation is split
//! in two so the dispatcher can tell the stages apart:
//!
//! 1. [`Handler::bind`] binds the raw params into the method's argument type.
//!    A failure here is an invalid-params error and nothing is invoked.
//! 2. The returned future runs the method and yields its JSON result.
//!
//! # Examples
//!
//! ```rust
//! use mailrpc_core::{Field, FieldKind, ParamBinder, RpcParams};
//! use mailrpc_server::{from_typed_fn, RequestContext};
//! use serde::{Deserialize, Serialize};
//! use serde_json::value::RawValue;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Echo {
//!     text: String,
//! }
//!
//! impl RpcParams for Echo {
//!     const FIELDS: &'static [Field] = &[Field::new("text", FieldKind::String)];
//! }
//!
//! let handler = from_typed_fn(|_ctx: RequestContext, p: Echo| async move { Ok(p.text) });
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let raw = RawValue::from_string(r#"{"text":"hi"}"#.to_string()).unwrap();
//! let call = handler
//!     .bind(&ParamBinder::default(), RequestContext::default(), Some(&raw))
//!     .unwrap();
//! assert_eq!(call.await.unwrap(), serde_json::json!("hi"));
//! # });
//! ```

use crate::context::RequestContext;
use mailrpc_core::{Error, Field, ParamBinder, Result, RpcError, RpcParams};
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// Pending method invocation
///
/// Boxed because every method has its own concrete future type and they all
/// live in one table.
pub type HandlerResult = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Invocable method behind a descriptor
pub trait Handler: Send + Sync {
    /// Bind `params` and start the invocation
    ///
    /// # Errors
    ///
    /// Returns an invalid-params error if the params do not fit the argument
    /// shape. The method is not invoked in that case.
    fn bind(
        &self,
        binder: &ParamBinder,
        ctx: RequestContext,
        params: Option<&RawValue>,
    ) -> std::result::Result<HandlerResult, RpcError>;

    /// Field table of the argument shape
    fn arg_shape(&self) -> &'static [Field];
}

/// Adapts an async fn of `(RequestContext, P) -> Result<R>` into a [`Handler`]
pub struct TypedHandler<P, R, F, Fut> {
    func: F,
    _marker: PhantomData<fn(P) -> (R, Fut)>,
}

impl<P, R, F, Fut> TypedHandler<P, R, F, Fut>
where
    P: RpcParams,
    R: Serialize + Send + 'static,
    F: Fn(RequestContext, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _marker: PhantomData,
        }
    }
}

impl<P, R, F, Fut> Handler for TypedHandler<P, R, F, Fut>
where
    P: RpcParams,
    R: Serialize + Send + 'static,
    F: Fn(RequestContext, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    fn bind(
        &self,
        binder: &ParamBinder,
        ctx: RequestContext,
        params: Option<&RawValue>,
    ) -> std::result::Result<HandlerResult, RpcError> {
        let args: P = binder.bind(params)?;
        let call = (self.func)(ctx, args);

        Ok(Box::pin(async move {
            let result = call.await?;
            serde_json::to_value(result).map_err(|e| Error::Serialization(e.to_string()))
        }))
    }

    fn arg_shape(&self) -> &'static [Field] {
        P::FIELDS
    }
}

/// Create a handler from an async fn taking the context and a typed argument
///
/// The argument type decides how params are bound (see
/// [`RpcParams`](mailrpc_core::RpcParams)); the result is serialized with
/// serde.
pub fn from_typed_fn<P, R, F, Fut>(func: F) -> Box<dyn Handler>
where
    P: RpcParams,
    R: Serialize + Send + 'static,
    F: Fn(RequestContext, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    Box::new(TypedHandler::new(func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailrpc_core::{ErrorCode, FieldKind};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct AddParams {
        a: i64,
        b: i64,
    }

    impl RpcParams for AddParams {
        const FIELDS: &'static [Field] = &[
            Field::new("a", FieldKind::Integer),
            Field::new("b", FieldKind::Integer),
        ];
    }

    #[derive(Serialize)]
    struct AddResult {
        sum: i64,
    }

    fn raw(text: &str) -> Box<RawValue> {
        RawValue::from_string(text.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_typed_handler() {
        let handler = from_typed_fn(|_ctx: RequestContext, p: AddParams| async move {
            Ok(AddResult { sum: p.a + p.b })
        });

        let params = raw(r#"{"a": 5, "b": 3}"#);
        let call = handler
            .bind(&ParamBinder::default(), RequestContext::default(), Some(&params))
            .unwrap();

        assert_eq!(call.await.unwrap(), json!({"sum": 8}));
    }

    #[tokio::test]
    async fn test_bind_failure_skips_invocation() {
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&invoked);
        let handler = from_typed_fn(move |_ctx: RequestContext, p: AddParams| {
            flag.store(true, Ordering::SeqCst);
            async move { Ok(p.a) }
        });

        let params = raw(r#"{"a": "five"}"#);
        let err = handler
            .bind(&ParamBinder::default(), RequestContext::default(), Some(&params))
            .err()
            .unwrap();

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let handler = from_typed_fn(|_ctx: RequestContext, _p: AddParams| async move {
            Err::<i64, _>(Error::Internal("overflow".into()))
        });

        let call = handler
            .bind(&ParamBinder::default(), RequestContext::default(), None)
            .unwrap();

        assert!(matches!(call.await, Err(Error::Internal(_))));
    }

    #[test]
    fn test_arg_shape_comes_from_params_type() {
        let handler = from_typed_fn(|_ctx: RequestContext, p: AddParams| async move { Ok(p.a) });
        let names: Vec<_> = handler.arg_shape().iter().map(|f| f.name).collect();

        assert_eq!(names, vec!["a", "b"]);
    }
}

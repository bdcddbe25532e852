//! Request dispatch
//!
//! The dispatcher drives one request from raw body to [`Reply`]:
//!
//! 1. **Decode** the body through the selected codec
//! 2. **Resolve** the dotted method name through the registry
//! 3. **Bind** params into the method's argument type
//! 4. **Invoke** the method and await its result
//! 5. **Write** the outcome, or suppress it for a notification
//!
//! Every failure is terminal for the request and becomes exactly one error
//! outcome. Decode failures and ill-formed method names escalate the
//! [`Disposition`] so that even a notification is answered.

use crate::codec::Codec;
use crate::context::RequestContext;
use crate::metrics::{ServerMetrics, UNRESOLVED_METHOD};
use crate::registry::{LookupError, ServiceRegistry};
use crate::response::{Disposition, Reply, ResponseWriter};
use mailrpc_core::{Id, ParamBinder, Request, RpcError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Drives requests through decode, resolve, bind, invoke and write
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    binder: ParamBinder,
    metrics: Option<Arc<ServerMetrics>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ServiceRegistry>, binder: ParamBinder) -> Self {
        Self {
            registry,
            binder,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Handle one request body and produce the reply to send
    pub async fn dispatch(&self, codec: &dyn Codec, ctx: RequestContext, body: &[u8]) -> Reply {
        let started = Instant::now();

        let request = match codec.decode(body) {
            Ok(request) => request,
            Err(rejected) => {
                tracing::debug!(error = %rejected.error, id = %rejected.id, "request rejected");
                let mut disposition = Disposition::for_id(&rejected.id);
                disposition.escalate();
                return self.finish(
                    codec,
                    UNRESOLVED_METHOD,
                    disposition,
                    rejected.id,
                    Err(rejected.error),
                    started,
                );
            }
        };

        let span = tracing::info_span!(
            "rpc.dispatch",
            method = %request.method,
            id = %request.id,
        );

        async move {
            let method_name = request.method.clone();
            let mut disposition = Disposition::for_id(&request.id);
            let (id, resolved, outcome) = self.invoke(request, ctx, &mut disposition).await;
            let label = method_label(&method_name, resolved);
            self.finish(codec, label, disposition, id, outcome, started)
        }
        .instrument(span)
        .await
    }

    async fn invoke(
        &self,
        request: Request,
        ctx: RequestContext,
        disposition: &mut Disposition,
    ) -> (Id, bool, Result<Value, RpcError>) {
        let Request {
            method, params, id, ..
        } = request;

        let (_, method) = match self.registry.get(&method) {
            Ok(resolved) => resolved,
            Err(e) => {
                if e == LookupError::IllFormed {
                    disposition.escalate();
                }
                tracing::debug!(error = %e, "method not resolved");
                return (id, false, Err(e.to_rpc_error()));
            }
        };

        let call = match method.bind(&self.binder, ctx, params.as_deref()) {
            Ok(call) => call,
            Err(e) => {
                tracing::debug!(error = %e, "params rejected");
                return (id, true, Err(e));
            }
        };

        let outcome = call.await.map_err(|e| {
            tracing::warn!(error = %e, "method failed");
            e.into_rpc_error()
        });

        (id, true, outcome)
    }

    fn finish(
        &self,
        codec: &dyn Codec,
        method: &str,
        disposition: Disposition,
        id: Id,
        outcome: Result<Value, RpcError>,
        started: Instant,
    ) -> Reply {
        if let Some(metrics) = &self.metrics {
            let status = match &outcome {
                Ok(_) => "success",
                Err(e) => {
                    metrics.record_error(e.code.code());
                    "error"
                }
            };
            metrics.record_request(method, status, started.elapsed().as_secs_f64());
            if !disposition.emits_body() {
                metrics.record_suppressed(method);
            }
        }

        ResponseWriter::new(codec).write(disposition, id, outcome)
    }
}

/// Metric label for a request: registered names only
fn method_label(method: &str, resolved: bool) -> &str {
    if resolved {
        method
    } else {
        UNRESOLVED_METHOD
    }
}

//! Server metrics definitions
//!
//! OpenTelemetry instruments recorded by the dispatcher when observability is
//! enabled through `ServerBuilder::with_observability()`.
//!
//! # Metrics Collected
//!
//! - **requests_total**: JSON-RPC requests dispatched, by method and status (counter).
//!   Only registered `Service.Method` names are used as the method; anything
//!   that failed to decode or resolve is counted under [`UNRESOLVED_METHOD`].
//! - **request_duration**: Dispatch latency in seconds (histogram)
//! - **errors_total**: Error responses, by error code (counter)
//! - **notifications_suppressed**: Notifications answered without a body (counter)
//!
//! # Examples
//!
//! ```rust
//! use mailrpc_server::ServerMetrics;
//!
//! let metrics = ServerMetrics::new("mailapi");
//! metrics.record_request("Service.SendMail", "success", 0.025);
//! metrics.record_error(-32601);
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// `method` attribute for requests that never resolved to a registered method
pub const UNRESOLVED_METHOD: &str = "unresolved";

/// Server metrics for monitoring
///
/// All metrics are prefixed with `mailrpc.server.*`.
pub struct ServerMetrics {
    pub requests_total: Counter<u64>,
    /// Seconds from body received to reply built
    pub request_duration: Histogram<f64>,
    pub errors_total: Counter<u64>,
    pub notifications_suppressed: Counter<u64>,
}

impl ServerMetrics {
    pub fn new(service_name: impl Into<String>) -> Self {
        let meter = global::meter_with_scope(
            opentelemetry::InstrumentationScope::builder(service_name.into()).build(),
        );
        Self::new_with_meter(&meter)
    }

    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("mailrpc.server.requests.total")
                .with_description("Total number of JSON-RPC requests dispatched")
                .build(),
            request_duration: meter
                .f64_histogram("mailrpc.server.request.duration")
                .with_description("Request dispatch duration in seconds")
                .with_unit("s")
                .build(),
            errors_total: meter
                .u64_counter("mailrpc.server.errors.total")
                .with_description("Total number of error outcomes")
                .build(),
            notifications_suppressed: meter
                .u64_counter("mailrpc.server.notifications.suppressed")
                .with_description("Notifications answered without a body")
                .build(),
        }
    }

    /// Record one dispatched request
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record an error outcome by its JSON-RPC code
    pub fn record_error(&self, code: i32) {
        self.errors_total
            .add(1, &[KeyValue::new("code", i64::from(code))]);
    }

    pub fn record_suppressed(&self, method: &str) {
        self.notifications_suppressed
            .add(1, &[KeyValue::new("method", method.to_string())]);
    }
}

//! Logging, tracing and metrics setup
//!
//! Every binary calls [`init_observability`] once at startup. It always
//! installs a JSON log formatter filtered by `RUST_LOG` (falling back to the
//! configured level). When an OTLP collector is configured it also exports
//! spans and metrics over gRPC.
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint. Export is enabled by
//!   default only when this is set.
//! - `RUST_LOG`: Log level filter (e.g., "info", "mailrpc_server=debug")
//!
//! # Examples
//!
//! ```rust,no_run
//! use mailrpc_core::ObservabilityConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let guard = mailrpc_core::init_observability(
//!         ObservabilityConfig::new("mailapi").with_log_level("debug"),
//!     )
//!     .expect("observability");
//!
//!     tracing::info!("started");
//!
//!     guard.shutdown();
//! }
//! ```

use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
const METRICS_EXPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Boxed error returned by telemetry setup
pub type ObservabilityError = Box<dyn std::error::Error + Send + Sync>;

/// Observability configuration
///
/// # Defaults
///
/// - Service name: "mailrpc"
/// - Service version: the crate version
/// - OTLP endpoint: `$OTEL_EXPORTER_OTLP_ENDPOINT` or "http://localhost:4317"
/// - Traces and metrics: enabled only if `$OTEL_EXPORTER_OTLP_ENDPOINT` is set
/// - Log level: `$RUST_LOG` or "info"
///
/// # Examples
///
/// ```rust
/// use mailrpc_core::ObservabilityConfig;
///
/// let config = ObservabilityConfig::new("mailapi")
///     .with_endpoint("http://collector:4317")
///     .with_traces(true)
///     .with_metrics(false);
/// assert_eq!(config.otlp_endpoint, "http://collector:4317");
/// ```
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Identifies this process in telemetry backends
    pub service_name: String,
    pub service_version: String,
    /// gRPC endpoint of the OTLP collector
    pub otlp_endpoint: String,
    /// Export spans to the collector
    pub enable_traces: bool,
    /// Export metrics to the collector
    pub enable_metrics: bool,
    /// Filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let endpoint = std::env::var(OTLP_ENDPOINT_ENV).ok();
        let export = endpoint.is_some();

        Self {
            service_name: "mailrpc".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: endpoint.unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string()),
            enable_traces: export,
            enable_metrics: export,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl ObservabilityConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    pub fn with_traces(mut self, enable: bool) -> Self {
        self.enable_traces = enable;
        self
    }

    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    fn resource(&self) -> Resource {
        Resource::builder_empty()
            .with_attributes(vec![
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                    self.service_name.clone(),
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                    self.service_version.clone(),
                ),
            ])
            .build()
    }
}

/// Keeps the telemetry providers alive; flush them with [`shutdown`](Self::shutdown)
#[derive(Debug, Default)]
#[must_use = "dropping the guard without shutdown may lose buffered telemetry"]
pub struct ObservabilityGuard {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl ObservabilityGuard {
    /// Whether spans are being exported
    pub fn exports_traces(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Whether metrics are being exported
    pub fn exports_metrics(&self) -> bool {
        self.meter_provider.is_some()
    }

    /// Flush and stop the exporters
    pub fn shutdown(&self) {
        if let Some(provider) = &self.tracer_provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "tracer provider shutdown failed");
            }
        }
        if let Some(provider) = &self.meter_provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "meter provider shutdown failed");
            }
        }
    }
}

/// Install the global subscriber and, if enabled, the OTLP exporters
///
/// Only the first call in a process installs a subscriber; later calls keep
/// the existing one and still succeed.
///
/// # Errors
///
/// Fails if an exporter cannot be built or the log filter is malformed.
pub fn init_observability(
    config: ObservabilityConfig,
) -> Result<ObservabilityGuard, ObservabilityError> {
    let mut guard = ObservabilityGuard::default();

    let tracer = if config.enable_traces {
        let provider = init_tracer_provider(&config)?;
        use opentelemetry::trace::TracerProvider as _;
        let tracer = provider.tracer(config.service_name.clone());
        global::set_tracer_provider(provider.clone());
        guard.tracer_provider = Some(provider);
        Some(tracer)
    } else {
        None
    };

    if config.enable_metrics {
        let provider = init_meter_provider(&config)?;
        global::set_meter_provider(provider.clone());
        guard.meter_provider = Some(provider);
    }

    init_tracing_subscriber(&config, tracer)?;

    tracing::info!(
        service_name = %config.service_name,
        otlp_endpoint = %config.otlp_endpoint,
        traces = config.enable_traces,
        metrics = config.enable_metrics,
        "observability initialized"
    );

    Ok(guard)
}

fn init_tracer_provider(
    config: &ObservabilityConfig,
) -> Result<SdkTracerProvider, ObservabilityError> {
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(config.resource())
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .build())
}

fn init_meter_provider(config: &ObservabilityConfig) -> Result<SdkMeterProvider, ObservabilityError> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
        .with_interval(METRICS_EXPORT_INTERVAL)
        .build();

    Ok(SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(config.resource())
        .build())
}

fn init_tracing_subscriber(
    config: &ObservabilityConfig,
    tracer: Option<opentelemetry_sdk::trace::Tracer>,
) -> Result<(), ObservabilityError> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .json();

    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let installed = tracing_subscriber::registry()
        .with(otel_layer)
        .with(env_filter)
        .with(fmt_layer)
        .try_init();

    if installed.is_err() {
        tracing::debug!("global subscriber already installed, keeping it");
    }

    Ok(())
}

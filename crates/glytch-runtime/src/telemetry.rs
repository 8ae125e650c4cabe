//! Tracing bootstrap for the companion app.
//!
//! [`init_tracing`] installs the global `tracing` subscriber once at startup:
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `GLYTCH_LOG_FORMAT=json` | Newline-delimited JSON instead of compact text. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | Also export spans over OTLP/HTTP to this collector. |
//!
//! ```rust,no_run
//! let _guard = glytch_runtime::telemetry::init_tracing("glytch");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Output flavour of the console log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Resolved logging options.
#[derive(Debug, Clone)]
pub struct TelemetryOptions {
    pub service_name: String,
    pub filter: String,
    pub format: LogFormat,
    pub otlp_endpoint: Option<String>,
}

impl TelemetryOptions {
    /// Read options from the process environment.
    pub fn from_env(service_name: &str) -> Self {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Build options from an arbitrary variable lookup.
    pub fn from_lookup(service_name: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let format = match lookup("GLYTCH_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };
        Self {
            service_name: service_name.to_string(),
            filter: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            format,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|e| !e.is_empty()),
        }
    }
}

/// Install the global subscriber from environment options.
///
/// Hold the returned guard for the life of the process; dropping it flushes
/// and shuts down the span exporter.
pub fn init_tracing(service_name: &str) -> TelemetryGuard {
    init_with(TelemetryOptions::from_env(service_name))
}

pub fn init_with(options: TelemetryOptions) -> TelemetryGuard {
    let filter = EnvFilter::try_new(&options.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let provider = options
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| build_provider(&options.service_name, endpoint));

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match options.format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_target(true).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer().compact().with_target(true).boxed(),
    };
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("glytch")));

    let installed = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .with(filter)
        .try_init();
    if let Err(e) = installed {
        eprintln!("[glytch] tracing subscriber already installed: {e}");
    }

    TelemetryGuard(provider)
}

/// Shuts the span exporter down on drop.
pub struct TelemetryGuard(Option<SdkTracerProvider>);

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[glytch] span exporter shutdown error: {e}");
        }
    }
}

fn build_provider(service_name: &str, endpoint: &str) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[glytch] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Simple exporter: no Tokio runtime exists yet when tracing is set up.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}

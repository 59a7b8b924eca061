//! Tracing initialization.
//!
//! Always installs a fmt layer filtered by `RUST_LOG` (falling back to the
//! configured level). When an OTLP endpoint is configured, spans are also
//! exported over gRPC.

use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Timeout for OTLP exports - prevents blocking on unavailable endpoints
const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

fn tracer_provider(otlp_endpoint: &str) -> Result<SdkTracerProvider> {
    let resource = Resource::builder_empty()
        .with_service_name("camgate")
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let endpoint = if otlp_endpoint.contains("://") {
        otlp_endpoint.to_string()
    } else {
        format!("http://{}", otlp_endpoint)
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to create OTLP span exporter")?;

    let processor = opentelemetry_sdk::trace::BatchSpanProcessor::builder(exporter).build();

    Ok(SdkTracerProvider::builder()
        .with_span_processor(processor)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build())
}

/// Install the global subscriber. An empty `otlp_endpoint` disables export.
pub fn init(otlp_endpoint: &str, log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let telemetry_layer = if otlp_endpoint.trim().is_empty() {
        None
    } else {
        let provider = tracer_provider(otlp_endpoint.trim())?;
        let tracer = provider.tracer("camgate");
        global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    };
    let exporting = telemetry_layer.is_some();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if exporting {
        tracing::info!(endpoint = otlp_endpoint, "exporting traces over OTLP");
    }
    Ok(())
}

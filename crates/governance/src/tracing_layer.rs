//! Distributed tracing configuration.

use concierge_core::config::LoggingConfig;
use concierge_core::{Error, Result};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: plain or JSON lines, plus OTLP export
/// when `OTEL_EXPORTER_OTLP_ENDPOINT` is set. `RUST_LOG` wins over the
/// configured filter.
pub fn configure_tracing(config: &LoggingConfig) -> Result<()> {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| config.filter.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&directives)
        .map_err(|e| Error::Configuration(format!("Invalid log filter {:?}: {}", directives, e)))?;
    let json = config.json;

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer));

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        tracing::info!(endpoint = %endpoint, "Initializing OpenTelemetry tracing");

        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint),
            )
            .with_trace_config(
                sdktrace::config().with_resource(Resource::new(vec![KeyValue::new(
                    "service.name",
                    "concierge",
                )])),
            )
            .install_batch(runtime::Tokio)
            .map_err(|e| Error::Configuration(format!("Failed to install OTLP pipeline: {}", e)))?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        registry
            .with(otel_layer)
            .try_init()
            .map_err(|e| Error::Configuration(e.to_string()))?;
    } else {
        registry
            .try_init()
            .map_err(|e| Error::Configuration(e.to_string()))?;
    }

    Ok(())
}

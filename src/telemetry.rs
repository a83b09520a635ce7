//! Telemetry and structured logging for the render pipeline.

use crate::job::RenderResult;
use opentelemetry::trace::{Span, Tracer};
use opentelemetry::{global, KeyValue};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Duration above which a completed job is flagged as slow.
const SLOW_JOB_THRESHOLD_MS: i64 = 5000;

/// Initializes the tracing subscriber with env-filter support.
///
/// Call once at process startup. Controlled by `RUST_LOG` (default: info).
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Records a span for a completed or failed render job.
///
/// Emits structured logs and an OpenTelemetry span covering:
/// - Job duration (ms) and output size
/// - Success/failure status and error messages
/// - Chart and warning counts
pub fn record_job_telemetry(result: &RenderResult) {
    let tracer = global::tracer("report-renderer");
    let mut span = tracer.start("render_job");

    span.set_attribute(KeyValue::new("job_id", result.job_id.clone()));
    span.set_attribute(KeyValue::new("format", result.format.to_string()));
    span.set_attribute(KeyValue::new("success", result.success));
    span.set_attribute(KeyValue::new("duration_ms", result.duration_ms));
    span.set_attribute(KeyValue::new("size_bytes", result.size_bytes as i64));
    span.set_attribute(KeyValue::new(
        "chart_count",
        result.metadata.chart_count as i64,
    ));
    span.set_attribute(KeyValue::new(
        "warning_count",
        result.metadata.warnings.len() as i64,
    ));

    if result.success && result.duration_ms > SLOW_JOB_THRESHOLD_MS {
        warn!(
            job_id = %result.job_id,
            duration_ms = result.duration_ms,
            "render exceeded performance threshold ({SLOW_JOB_THRESHOLD_MS}ms)"
        );
    }

    if !result.success {
        let errors = result.metadata.errors.join("; ");
        span.set_attribute(KeyValue::new("errors", errors.clone()));
        warn!(
            job_id = %result.job_id,
            format = %result.format,
            errors = %errors,
            "render job failed"
        );
    }

    span.end();
}

/// Records the number of free worker slots at admission time.
pub fn record_queue_depth(available_slots: usize) {
    let tracer = global::tracer("report-renderer");
    let mut span = tracer.start("queue_admission");
    span.set_attribute(KeyValue::new("available_slots", available_slots as i64));
    span.end();
}

/// Initializes OpenTelemetry with an OTLP exporter.
///
/// Call once at startup, inside a Tokio runtime. Reads configuration from
/// environment variables:
/// - `OTEL_EXPORTER_OTLP_ENDPOINT` - Collector endpoint (default: http://localhost:4317)
/// - `OTEL_SERVICE_NAME` - Service name (default: report-renderer)
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::Config;

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "report-renderer".to_string());

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(&endpoint),
        )
        .with_trace_config(Config::default().with_resource(
            opentelemetry_sdk::Resource::new(vec![
                KeyValue::new("service.name", service_name),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    global::set_tracer_provider(tracer.provider().unwrap());

    info!("telemetry initialized: endpoint={}", endpoint);
    Ok(())
}

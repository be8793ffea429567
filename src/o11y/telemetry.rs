use anyhow::Result;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    self as sdk,
    logs::{SdkLogger, SdkLoggerProvider},
    resource::Resource,
};
use tracing::{Subscriber, info, warn};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::AppConfig;

/// Owns the OTLP providers for the process lifetime and flushes them on drop.
pub struct TelemetryGuard {
    tracer_provider: Option<sdk::trace::SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl TelemetryGuard {
    /// Install the global subscriber: JSON logs on stdout, plus OTLP export
    /// of spans and/or log records when an endpoint is configured.
    pub fn init(config: &AppConfig) -> Result<Self> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let pipelines = build_otel_pipelines(config)?;
        let traces_enabled = pipelines.trace_layer.is_some();
        let logs_enabled = pipelines.log_layer.is_some();

        tracing_subscriber::registry()
            .with(pipelines.trace_layer)
            .with(pipelines.log_layer)
            .with(env_filter)
            .with(json_stdout_layer())
            .try_init()?;

        if traces_enabled || logs_enabled {
            info!(
                traces = traces_enabled,
                logs = logs_enabled,
                "OpenTelemetry export enabled (json stdout retained)"
            );
        }

        Ok(Self {
            tracer_provider: pipelines.tracer_provider,
            logger_provider: pipelines.logger_provider,
        })
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(err) = provider.shutdown() {
                warn!(error = ?err, "failed to shutdown tracer provider cleanly");
            }
        }
        if let Some(provider) = self.logger_provider.take() {
            if let Err(err) = provider.shutdown() {
                warn!(error = ?err, "failed to shutdown logger provider cleanly");
            }
        }
    }
}

fn json_stdout_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .json()
}

#[derive(Default)]
struct OtelPipelines {
    trace_layer: Option<OpenTelemetryLayer<Registry, sdk::trace::Tracer>>,
    tracer_provider: Option<sdk::trace::SdkTracerProvider>,
    log_layer: Option<OpenTelemetryTracingBridge<SdkLoggerProvider, SdkLogger>>,
    logger_provider: Option<SdkLoggerProvider>,
}

fn build_otel_pipelines(config: &AppConfig) -> Result<OtelPipelines> {
    let endpoint = match &config.otel.endpoint {
        Some(endpoint) if !endpoint.trim().is_empty() => endpoint.clone(),
        _ => return Ok(OtelPipelines::default()),
    };

    let resource = Resource::builder()
        .with_service_name(config.otel.service_name.clone())
        .with_attribute(KeyValue::new(
            "deployment.environment.name",
            config.environment.clone(),
        ))
        .build();

    let mut pipelines = OtelPipelines::default();

    if !config.otel.disable_traces {
        let span_exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.clone())
            .build()?;

        let provider = sdk::trace::SdkTracerProvider::builder()
            .with_resource(resource.clone())
            .with_batch_exporter(span_exporter)
            .build();

        let tracer = provider.tracer(config.otel.service_name.clone());
        global::set_tracer_provider(provider.clone());

        pipelines.trace_layer = Some(tracing_opentelemetry::layer().with_tracer(tracer));
        pipelines.tracer_provider = Some(provider);
    }

    if !config.otel.disable_logs {
        let log_exporter = LogExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?;

        let logger_provider = SdkLoggerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(log_exporter)
            .build();

        pipelines.log_layer = Some(OpenTelemetryTracingBridge::new(&logger_provider));
        pipelines.logger_provider = Some(logger_provider);
    }

    Ok(pipelines)
}

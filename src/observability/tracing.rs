//! Distributed tracing support.
//!
//! # Responsibilities
//! - Extract trace context from incoming requests
//! - Propagate trace context to next-hop requests
//! - Create server spans for hop operations
//!
//! # Design Decisions
//! - W3C Trace Context (`traceparent`/`tracestate`) on both sides of a hop
//! - An SDK provider always exists, so spans carry real ids even without an exporter
//! - OTLP export only when enabled; the exporter reads the standard OTEL_* variables

use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{SpanContext, SpanKind, Status, TraceContextExt, Tracer as _, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{BatchConfigBuilder, BatchSpanProcessor, Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use thiserror::Error;

/// Instrumentation scope and service name.
pub const SERVICE_NAME: &str = "hopper";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(String),

    #[error("failed to shut down tracer provider: {0}")]
    Shutdown(String),
}

/// Tracer, provider and propagator for one process.
///
/// Constructed once at startup and handed to the hop handler; tests build
/// their own with [`Telemetry::disabled`].
#[derive(Debug, Clone)]
pub struct Telemetry {
    provider: TracerProvider,
    tracer: Tracer,
    propagator: TraceContextPropagator,
    exporting: bool,
}

impl Telemetry {
    /// Spans are created and propagated but never exported.
    pub fn disabled() -> Self {
        Self::from_provider(TracerProvider::builder().build(), false)
    }

    /// Batch-export spans over OTLP/gRPC. Must be called inside a Tokio runtime.
    pub fn otlp() -> Result<Self, TelemetryError> {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build()
            .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

        let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_scheduled_delay(Duration::from_secs(1))
                    .build(),
            )
            .build();

        let provider = TracerProvider::builder()
            .with_span_processor(processor)
            .with_resource(Resource::new(vec![
                KeyValue::new("service.name", SERVICE_NAME),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]))
            .build();

        Ok(Self::from_provider(provider, true))
    }

    /// `otlp()` when enabled, `disabled()` otherwise.
    pub fn init(enabled: bool) -> Result<Self, TelemetryError> {
        if enabled {
            Self::otlp()
        } else {
            Ok(Self::disabled())
        }
    }

    fn from_provider(provider: TracerProvider, exporting: bool) -> Self {
        let tracer = provider.tracer(SERVICE_NAME);
        Self {
            provider,
            tracer,
            propagator: TraceContextPropagator::new(),
            exporting,
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Remote parent context from request headers. Missing or malformed
    /// headers yield an empty context.
    pub fn extract(&self, headers: &HeaderMap) -> Context {
        self.propagator
            .extract_with_context(&Context::new(), &HeaderExtractor(headers))
    }

    /// Write the active span of `cx` into outbound headers.
    pub fn inject(&self, cx: &Context, headers: &mut HeaderMap) {
        self.propagator.inject_context(cx, &mut HeaderInjector(headers));
    }

    /// Start a server-kind span as a child of `parent` (or a new root).
    pub fn start_server_span(&self, name: &'static str, parent: &Context) -> ServerSpan {
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(SpanKind::Server)
            .start_with_context(&self.tracer, parent);
        ServerSpan {
            cx: parent.with_span(span),
        }
    }

    /// Flush pending spans and stop the provider.
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        self.provider
            .shutdown()
            .map_err(|e| TelemetryError::Shutdown(e.to_string()))
    }
}

/// A started server span. Ends exactly once, when dropped.
#[derive(Debug)]
pub struct ServerSpan {
    cx: Context,
}

impl ServerSpan {
    /// Context carrying this span; inject it into outbound calls.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn span_context(&self) -> SpanContext {
        self.cx.span().span_context().clone()
    }

    pub fn set_attribute(&self, attribute: KeyValue) {
        self.cx.span().set_attribute(attribute);
    }

    /// Mark the span as failed with a description.
    pub fn fail(&self, description: String) {
        self.cx.span().set_status(Status::error(description));
    }
}

impl Drop for ServerSpan {
    fn drop(&mut self) {
        self.cx.span().end();
    }
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) else {
            tracing::warn!(header = key, "Dropping unencodable trace header");
            return;
        };
        self.0.insert(name, value);
    }
}

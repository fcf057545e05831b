//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Hop handler produces:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (server spans, W3C trace context in/out)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Prometheus scrape (optional)
//!     → OTLP collector (optional, --otel)
//! ```
//!
//! # Design Decisions
//! - Telemetry is an injected object, never a process-wide global
//! - Propagation works even with export disabled, so hop chains stay linked
//! - Metrics are cheap no-ops unless a recorder is installed

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::tracing::{ServerSpan, Telemetry, TelemetryError};

//! Startup orchestration.
//!
//! # Responsibilities
//! - Build telemetry and (optionally) the metrics endpoint
//! - Build the handler table and mount it on an unstarted server
//! - Hand back the application teardown alongside the server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, inside `ServerState::start`

use std::net::{AddrParseError, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::HopperConfig;
use crate::http::{routes, HopState};
use crate::lifecycle::server::ServerState;
use crate::net::normalize_bind_address;
use crate::observability::metrics::init_metrics;
use crate::observability::{Telemetry, TelemetryError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("invalid metrics address {address}: {source}")]
    MetricsAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to start metrics endpoint: {0}")]
    Metrics(#[from] BuildError),
}

/// Application-level resources that outlive a single request.
pub struct App {
    telemetry: Arc<Telemetry>,
    stopped: AtomicBool,
}

impl App {
    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    /// Flush and shut down telemetry. Runs once; later calls are ignored.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.telemetry.shutdown() {
            tracing::warn!(error = %e, "Telemetry shutdown failed");
        }
        tracing::debug!("App stopped");
    }
}

/// Wire everything up. The returned server is not yet bound.
pub fn setup(
    config: &HopperConfig,
    base: CancellationToken,
) -> Result<(Arc<ServerState>, App), StartupError> {
    let telemetry = Arc::new(Telemetry::init(config.otel)?);

    if let Some(address) = &config.metrics_listen {
        let addr: SocketAddr = normalize_bind_address(address)
            .parse()
            .map_err(|source| StartupError::MetricsAddress {
                address: address.clone(),
                source,
            })?;
        init_metrics(addr)?;
    }

    let mut server = ServerState::new(base, config.listen.clone());
    tracing::debug!("ServerState created");

    let state = HopState::new(telemetry.clone(), config.forward_mode);
    server.mount(routes(state).layer(TraceLayer::new_for_http()));

    tracing::info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        otel = telemetry.is_exporting(),
        forward_mode = ?config.forward_mode,
        "Starting"
    );
    tracing::info!(address = %config.listen, "Server will bind");

    let app = App {
        telemetry,
        stopped: AtomicBool::new(false),
    };
    Ok((Arc::new(server), app))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Phase;

    #[test]
    fn default_setup() {
        let (server, app) = setup(&HopperConfig::default(), CancellationToken::new()).unwrap();
        assert_eq!(server.bind_address(), ":8000");
        assert_eq!(server.phase(), Phase::Created);
        assert!(!app.telemetry().is_exporting());
        app.stop();
        app.stop();
    }

    #[test]
    fn bad_metrics_address_fails() {
        let config = HopperConfig {
            metrics_listen: Some("not-an-address:9100".into()),
            ..Default::default()
        };
        let err = setup(&config, CancellationToken::new()).err().unwrap();
        assert!(matches!(err, StartupError::MetricsAddress { .. }));
    }
}

//! hopper
//!
//! Each request either ends the chain (`GET /`) or is forwarded as a new
//! GET to the next hop, carrying W3C trace context across the boundary.
//!
//! ```text
//!   client ──▶ hop A ──▶ hop B ──▶ … ──▶ hop N ("/": last host)
//!              │ span     │ span           │ span
//!              └──── traceparent ─────────┘
//! ```
//!
//! Ctrl-C / SIGTERM flushes telemetry, then stops the server with a
//! 3 second drain deadline.

use tokio_util::sync::CancellationToken;

use hopper::config::{self, ConfigError};
use hopper::lifecycle::{self, signals};
use hopper::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match config::load(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    logging::init(config.log_level)?;

    let base = CancellationToken::new();
    let (server, app) = lifecycle::setup(&config, base.clone())?;

    {
        let server = server.clone();
        tokio::spawn(async move {
            if let Err(e) = signals::interrupt().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signals");
                return;
            }
            app.stop();
            server.stop().await;
        });
    }

    server.start().await?;
    base.cancel();

    tracing::info!("Shutdown complete");
    Ok(())
}

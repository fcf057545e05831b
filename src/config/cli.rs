//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::{ForwardMode, LogLevel};

/// Flags accepted by the `hopper` binary.
///
/// Every value is optional so that unset flags fall through to the config
/// file and then to the defaults.
#[derive(Debug, Default, Parser)]
#[command(name = "hopper")]
#[command(version, about = "HTTP hop node that forwards requests and propagates trace context", long_about = None)]
pub struct Cli {
    /// Log level (defaults to info)
    #[arg(long, value_enum)]
    pub level: Option<LogLevel>,

    /// Host/port binding for the server (defaults to :8000)
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable the OTLP exporter configured via OTEL_EXPORTER_OTLP_* variables
    #[arg(long)]
    pub otel: bool,

    /// How the next hop is chosen for non-root paths
    #[arg(long, value_enum)]
    pub forward_mode: Option<ForwardMode>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    pub metrics_listen: Option<String>,

    /// Optional TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

//! Configuration schema definitions.
//!
//! All types derive Serde traits so the same shape can come from a TOML file,
//! and the enums derive `clap::ValueEnum` so they double as flag values.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Root configuration for a hopper node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HopperConfig {
    /// Minimum level for log output.
    pub log_level: LogLevel,

    /// Host/port the server binds to. `:8000` binds every interface.
    pub listen: String,

    /// Export spans over OTLP (configured through `OTEL_EXPORTER_OTLP_*`).
    pub otel: bool,

    /// How the next hop is derived from an incoming request.
    pub forward_mode: ForwardMode,

    /// Optional Prometheus scrape endpoint (e.g. "127.0.0.1:9100").
    pub metrics_listen: Option<String>,
}

impl Default for HopperConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            listen: ":8000".to_string(),
            otel: false,
            forward_mode: ForwardMode::Host,
            metrics_listen: None,
        }
    }
}

/// Log verbosity accepted by `--level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a non-terminal request is sent next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ForwardMode {
    /// `http://<Host header><path>`.
    #[default]
    Host,
    /// The path names the next hop: `/next:8001/rest` → `http://next:8001/rest`.
    Path,
}

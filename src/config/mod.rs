//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line (clap)
//!     → cli.rs (parse flags, optional --config path)
//!     → loader.rs (read TOML file, merge CLI over file over defaults)
//!     → validation.rs (semantic checks)
//!     → HopperConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults so the binary runs with no flags at all
//! - Any parse or validation failure aborts startup before the listener binds

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load, ConfigError};
pub use schema::{ForwardMode, HopperConfig, LogLevel};

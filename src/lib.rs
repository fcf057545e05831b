//! hopper: an HTTP hop node for demonstrating distributed trace propagation.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::HopperConfig;
pub use lifecycle::{ServerError, ServerState};
pub use observability::Telemetry;

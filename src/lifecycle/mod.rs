//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Telemetry → Handler table → ServerState (unbound)
//!
//! Serve (server.rs):
//!     start() → accept task binds and serves
//!
//! Shutdown (shutdown.rs, server.rs):
//!     stop() → signal → stop accepting → drain (≤ 3s) → force close → start() returns
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → App::stop() → ServerState::stop()
//! ```
//!
//! # Design Decisions
//! - Shutdown is requested at most once; later requests only wait
//! - Shutdown has a deadline: connections still open after it are closed
//! - stop() joins the accept task before returning

pub mod server;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use server::{BaseContext, Phase, ServerError, ServerState, SHUTDOWN_DEADLINE};
pub use shutdown::Shutdown;
pub use startup::{setup, App, StartupError};

//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept loop, drain/force tokens)
//!     → connection.rs (one task per connection, hyper auto HTTP/1.1 + HTTP/2)
//!     → axum handler table
//!
//! Connection States:
//!     Active → Draining → Closed
//! ```
//!
//! # Design Decisions
//! - Binding happens inside the accept task, so bind failures surface as its result
//! - Drain stops accepting and asks every connection to finish its in-flight request
//! - Force aborts whatever is left once the shutdown deadline passes

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, ConnectionState};
pub use listener::{normalize_bind_address, Listener};

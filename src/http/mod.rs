//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Request from lifecycle/net
//!     → server.rs (extract trace context, open server span)
//!     → request.rs (host, path, headers → next-hop target + preamble)
//!     → "/"  → response.rs terminal body
//!     → else → client.rs (GET next hop, trace context injected)
//!            → response.rs (preamble ++ upstream body, or 500 with error text)
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;

pub use client::{build_client, ForwardError, HopClient};
pub use request::HopRequest;
pub use server::{path_walk, routes, HopState, OPERATION};

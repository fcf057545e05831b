//! Per-connection serving and lifecycle tracking.
//!
//! # Responsibilities
//! - Serve one TCP connection with the shared handler table
//! - Track connection state (Active → Draining → Closed)
//! - Generate unique connection IDs for logs

use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

/// Relaxed ordering is enough: ids only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Processing requests.
    Active,
    /// No new requests; finishing in-flight.
    Draining,
    /// Cut off at the shutdown deadline.
    Closed,
}

/// Serve one connection until the peer closes it or shutdown finishes it.
///
/// On `drain` the connection is told to shut down gracefully; on `force`
/// the connection future is dropped, closing the socket mid-request.
/// Returns the state the connection was in when it ended.
pub async fn serve_connection(
    id: ConnectionId,
    stream: TcpStream,
    router: Router,
    drain: CancellationToken,
    force: CancellationToken,
) -> (ConnectionId, ConnectionState) {
    let builder = Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(router));
    tokio::pin!(conn);

    let mut state = ConnectionState::Active;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(connection_id = %id, error = %e, "Connection ended with error");
                }
                break;
            }
            _ = drain.cancelled(), if state == ConnectionState::Active => {
                state = ConnectionState::Draining;
                tracing::trace!(connection_id = %id, "Connection draining");
                conn.as_mut().graceful_shutdown();
            }
            _ = force.cancelled(), if state == ConnectionState::Draining => {
                state = ConnectionState::Closed;
                tracing::debug!(connection_id = %id, "Connection closed at shutdown deadline");
                break;
            }
        }
    }

    (id, state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn connection_id_display() {
        let id = ConnectionId::new();
        assert_eq!(id.to_string(), format!("conn-{}", id.as_u64()));
    }

    #[tokio::test]
    async fn peer_close_ends_active() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        let id = ConnectionId::new();
        let serving = tokio::spawn(serve_connection(
            id,
            stream,
            Router::new(),
            CancellationToken::new(),
            CancellationToken::new(),
        ));
        drop(client);

        let (ended, state) = tokio::time::timeout(std::time::Duration::from_secs(1), serving)
            .await
            .expect("connection should end")
            .unwrap();
        assert_eq!(ended, id);
        assert_eq!(state, ConnectionState::Active);
    }
}

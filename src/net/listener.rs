//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections and spawn a task per connection
//! - Stop accepting on drain, abort stragglers on force

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::lifecycle::ServerError;
use crate::net::connection::{serve_connection, ConnectionId, ConnectionState};

/// Pause after a failed accept (e.g. file descriptor exhaustion).
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(50);

/// Go-style `:PORT` means every interface.
pub fn normalize_bind_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

/// A bound TCP listener.
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to `addr` (`host:port` or `:port`).
    pub async fn bind(addr: &str) -> Result<Self, ServerError> {
        let address = normalize_bind_address(addr);
        let inner = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;

        if let Ok(local) = inner.local_addr() {
            tracing::info!(address = %local, "Listener bound");
        }

        Ok(Self { inner })
    }

    pub async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept().await
    }
}

/// Bind and serve until `drain` fires, then wait for open connections
/// until they finish or `force` fires.
///
/// Returns `Ok(())` for an orderly close; a bind failure is returned as is.
pub async fn accept_loop(
    bind_address: String,
    router: Router,
    drain: CancellationToken,
    force: CancellationToken,
) -> Result<(), ServerError> {
    let listener = Listener::bind(&bind_address).await?;
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = drain.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let id = ConnectionId::new();
                    tracing::debug!(connection_id = %id, peer_addr = %peer, "Connection accepted");
                    connections.spawn(serve_connection(
                        id,
                        stream,
                        router.clone(),
                        drain.clone(),
                        force.clone(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_PAUSE).await;
                }
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => reaped(joined),
        }
    }

    drop(listener);
    tracing::debug!(open_connections = connections.len(), "Listener closed, draining");

    loop {
        tokio::select! {
            next = connections.join_next() => match next {
                Some(joined) => reaped(joined),
                None => break,
            },
            _ = force.cancelled() => {
                tracing::warn!(
                    open_connections = connections.len(),
                    "Shutdown deadline reached, closing remaining connections"
                );
                connections.shutdown().await;
                break;
            }
        }
    }

    Ok(())
}

fn reaped(joined: Result<(ConnectionId, ConnectionState), JoinError>) {
    match joined {
        Ok((id, state)) => {
            tracing::trace!(connection_id = %id, ended_in = ?state, "Connection closed");
        }
        Err(e) => tracing::warn!(error = %e, "Connection task failed"),
    }
}

//! Server lifecycle: bind, serve, and one coordinated graceful shutdown.
//!
//! # State Machine
//! ```text
//! Created → Running → ShuttingDown → Stopped
//!    │          │                        ▲
//!    │          └── bind failure ────────┘
//!    └── stop() before start(): nothing to join
//! ```
//!
//! `start()` runs the accept loop on one spawned task and waits on two
//! events: that task finishing, and the shutdown signal. On the signal it
//! drains for at most [`SHUTDOWN_DEADLINE`], then forces the remaining
//! connections closed, and keeps waiting for the task's final result.

use std::time::Duration;

use axum::{Extension, Router};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::shutdown::Shutdown;
use crate::net::listener::accept_loop;

/// In-flight requests get this long to finish once shutdown starts.
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("accept loop terminated abnormally: {0}")]
    AcceptLoop(#[from] tokio::task::JoinError),
}

/// Lifecycle phase of a [`ServerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Running,
    ShuttingDown,
    Stopped,
}

/// Cancellation context every request inherits from its server.
///
/// Inserted as a request extension; handlers derive a per-request child so
/// cancelling the base aborts their outbound calls.
#[derive(Debug, Clone, Default)]
pub struct BaseContext(CancellationToken);

impl BaseContext {
    pub fn new(token: CancellationToken) -> Self {
        Self(token)
    }

    /// A child token scoped to one request.
    pub fn request_token(&self) -> CancellationToken {
        self.0.child_token()
    }
}

/// One server instance.
pub struct ServerState {
    bind_address: String,
    router: Router,
    base: CancellationToken,
    shutdown: Shutdown,
    phase: watch::Sender<Phase>,
}

impl ServerState {
    /// An unstarted server. Binding happens in [`start`](Self::start).
    pub fn new(base: CancellationToken, bind_address: impl Into<String>) -> Self {
        let (phase, _) = watch::channel(Phase::Created);
        Self {
            bind_address: bind_address.into(),
            router: Router::new(),
            base,
            shutdown: Shutdown::new(),
            phase,
        }
    }

    /// Add routes to the handler table. Has no effect on a running server.
    pub fn mount(&mut self, routes: Router) {
        self.router = std::mem::take(&mut self.router).merge(routes);
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Observe phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Serve until shutdown completes.
    ///
    /// Returns `Ok(())` after a graceful stop, or the transport error that
    /// ended the accept loop (a bind failure, typically).
    pub async fn start(&self) -> Result<(), ServerError> {
        self.phase.send_replace(Phase::Running);

        let router = self
            .router
            .clone()
            .layer(Extension(BaseContext::new(self.base.clone())));
        let drain = CancellationToken::new();
        let force = CancellationToken::new();

        let mut accept = tokio::spawn(accept_loop(
            self.bind_address.clone(),
            router,
            drain.clone(),
            force.clone(),
        ));

        let deadline = tokio::time::sleep(SHUTDOWN_DEADLINE);
        tokio::pin!(deadline);

        let result = loop {
            tokio::select! {
                joined = &mut accept => {
                    break joined.map_err(ServerError::from).and_then(|served| served);
                }
                _ = self.shutdown.wait(), if !drain.is_cancelled() => {
                    self.phase.send_replace(Phase::ShuttingDown);
                    tracing::info!(
                        deadline_secs = SHUTDOWN_DEADLINE.as_secs(),
                        "Graceful shutdown started"
                    );
                    drain.cancel();
                    deadline.as_mut().reset(Instant::now() + SHUTDOWN_DEADLINE);
                }
                _ = &mut deadline, if drain.is_cancelled() && !force.is_cancelled() => {
                    force.cancel();
                }
            }
        };

        match &result {
            Ok(()) => tracing::info!(address = %self.bind_address, "Server stopped"),
            Err(e) => tracing::error!(address = %self.bind_address, error = %e, "Server terminated"),
        }
        self.phase.send_replace(Phase::Stopped);
        result
    }

    /// Request shutdown and wait until the accept task has exited.
    ///
    /// Only the first call fires the signal; every call waits.
    pub async fn stop(&self) {
        if !self.shutdown.trigger() {
            tracing::warn!("Stop requested more than once");
        }

        let mut phase = self.phase.subscribe();
        let _ = phase
            .wait_for(|p| matches!(p, Phase::Created | Phase::Stopped))
            .await;
    }
}

//! One-shot shutdown signal.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// A signal that fires exactly once.
///
/// `trigger` is check-and-set: only the first call fires the signal, later
/// calls report `false` and do nothing.
#[derive(Debug, Default)]
pub struct Shutdown {
    fired: AtomicBool,
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `true` if this call fired it.
    pub fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Resolves once the signal has fired.
    pub async fn wait(&self) {
        self.token.cancelled().await
    }
}

//! Cooperative stop flag shared between a room and its tick task.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// A cloneable, one-way stop flag.
///
/// Once raised it stays raised. The tick task polls [`is_stopped`] before
/// doing any work and awaits [`stopped`] while sleeping, so a stop raised
/// during the inter-tick wait wakes it immediately.
///
/// [`is_stopped`]: StopSignal::is_stopped
/// [`stopped`]: StopSignal::stopped
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the flag. Idempotent.
    pub fn stop(&self) {
        let was_stopped = self.tx.send_replace(true);
        if !was_stopped {
            debug!("stop signal raised");
        }
    }

    /// Whether [`stop`](Self::stop) has been called on any clone.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the flag is raised (immediately if it already is).
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this can only end by seeing `true`.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

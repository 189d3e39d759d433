use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

/// Single-fire shutdown signal shared across the service.
///
/// A completed download and an OS interrupt both end up here; whichever
/// arrives first wins and every later trigger is a no-op, so the two paths
/// can race freely.
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    fired: Arc<AtomicBool>,
    token: CancellationToken,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Only the first call has any effect.
    pub fn trigger(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            debug!("shutdown already requested, ignoring");
            return;
        }
        info!("shutdown requested");
        self.token.cancel();
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

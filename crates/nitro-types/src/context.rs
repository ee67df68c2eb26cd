//! # Execution Context
//!
//! A cancellation token with a single-fire `done` notification.
//!
//! Built on `tokio::sync::watch`: every clone of a [`Context`] observes the
//! same flag, and [`CancelHandle::cancel`] flips it exactly once. Waiting is
//! notification-driven; nothing polls.
//!
//! ```text
//! Context::with_cancel() ──→ (Context, CancelHandle)
//!                                │            │
//!        ctx.done().await ◀──────┘            └── handle.cancel()
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Cancellable execution scope.
///
/// A background context (see [`Context::background`]) is never cancelled.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// `None` for a background context.
    signal: Option<watch::Receiver<bool>>,
}

impl Context {
    /// A context that never signals cancellation.
    #[must_use]
    pub fn background() -> Self {
        Self { signal: None }
    }

    /// A cancellable context and the handle that cancels it.
    #[must_use]
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self { signal: Some(rx) },
            CancelHandle { tx: Arc::new(tx) },
        )
    }

    /// Whether cancellation has already been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signal.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once the context is cancelled.
    ///
    /// Returns immediately if cancellation already happened. Never resolves
    /// for a background context, or if every [`CancelHandle`] is dropped
    /// without cancelling.
    pub async fn done(&self) {
        let Some(rx) = &self.signal else {
            return std::future::pending().await;
        };

        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Handle that cancels its paired [`Context`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        let changed = self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        });
        if changed {
            debug!("Context cancelled");
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

//! Request-scoped cooperative cancellation.
//!
//! A token propagates from the transport into every component and is checked
//! at loop boundaries (per-slot, per-validator) and before storage I/O.

use tokio::sync::watch;

/// The controlling side; dropping it does NOT cancel.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers observe the new value; send errors only mean that every
        // token is already gone.
        let _ = self.tx.send(true);
    }
}

/// The observing side, cloned into each component a request touches.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that can never fire, for callers without a deadline.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Keep the sender alive forever so the channel never closes.
        std::mem::forget(tx);
        Self { rx }
    }

    pub fn is_canceled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the request is canceled; pends forever if it never is.
    pub async fn canceled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // The handle is gone and can no longer cancel.
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

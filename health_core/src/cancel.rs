//! Cooperative cancellation for exports in flight.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared cancellation flag.
///
/// Clones observe the same state. Once cancelled, a token stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!("Cancellation requested");
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        loop {
            // Register before checking so a concurrent cancel is not missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Cancel this token once `trigger` resolves to `true`.
    ///
    /// The trigger is polled on a spawned task until the returned guard is
    /// dropped. Must be called from within a tokio runtime.
    pub fn cancel_on<F>(&self, trigger: F) -> CancelTrigger
    where
        F: Future<Output = bool> + Send + 'static,
    {
        let token = self.clone();
        let handle = tokio::spawn(async move {
            if trigger.await {
                token.cancel();
            }
        });
        CancelTrigger { handle }
    }
}

/// Listener installed by [`CancellationToken::cancel_on`]; aborted on drop
#[derive(Debug)]
pub struct CancelTrigger {
    handle: JoinHandle<()>,
}

impl Drop for CancelTrigger {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

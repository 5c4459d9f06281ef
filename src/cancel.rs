//! Cooperative cancellation primitive for subscriptions.
//!
//! A `StopSignal` is a cloneable, async-aware token: cancelling any clone
//! notifies all waiters. Subscription forwarders poll it with `biased`
//! priority so that no event is delivered after the signal fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A cooperative cancellation token.
///
/// Clones share the same underlying state, so stopping any clone
/// notifies all waiters.
#[derive(Debug, Default)]
pub struct StopSignal {
    internal: Arc<SharedState>,
}

#[derive(Debug, Default)]
struct SharedState {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    /// Create a new, unstopped signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to all waiters.
    ///
    /// After this call, `stopped()` returns `true` and all pending
    /// `wait()` futures complete.
    pub fn stop(&self) {
        self.internal.stopped.store(true, Ordering::Release);
        self.internal.notify.notify_waiters();
    }

    /// Check if cancellation has been signaled.
    pub fn stopped(&self) -> bool {
        self.internal.stopped.load(Ordering::Acquire)
    }

    /// Wait for cancellation to be signaled.
    ///
    /// Returns immediately if already stopped.
    pub async fn wait(&self) {
        if self.stopped() {
            return;
        }
        let mut notified = std::pin::pin!(self.internal.notify.notified());
        loop {
            // Register as a waiter before re-checking the flag, otherwise a
            // stop() landing between the check and the await would be missed.
            notified.as_mut().enable();
            if self.stopped() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.internal.notify.notified());
        }
    }
}

impl Clone for StopSignal {
    fn clone(&self) -> Self {
        Self {
            internal: Arc::clone(&self.internal),
        }
    }
}

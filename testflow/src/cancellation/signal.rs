//! Abort signal for in-flight agent calls.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Default)]
struct Inner {
    aborted: AtomicBool,
    reason: RwLock<Option<String>>,
    notify: Notify,
}

/// A cloneable signal telling an agent step to stop.
///
/// Aborting is idempotent; only the first reason is kept. Clones share state,
/// so the controller keeps one handle and passes another into the step.
#[derive(Clone, Default)]
pub struct AbortSignal {
    inner: Arc<Inner>,
}

impl AbortSignal {
    /// Creates a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal and wakes every waiter.
    pub fn abort(&self, reason: impl Into<String>) {
        if self
            .inner
            .aborted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.inner.reason.write() = Some(reason.into());
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns whether the signal fired.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Returns the abort reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.inner.reason.read().clone()
    }

    /// Resolves once the signal fires.
    pub async fn aborted(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_aborted() {
            return;
        }
        notified.await;
    }
}

impl std::fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_default_not_aborted() {
        let signal = AbortSignal::new();
        assert!(!signal.is_aborted());
        assert!(signal.reason().is_none());
    }

    #[test]
    fn test_first_reason_wins() {
        let signal = AbortSignal::new();
        signal.abort("timed out");
        signal.abort("second");
        assert!(signal.is_aborted());
        assert_eq!(signal.reason(), Some("timed out".to_string()));
    }

    #[test]
    fn test_clones_share_state() {
        let signal = AbortSignal::new();
        let handle = signal.clone();
        handle.abort("stop");
        assert!(signal.is_aborted());
    }

    #[tokio::test]
    async fn test_aborted_wakes_waiter() {
        let signal = AbortSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.aborted().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.abort("stop");

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_aborted_returns_immediately_when_already_fired() {
        let signal = AbortSignal::new();
        signal.abort("stop");
        tokio_test::assert_ready!(tokio_test::task::spawn(signal.aborted()).poll());
    }
}

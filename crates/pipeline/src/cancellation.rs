//! A latchable, idempotent cancel signal for barge-in (spec.md §4.3).
//!
//! Every suspension point in the turn orchestrator (network read, sentence
//! queue put/take) checks [`CancellationToken::is_cancelled`] and bails out
//! rather than completing. Raising the signal twice, or from two racing
//! callers, has the same observable effect as raising it once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Latch the signal. A no-op if already cancelled.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves immediately if already cancelled, otherwise waits for the
    /// next [`CancellationToken::cancel`] call. Used to race against a
    /// blocking queue `put`/`take` at a suspension point.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_once_latched() {
        let token = CancellationToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("must resolve immediately");
    }

    #[tokio::test]
    async fn cancelled_waits_until_cancel_is_called() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("task must finish shortly after cancel")
            .unwrap();
    }
}

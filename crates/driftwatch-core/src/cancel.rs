//! A minimal cooperative cancellation token shared by the collector
//! framework and the export runtime, the two components whose long-running
//! operations must "return within one scheduling quantum of cancellation"
//! per spec.md §5.
//!
//! Built on [`tokio::sync::watch`] rather than a bespoke `Notify` + flag pair:
//! `watch` already gives a cheap `Clone`, a non-blocking `is_cancelled`
//! check, and an async `cancelled()` that resolves immediately if the token
//! was already cancelled before the waiter was created.

use tokio::sync::watch;

/// A cancellation signal that can be cloned and handed to every task that
/// should observe it. Cancelling is one-way: a token cannot be un-cancelled.
#[derive(Clone)]
pub struct CancellationToken {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Signals cancellation to every clone of this token. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves as soon as the token is cancelled, immediately if it
    /// already was.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }

    /// Derives a child token that is cancelled whenever `self` is, but can
    /// also be cancelled independently (e.g. a per-partition timeout that
    /// should not cancel sibling partitions).
    pub fn child(&self) -> Self {
        let child = Self::new();
        let parent_rx = self.rx.clone();
        let child_tx = child.tx.clone();
        if self.is_cancelled() {
            child.cancel();
        } else {
            tokio::spawn(async move {
                let mut parent_rx = parent_rx;
                while parent_rx.changed().await.is_ok() {
                    if *parent_rx.borrow() {
                        let _ = child_tx.send(true);
                        break;
                    }
                }
            });
        }
        child
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

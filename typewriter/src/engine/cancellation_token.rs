// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::sync::{Arc,
                atomic::{AtomicBool, Ordering}};

use tokio::sync::broadcast;

/// Identifies the operation a [`CancellationToken`] belongs to. Timers are registered
/// against it, so [`crate::TimerRegistry::clear_for_token`] can drop them all at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub u64);

/// Cooperative cancellation handle for one operation. Clones share state.
///
/// Cancelling is one way and idempotent. Waiters blocked in [`Self::cancelled`] wake up
/// through a broadcast channel, and the atomic flag covers the race where a waiter
/// subscribes after the signal was sent.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug)]
struct TokenInner {
    id: TokenId,
    is_cancelled: AtomicBool,
    shutdown_sender: broadcast::Sender<()>,
}

impl CancellationToken {
    #[must_use]
    pub fn new(id: TokenId) -> Self {
        let (shutdown_sender, _) = broadcast::channel::<()>(1);
        Self {
            inner: Arc::new(TokenInner {
                id,
                is_cancelled: AtomicBool::new(false),
                shutdown_sender,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> TokenId { self.inner.id }

    #[must_use]
    pub fn is_cancelled(&self) -> bool { self.inner.is_cancelled.load(Ordering::Acquire) }

    /// Returns `true` if this call did the cancelling.
    pub fn cancel(&self) -> bool {
        if self.inner.is_cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        // No receivers is fine, nobody is waiting.
        // We don't care about the result of this operation.
        self.inner.shutdown_sender.send(()).ok();
        true
    }

    /// Resolves once the token is cancelled. Cancel safe.
    pub async fn cancelled(&self) {
        // Subscribe before checking the flag, so a concurrent `cancel` is never missed.
        let mut shutdown_receiver = self.inner.shutdown_sender.subscribe();
        if self.is_cancelled() {
            return;
        }
        // The sender lives as long as `self`, so this only returns on a signal.
        // We don't care about the result of this operation.
        shutdown_receiver.recv().await.ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let token = CancellationToken::new(TokenId(1));
        assert!(!token.is_cancelled());
        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
        assert!(token.clone().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_cancelled() {
        let token = CancellationToken::new(TokenId(1));
        token.cancel();
        tokio::time::timeout(Duration::from_millis(10), token.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wakes_waiter() {
        let token = CancellationToken::new(TokenId(7));
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!waiter.is_finished());

        token.cancel();
        waiter.await.unwrap();
    }
}

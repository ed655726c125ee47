// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Bookkeeping for every pending delay, plus the [`cancellable_delay`] primitive that
//! all suspension points in the engine go through.

use std::{collections::HashMap, time::Duration};

use crate::{CancellationToken, DEBUG_TYPEWRITER, StdMutex, TokenId, lock_or_recover};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug, Default)]
struct TimerRegistryState {
    next_id: u64,
    pending: HashMap<TimerId, TokenId>,
}

/// Every pending delay has exactly one entry here. An entry is removed exactly once,
/// either when its delay settles or when its token's timers are cleared, whichever comes
/// first. When the session is idle the registry is empty.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    state: StdMutex<TimerRegistryState>,
}

impl TimerRegistry {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns `None` if `token` is already cancelled. The check happens under the
    /// registry lock, so once a token is cancelled and its timers cleared, nothing new
    /// can be registered against it.
    pub fn register(&self, token: &CancellationToken) -> Option<TimerId> {
        let mut state = lock_or_recover!(self.state);
        if token.is_cancelled() {
            return None;
        }
        let timer_id = TimerId(state.next_id);
        state.next_id += 1;
        state.pending.insert(timer_id, token.id());
        Some(timer_id)
    }

    /// Returns `true` if the entry was still pending.
    pub fn settle(&self, timer_id: TimerId) -> bool {
        lock_or_recover!(self.state)
            .pending
            .remove(&timer_id)
            .is_some()
    }

    /// Drops every entry registered against `token_id`. Returns how many were dropped.
    pub fn clear_for_token(&self, token_id: TokenId) -> usize {
        let mut state = lock_or_recover!(self.state);
        let before = state.pending.len();
        state.pending.retain(|_, owner| *owner != token_id);
        before - state.pending.len()
    }

    pub fn clear_all(&self) -> usize {
        let mut state = lock_or_recover!(self.state);
        let count = state.pending.len();
        state.pending.clear();
        count
    }

    #[must_use]
    pub fn len(&self) -> usize { lock_or_recover!(self.state).pending.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Settles the registry entry when the delay future completes or is dropped.
#[derive(Debug)]
struct TimerGuard<'a> {
    registry: &'a TimerRegistry,
    timer_id: TimerId,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) { self.registry.settle(self.timer_id); }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayOutcome {
    Elapsed,
    Cancelled,
}

/// Sleeps for `duration` unless `token` is cancelled first. Never fails.
///
/// A zero duration still yields to the runtime once, so other tasks (including the one
/// calling `stop`) get a chance to run between chunks.
pub async fn cancellable_delay(
    registry: &TimerRegistry,
    duration: Duration,
    token: &CancellationToken,
) -> DelayOutcome {
    if token.is_cancelled() {
        return DelayOutcome::Cancelled;
    }

    if duration.is_zero() {
        tokio::task::yield_now().await;
        return if token.is_cancelled() {
            DelayOutcome::Cancelled
        } else {
            DelayOutcome::Elapsed
        };
    }

    let Some(timer_id) = registry.register(token) else {
        return DelayOutcome::Cancelled;
    };
    let _guard = TimerGuard { registry, timer_id };

    tokio::select! {
        biased;

        // This branch is cancel safe because recv is cancel safe.
        () = token.cancelled() => {
            DEBUG_TYPEWRITER.then(|| {
                // % is Display, ? is Debug.
                tracing::debug!(message = "delay cancelled", token = ?token.id());
            });
            DelayOutcome::Cancelled
        }

        // This branch is cancel safe because sleep is cancel safe.
        () = tokio::time::sleep(duration) => DelayOutcome::Elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_settle_removes_exactly_once() {
        let registry = TimerRegistry::new();
        let timer_id = registry.register(&CancellationToken::new(TokenId(1))).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.settle(timer_id));
        assert!(!registry.settle(timer_id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear_for_token_only_touches_that_token() {
        let registry = TimerRegistry::new();
        let one = CancellationToken::new(TokenId(1));
        registry.register(&one);
        registry.register(&one);
        let other = registry.register(&CancellationToken::new(TokenId(2))).unwrap();

        assert_eq!(registry.clear_for_token(TokenId(1)), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.settle(other));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_elapses_and_settles() {
        let registry = TimerRegistry::new();
        let token = CancellationToken::new(TokenId(1));

        let outcome =
            cancellable_delay(&registry, Duration::from_millis(10), &token).await;

        assert_eq!(outcome, DelayOutcome::Elapsed);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_cut_short_by_cancel() {
        let registry = Arc::new(TimerRegistry::new());
        let token = CancellationToken::new(TokenId(1));

        let handle = {
            let registry = registry.clone();
            let token = token.clone();
            tokio::spawn(async move {
                cancellable_delay(&registry, Duration::from_secs(60), &token).await
            })
        };

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(registry.len(), 1);

        token.cancel();
        assert_eq!(handle.await.unwrap(), DelayOutcome::Cancelled);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_refuses_cancelled_token() {
        let registry = TimerRegistry::new();
        let token = CancellationToken::new(TokenId(3));
        token.cancel();
        assert_eq!(registry.register(&token), None);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_never_registers() {
        let registry = TimerRegistry::new();
        let token = CancellationToken::new(TokenId(1));
        token.cancel();

        let outcome =
            cancellable_delay(&registry, Duration::from_secs(60), &token).await;

        assert_eq!(outcome, DelayOutcome::Cancelled);
        assert!(registry.is_empty());
    }
}

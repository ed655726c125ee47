// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Single-flight execution of operations.
//!
//! Every [`OperationScheduler::submit`] takes a ticket. Taking a ticket cancels the
//! active operation (and clears its timers) right away, then waits its turn on the
//! operation lock. When the turn comes, a ticket that is no longer the latest one has
//! been superseded while waiting, and is dropped without running. So no matter how many
//! operations pile up, only the newest one runs once the current one settles.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::{CancellationToken, DEBUG_TYPEWRITER, StdMutex, TimerRegistry, TokenId,
            TypewriterResult, lock_or_recover};

#[derive(Debug, Default)]
struct SchedulerState {
    latest_ticket: u64,
    next_token_id: u64,
    active_token: Option<CancellationToken>,
}

#[derive(Debug, Default)]
pub struct OperationScheduler {
    op_lock: tokio::sync::Mutex<()>,
    state: StdMutex<SchedulerState>,
    timers: TimerRegistry,
    is_typing: AtomicBool,
}

/// Brackets the active operation: `is_typing` is set for exactly as long as it lives,
/// and its token and timers are cleaned up even if the operation future is dropped.
#[derive(Debug)]
struct ActiveOperationGuard<'a> {
    scheduler: &'a OperationScheduler,
    token_id: TokenId,
}

impl<'a> ActiveOperationGuard<'a> {
    fn new(scheduler: &'a OperationScheduler, token_id: TokenId) -> Self {
        scheduler.is_typing.store(true, Ordering::Release);
        Self {
            scheduler,
            token_id,
        }
    }
}

impl Drop for ActiveOperationGuard<'_> {
    fn drop(&mut self) {
        {
            let mut state = lock_or_recover!(self.scheduler.state);
            if state
                .active_token
                .as_ref()
                .is_some_and(|token| token.id() == self.token_id)
            {
                state.active_token = None;
            }
        }
        self.scheduler.timers.clear_for_token(self.token_id);
        self.scheduler.is_typing.store(false, Ordering::Release);
    }
}

impl OperationScheduler {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn timers(&self) -> &TimerRegistry { &self.timers }

    #[must_use]
    pub fn is_typing(&self) -> bool { self.is_typing.load(Ordering::Acquire) }

    /// Cancels the active operation, synchronously clears its timers, and invalidates
    /// every operation still waiting for its turn. Returns the new latest ticket.
    pub fn supersede(&self) -> u64 {
        let mut state = lock_or_recover!(self.state);
        state.latest_ticket += 1;
        if let Some(token) = state.active_token.as_ref() {
            token.cancel();
            let cleared = self.timers.clear_for_token(token.id());
            DEBUG_TYPEWRITER.then(|| {
                // % is Display, ? is Debug.
                tracing::debug!(
                    message = "superseded active operation",
                    token = ?token.id(),
                    cleared_timers = cleared
                );
            });
        }
        state.latest_ticket
    }

    /// Resolves once no operation holds the operation lock.
    pub async fn wait_for_idle(&self) { drop(self.op_lock.lock().await); }

    /// Runs `op` once every earlier operation has settled, unless a newer submission (or
    /// [`Self::supersede`]) arrives first. Returns `Ok(None)` when superseded before
    /// starting.
    ///
    /// # Errors
    ///
    /// Returns whatever `op` returns. Errors are logged here, and bookkeeping is cleared
    /// either way so later operations are never blocked.
    pub async fn submit<F, Fut, T>(
        &self,
        operation: &'static str,
        op: F,
    ) -> TypewriterResult<Option<T>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = TypewriterResult<T>>,
    {
        let ticket = self.supersede();

        // Waits for the prior operation to settle. Tokio's mutex is fair (FIFO).
        let _permit = self.op_lock.lock().await;

        let token = {
            let mut state = lock_or_recover!(self.state);
            if state.latest_ticket != ticket {
                DEBUG_TYPEWRITER.then(|| {
                    tracing::debug!(message = "dropped before start", operation = operation);
                });
                return Ok(None);
            }
            state.next_token_id += 1;
            let token = CancellationToken::new(TokenId(state.next_token_id));
            state.active_token = Some(token.clone());
            token
        };

        let _active = ActiveOperationGuard::new(self, token.id());

        match op(token).await {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                // % is Display, ? is Debug.
                tracing::warn!(
                    message = "Operation failed",
                    operation = operation,
                    error = %error
                );
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TypewriterError, cancellable_delay};
    use pretty_assertions::assert_eq;
    use std::{sync::Arc, time::Duration};

    #[tokio::test(start_paused = true)]
    async fn test_submit_runs_and_brackets_typing() {
        let scheduler = OperationScheduler::new();
        assert!(!scheduler.is_typing());

        let result = scheduler
            .submit("query", |_token| async { Ok(scheduler.is_typing()) })
            .await;

        assert_eq!(result, Ok(Some(true)));
        assert!(!scheduler.is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_submission_cancels_older() {
        let scheduler = Arc::new(OperationScheduler::new());

        let first = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                scheduler
                    .submit("first", |token| {
                        let scheduler = scheduler.clone();
                        async move {
                            Ok(cancellable_delay(
                                scheduler.timers(),
                                Duration::from_secs(60),
                                &token,
                            )
                            .await)
                        }
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(scheduler.timers().len(), 1);

        let second = scheduler.submit("second", |_token| async { Ok("second") }).await;

        assert_eq!(
            first.await.unwrap(),
            Ok(Some(crate::DelayOutcome::Cancelled))
        );
        assert_eq!(second, Ok(Some("second")));
        assert!(scheduler.timers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_submission_is_superseded() {
        let scheduler = Arc::new(OperationScheduler::new());
        let permit = scheduler.op_lock.lock().await;

        let waiting = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.submit("waiting", |_| async { Ok(1) }).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        scheduler.supersede();
        drop(permit);

        assert_eq!(waiting.await.unwrap(), Ok(None));
    }

    #[tokio::test]
    async fn test_error_still_clears_bookkeeping() {
        let scheduler = OperationScheduler::new();

        let result: TypewriterResult<Option<()>> = scheduler
            .submit("failing", |_| async { Err(TypewriterError::content("gone")) })
            .await;

        assert!(result.is_err());
        assert!(!scheduler.is_typing());
        let next = scheduler.submit("next", |_| async { Ok(()) }).await;
        assert_eq!(next, Ok(Some(())));
    }
}

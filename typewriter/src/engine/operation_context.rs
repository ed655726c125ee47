// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::time::Duration;

use crate::{CancellationToken, DelayOutcome, NodeId, RenderSurface, ScrollSettings, Stage,
            StdMutex, TimerRegistry, cancellable_delay, lock_or_recover};

/// How a walk (typing, backspacing, or a whole loop) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Completed,
    /// The token was cancelled, by `stop` or by a newer operation.
    Cancelled,
    /// The target root left the surface mid-walk.
    Detached,
}

/// Per step knobs shared by the mutator and the backspace engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSettings {
    /// Graphemes per flush. Never 0.
    pub chunk_size: usize,
    pub delay: Duration,
    pub scroll: ScrollSettings,
}

/// Everything one in-flight operation needs. Borrowed from the session for the
/// duration of the operation.
#[derive(Debug)]
pub struct OperationContext<'a, S> {
    pub stage: &'a StdMutex<Stage<S>>,
    pub timers: &'a TimerRegistry,
    pub token: &'a CancellationToken,
    pub root: NodeId,
}

impl<S: RenderSurface> OperationContext<'_, S> {
    /// Runs `f` with the stage locked. Never call this across an `.await`.
    pub fn with_stage<R>(&self, f: impl FnOnce(&mut Stage<S>) -> R) -> R {
        let mut stage = lock_or_recover!(self.stage);
        f(&mut stage)
    }

    /// Returns why the walk must halt, if it must.
    #[must_use]
    pub fn checkpoint(&self) -> Option<WalkOutcome> {
        if self.token.is_cancelled() {
            return Some(WalkOutcome::Cancelled);
        }
        if !self.with_stage(|stage| stage.is_connected(self.root)) {
            return Some(WalkOutcome::Detached);
        }
        None
    }

    pub async fn delay(&self, duration: Duration) -> DelayOutcome {
        cancellable_delay(self.timers, duration, self.token).await
    }
}

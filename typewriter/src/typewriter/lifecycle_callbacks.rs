// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt::Debug,
          panic::{AssertUnwindSafe, catch_unwind},
          sync::Arc};

use strum_macros::Display;

use crate::{RenderSurface, Typewriter};

pub type LifecycleCallback<S> =
    Arc<dyn Fn(&Typewriter<S>) -> miette::Result<()> + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleEvent {
    Stopped,
    Finished,
    Destroyed,
}

/// Hooks fired by the session. A callback that returns an error, or panics, is logged
/// and otherwise ignored. It never reaches the engine or the other callbacks.
///
/// - `on_stopped`: after [`Typewriter::stop`] reached quiescence, and on destroy.
/// - `on_finished`: after an operation completed on its own (not cancelled).
/// - `on_destroyed`: exactly once, on the first [`Typewriter::destroy`].
pub struct LifecycleCallbacks<S: RenderSurface> {
    pub on_stopped: Option<LifecycleCallback<S>>,
    pub on_finished: Option<LifecycleCallback<S>>,
    pub on_destroyed: Option<LifecycleCallback<S>>,
}

impl<S: RenderSurface> Default for LifecycleCallbacks<S> {
    fn default() -> Self {
        Self {
            on_stopped: None,
            on_finished: None,
            on_destroyed: None,
        }
    }
}

impl<S: RenderSurface> Clone for LifecycleCallbacks<S> {
    fn clone(&self) -> Self {
        Self {
            on_stopped: self.on_stopped.clone(),
            on_finished: self.on_finished.clone(),
            on_destroyed: self.on_destroyed.clone(),
        }
    }
}

impl<S: RenderSurface> Debug for LifecycleCallbacks<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleCallbacks")
            .field("on_stopped", &self.on_stopped.is_some())
            .field("on_finished", &self.on_finished.is_some())
            .field("on_destroyed", &self.on_destroyed.is_some())
            .finish()
    }
}

impl<S: RenderSurface> LifecycleCallbacks<S> {
    #[must_use]
    pub fn on_stopped(
        mut self,
        callback: impl Fn(&Typewriter<S>) -> miette::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_stopped = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_finished(
        mut self,
        callback: impl Fn(&Typewriter<S>) -> miette::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_finished = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_destroyed(
        mut self,
        callback: impl Fn(&Typewriter<S>) -> miette::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_destroyed = Some(Arc::new(callback));
        self
    }

    pub(crate) fn invoke(&self, event: LifecycleEvent, typewriter: &Typewriter<S>) {
        let maybe_callback = match event {
            LifecycleEvent::Stopped => &self.on_stopped,
            LifecycleEvent::Finished => &self.on_finished,
            LifecycleEvent::Destroyed => &self.on_destroyed,
        };
        let Some(callback) = maybe_callback else {
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| callback(typewriter))) {
            Ok(Ok(())) => {}
            Ok(Err(report)) => {
                // % is Display, ? is Debug.
                tracing::warn!(
                    message = "Lifecycle callback failed",
                    event = %event,
                    error = ?report
                );
            }
            Err(_) => {
                tracing::warn!(message = "Lifecycle callback panicked", event = %event);
            }
        }
    }
}

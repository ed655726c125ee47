// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The public session handle. See [`Typewriter`].

use std::{fmt::Debug,
          sync::{Arc,
                 atomic::{AtomicBool, AtomicU32, Ordering}}};

use crate::{CancellationToken, ContentPipeline, EraseLimit, EraseOutcome, LifecycleCallbacks,
            LifecycleEvent, LoopCount, LoopPlan, MarkdownRenderer, MarkupParser, NodeId,
            NodeKind, OperationContext, OperationScheduler, RenderSurface, ResolvedOptions,
            Sanitizer, ScrollSettings, Stage, StdMutex, TargetRef, TypewriterConfig,
            TypewriterError, TypewriterOptions, TypewriterResult, WalkOutcome,
            erase_content, lock_or_recover, ok, reveal_content, run_loop};

/// One typewriter session bound to one render surface.
///
/// This is a cheap [`Clone`] handle. Clones share the session, so one task can await
/// [`start_typing`](Self::start_typing) while another calls [`stop`](Self::stop).
///
/// # Single flight
///
/// Starting an operation while another is in flight cancels the older one, waits for
/// it to settle, and then runs the new one. The older future resolves with `Ok(())`.
/// Cancellation is never an error.
///
/// # Example
///
/// ```
/// use r3bl_typewriter::{OffscreenSurface, RenderSurface, Typewriter, TypewriterConfig,
///                       TypewriterOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> miette::Result<()> {
/// let mut surface = OffscreenSurface::new();
/// let body = surface.document_root();
/// surface.append_new_element(body, "div", Some("out"));
///
/// let config = TypewriterConfig {
///     type_delay_ms: 0,
///     ..Default::default()
/// };
/// let typewriter = Typewriter::try_new(surface, config)?;
/// typewriter
///     .start_typing("Hello", Some("out".into()), TypewriterOptions::default())
///     .await?;
/// assert_eq!(typewriter.visible_text(), "Hello");
/// assert!(!typewriter.is_typing());
/// # Ok(())
/// # }
/// ```
pub struct Typewriter<S: RenderSurface> {
    inner: Arc<TypewriterInner<S>>,
}

struct TypewriterInner<S: RenderSurface> {
    config: TypewriterConfig,
    pipeline: ContentPipeline,
    callbacks: LifecycleCallbacks<S>,
    stage: StdMutex<Stage<S>>,
    scheduler: OperationScheduler,
    session: StdMutex<SessionState>,
    current_iteration: AtomicU32,
    is_destroyed: AtomicBool,
}

/// What the last operation worked on.
#[derive(Debug, Default)]
struct SessionState {
    target: Option<NodeId>,
    content: Option<String>,
    /// Resolved for the last operation that touched the stage, so `stop` honors its
    /// per call override.
    hide_cursor_on_finish: bool,
}

impl<S: RenderSurface> Clone for Typewriter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: RenderSurface> Debug for Typewriter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typewriter")
            .field("is_typing", &self.is_typing())
            .field("is_destroyed", &self.is_destroyed())
            .field("current_iteration", &self.current_iteration())
            .field("pending_timers", &self.pending_timer_count())
            .finish_non_exhaustive()
    }
}

/// Builds a [`Typewriter`] with custom callbacks or content collaborators.
pub struct TypewriterBuilder<S: RenderSurface> {
    surface: S,
    config: TypewriterConfig,
    callbacks: LifecycleCallbacks<S>,
    pipeline: ContentPipeline,
}

impl<S: RenderSurface> Debug for TypewriterBuilder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypewriterBuilder")
            .field("config", &self.config)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

impl<S: RenderSurface> TypewriterBuilder<S> {
    #[must_use]
    pub fn config(mut self, config: TypewriterConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn callbacks(mut self, callbacks: LifecycleCallbacks<S>) -> Self {
        self.callbacks = callbacks;
        self
    }

    #[must_use]
    pub fn markdown_renderer(mut self, renderer: impl MarkdownRenderer + 'static) -> Self {
        self.pipeline.markdown_renderer = Arc::new(renderer);
        self
    }

    #[must_use]
    pub fn sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.pipeline.sanitizer = Arc::new(sanitizer);
        self
    }

    #[must_use]
    pub fn markup_parser(mut self, parser: impl MarkupParser + 'static) -> Self {
        self.pipeline.markup_parser = Arc::new(parser);
        self
    }

    /// # Errors
    ///
    /// Returns [`TypewriterError::Configuration`] if the config is invalid.
    pub fn try_build(self) -> TypewriterResult<Typewriter<S>> {
        self.config.validate()?;
        let hide_cursor_on_finish = self.config.hide_cursor_on_finish;
        Ok(Typewriter {
            inner: Arc::new(TypewriterInner {
                config: self.config,
                pipeline: self.pipeline,
                callbacks: self.callbacks,
                stage: StdMutex::new(Stage::new(self.surface)),
                scheduler: OperationScheduler::new(),
                session: StdMutex::new(SessionState {
                    hide_cursor_on_finish,
                    ..Default::default()
                }),
                current_iteration: AtomicU32::new(0),
                is_destroyed: AtomicBool::new(false),
            }),
        })
    }
}

impl<S: RenderSurface> Typewriter<S> {
    #[must_use]
    pub fn builder(surface: S) -> TypewriterBuilder<S> {
        TypewriterBuilder {
            surface,
            config: TypewriterConfig::default(),
            callbacks: LifecycleCallbacks::default(),
            pipeline: ContentPipeline::default(),
        }
    }

    /// # Errors
    ///
    /// Returns [`TypewriterError::Configuration`] if the config is invalid.
    pub fn try_new(surface: S, config: TypewriterConfig) -> TypewriterResult<Self> {
        Self::builder(surface).config(config).try_build()
    }

    /// Types `content` into `target` (or the configured target), once.
    ///
    /// # Errors
    ///
    /// - [`TypewriterError::Lifecycle`] if the session is destroyed.
    /// - [`TypewriterError::Configuration`] if `options` are invalid.
    /// - [`TypewriterError::Content`] if the target can't be resolved.
    /// - [`TypewriterError::ContentParse`] if the content can't be parsed.
    pub async fn start_typing(
        &self,
        content: impl Into<String>,
        target: Option<TargetRef>,
        options: TypewriterOptions,
    ) -> TypewriterResult<()> {
        self.ensure_alive("start_typing")?;
        let resolved = ResolvedOptions::try_resolve(&self.inner.config, &options)?;
        let content = content.into();

        let outcome = self
            .inner
            .scheduler
            .submit("start_typing", async move |token| -> TypewriterResult<WalkOutcome> {
                let root = self.resolve_root(target.as_ref())?;
                let fragment = self.inner.pipeline.build(&content, resolved.pipeline_flags)?;
                self.remember(root, Some(content));

                let ctx = self.operation_context(&token, root);
                let scroll = self.resolve_scroll(&resolved, root);
                self.prepare_stage(&ctx, &resolved, resolved.clear_before_start);

                let outcome =
                    reveal_content(&ctx, &fragment, resolved.type_step(scroll)).await;
                settle_cursor(&ctx, outcome, &resolved);
                Ok(outcome)
            })
            .await?;

        self.notify_finished(outcome);
        ok!()
    }

    /// Repeats type → clear cycles over `content` (falling back to the last typed content,
    /// then to [`TypewriterConfig::text`]), as set by the loop options.
    ///
    /// # Errors
    ///
    /// Same as [`Self::start_typing`], plus [`TypewriterError::Content`] when there's no
    /// content to fall back to.
    pub async fn start_loop(
        &self,
        content: Option<String>,
        target: Option<TargetRef>,
        options: TypewriterOptions,
    ) -> TypewriterResult<()> {
        self.ensure_alive("start_loop")?;
        let resolved = ResolvedOptions::try_resolve(&self.inner.config, &options)?;

        let outcome = self
            .inner
            .scheduler
            .submit("start_loop", async move |token| -> TypewriterResult<WalkOutcome> {
                let root = self.resolve_root(target.as_ref())?;
                let content = content
                    .or_else(|| lock_or_recover!(self.inner.session).content.clone())
                    .or_else(|| self.inner.config.text.clone())
                    .ok_or_else(|| TypewriterError::content("no content to loop over"))?;
                let fragment = self.inner.pipeline.build(&content, resolved.pipeline_flags)?;
                self.remember(root, Some(content));
                self.inner.current_iteration.store(0, Ordering::Release);

                if resolved.loop_count == LoopCount::Finite(0) {
                    return Ok(WalkOutcome::Completed);
                }

                let ctx = self.operation_context(&token, root);
                let scroll = self.resolve_scroll(&resolved, root);
                self.prepare_stage(&ctx, &resolved, resolved.clear_before_start);

                let plan = LoopPlan {
                    count: resolved.loop_count,
                    start_delay: resolved.loop_start_delay,
                    end_delay: resolved.loop_end_delay,
                    clear_strategy: resolved.clear_strategy,
                    final_behavior: resolved.final_behavior,
                    type_step: resolved.type_step(scroll),
                    erase_step: resolved.erase_step(scroll),
                };
                let outcome =
                    run_loop(&ctx, &fragment, &plan, &self.inner.current_iteration).await;
                settle_cursor(&ctx, outcome, &resolved);
                Ok(outcome)
            })
            .await?;

        self.notify_finished(outcome);
        ok!()
    }

    /// Erases `count` graphemes from the end of the last target, or everything when
    /// `count` is `None`.
    ///
    /// # Errors
    ///
    /// - [`TypewriterError::Lifecycle`] if the session is destroyed.
    /// - [`TypewriterError::Configuration`] if `options` are invalid.
    /// - [`TypewriterError::Content`] if no operation ran yet and no target is configured.
    pub async fn backspace(
        &self,
        count: Option<usize>,
        options: TypewriterOptions,
    ) -> TypewriterResult<()> {
        self.ensure_alive("backspace")?;
        let resolved = ResolvedOptions::try_resolve(&self.inner.config, &options)?;
        let limit = count.map_or(EraseLimit::Unbounded, EraseLimit::Chars);

        let outcome = self
            .inner
            .scheduler
            .submit("backspace", async move |token| -> TypewriterResult<WalkOutcome> {
                let root = self.resolve_current_root()?;
                self.remember(root, None);

                let ctx = self.operation_context(&token, root);
                let scroll = self.resolve_scroll(&resolved, root);
                self.prepare_stage(&ctx, &resolved, false);

                let outcome =
                    match erase_content(&ctx, limit, resolved.erase_step(scroll)).await {
                        EraseOutcome::Completed { .. } => WalkOutcome::Completed,
                        EraseOutcome::Cancelled => WalkOutcome::Cancelled,
                        EraseOutcome::Detached => WalkOutcome::Detached,
                    };
                settle_cursor(&ctx, outcome, &resolved);
                Ok(outcome)
            })
            .await?;

        self.notify_finished(outcome);
        ok!()
    }

    /// Cancels the in-flight operation and waits until it has settled. Afterwards no
    /// timers are pending and [`Self::is_typing`] is `false`. The caret is hidden if the
    /// last operation resolved `hide_cursor_on_finish` to `true`, per call override
    /// included.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::Lifecycle`] if the session is destroyed.
    pub async fn stop(&self) -> TypewriterResult<()> {
        self.ensure_alive("stop")?;

        self.inner.scheduler.supersede();
        self.inner.scheduler.wait_for_idle().await;

        let hide_cursor = lock_or_recover!(self.inner.session).hide_cursor_on_finish;
        if hide_cursor {
            self.with_stage(|stage| stage.cursor.release(&mut stage.surface));
        }

        self.inner.callbacks.invoke(LifecycleEvent::Stopped, self);
        ok!()
    }

    /// Stops the session for good and removes the caret. Idempotent, never fails.
    ///
    /// Timers are cleared right away. An in-flight operation notices the cancellation at
    /// its next checkpoint and resolves with `Ok(())`; await it (or [`Self::stop`]
    /// first) if you need quiescence.
    pub fn destroy(&self) {
        if self.inner.is_destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.scheduler.supersede();
        self.inner.scheduler.timers().clear_all();
        self.with_stage(|stage| stage.cursor.release(&mut stage.surface));

        self.inner.callbacks.invoke(LifecycleEvent::Stopped, self);
        self.inner.callbacks.invoke(LifecycleEvent::Destroyed, self);
    }

    #[must_use]
    pub fn is_typing(&self) -> bool { self.inner.scheduler.is_typing() }

    #[must_use]
    pub fn is_destroyed(&self) -> bool { self.inner.is_destroyed.load(Ordering::Acquire) }

    /// Completed typing passes of the current (or last) loop.
    #[must_use]
    pub fn current_iteration(&self) -> u32 {
        self.inner.current_iteration.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn pending_timer_count(&self) -> usize { self.inner.scheduler.timers().len() }

    #[must_use]
    pub fn config(&self) -> &TypewriterConfig { &self.inner.config }

    /// The root the last operation worked on.
    #[must_use]
    pub fn current_target(&self) -> Option<NodeId> {
        lock_or_recover!(self.inner.session).target
    }

    #[must_use]
    pub fn cursor_node(&self) -> Option<NodeId> {
        self.with_stage(|stage| stage.cursor.marker())
    }

    /// Text under the current target, caret excluded.
    #[must_use]
    pub fn visible_text(&self) -> String {
        match self.current_target() {
            Some(root) => self.with_stage(|stage| stage.visible_text(root)),
            None => String::new(),
        }
    }

    /// Runs `f` with exclusive access to the render surface. Don't call this from
    /// inside another `with_surface`.
    pub fn with_surface<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        self.with_stage(|stage| f(&mut stage.surface))
    }

    fn with_stage<R>(&self, f: impl FnOnce(&mut Stage<S>) -> R) -> R {
        let mut stage = lock_or_recover!(self.inner.stage);
        f(&mut stage)
    }

    fn ensure_alive(&self, operation: &'static str) -> TypewriterResult<()> {
        if self.is_destroyed() {
            return Err(TypewriterError::Lifecycle { operation });
        }
        ok!()
    }

    fn operation_context<'a>(
        &'a self,
        token: &'a CancellationToken,
        root: NodeId,
    ) -> OperationContext<'a, S> {
        OperationContext {
            stage: &self.inner.stage,
            timers: self.inner.scheduler.timers(),
            token,
            root,
        }
    }

    fn remember(&self, root: NodeId, content: Option<String>) {
        let mut session = lock_or_recover!(self.inner.session);
        session.target = Some(root);
        if content.is_some() {
            session.content = content;
        }
    }

    /// Explicit target, then the configured one, then the last one used.
    fn resolve_root(&self, target: Option<&TargetRef>) -> TypewriterResult<NodeId> {
        match target.or(self.inner.config.target.as_ref()) {
            Some(target) => self.resolve_target_ref(target),
            None => self.current_target().ok_or_else(|| {
                TypewriterError::content("no target was given, and none is configured")
            }),
        }
    }

    /// The last target used, then the configured one.
    fn resolve_current_root(&self) -> TypewriterResult<NodeId> {
        if let Some(root) = self.current_target() {
            return Ok(root);
        }
        match self.inner.config.target.as_ref() {
            Some(target) => self.resolve_target_ref(target),
            None => Err(TypewriterError::content(
                "nothing was typed yet, and no target is configured",
            )),
        }
    }

    fn resolve_target_ref(&self, target: &TargetRef) -> TypewriterResult<NodeId> {
        self.with_stage(|stage| match target {
            TargetRef::Node(node) => match stage.surface.kind(*node) {
                Some(NodeKind::Element) => Ok(*node),
                _ => Err(TypewriterError::content(format!(
                    "node {node} is not an element on the surface"
                ))),
            },
            TargetRef::Id(id) => stage.surface.element_by_id(id).ok_or_else(|| {
                TypewriterError::content(format!("no element with id {id:?}"))
            }),
        })
    }

    /// A scroll container that can't be resolved falls back to the content root.
    fn resolve_scroll(&self, resolved: &ResolvedOptions, root: NodeId) -> ScrollSettings {
        let target = match resolved.scroll_container.as_ref() {
            Some(container) => match self.resolve_target_ref(container) {
                Ok(node) => node,
                Err(error) => {
                    // % is Display, ? is Debug.
                    tracing::warn!(
                        message = "Scroll container not found, following the target",
                        error = %error
                    );
                    root
                }
            },
            None => root,
        };
        resolved.scroll_settings(target)
    }

    /// Shows (or hides) the caret, optionally clears the target, and parks the caret at
    /// its end.
    fn prepare_stage(
        &self,
        ctx: &OperationContext<'_, S>,
        resolved: &ResolvedOptions,
        clear: bool,
    ) {
        lock_or_recover!(self.inner.session).hide_cursor_on_finish =
            resolved.hide_cursor_on_finish;

        ctx.with_stage(|stage| {
            // Checked under the stage lock, which `destroy` takes to release the caret.
            if ctx.token.is_cancelled() || self.is_destroyed() {
                return;
            }
            stage.cursor.prepare(
                &mut stage.surface,
                resolved.show_cursor,
                &resolved.cursor_char,
            );
            if clear {
                stage.clear_content(ctx.root);
            } else {
                stage.relocate_marker(ctx.root);
            }
            stage.scroll.reset_counter();
        });
    }

    fn notify_finished(&self, outcome: Option<WalkOutcome>) {
        if outcome == Some(WalkOutcome::Completed) && !self.is_destroyed() {
            self.inner.callbacks.invoke(LifecycleEvent::Finished, self);
        }
    }
}

/// Hides the caret after an operation that completed on its own, when configured.
fn settle_cursor<S: RenderSurface>(
    ctx: &OperationContext<'_, S>,
    outcome: WalkOutcome,
    resolved: &ResolvedOptions,
) {
    if outcome == WalkOutcome::Completed && resolved.hide_cursor_on_finish {
        ctx.with_stage(|stage| stage.cursor.release(&mut stage.surface));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OffscreenSurface;
    use pretty_assertions::assert_eq;

    fn make_typewriter() -> Typewriter<OffscreenSurface> {
        let mut surface = OffscreenSurface::new();
        let body = surface.document_root();
        surface.append_new_element(body, "div", Some("out"));
        let config = TypewriterConfig {
            type_delay_ms: 0,
            backspace_delay_ms: 0,
            ..Default::default()
        };
        Typewriter::try_new(surface, config).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = TypewriterConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            Typewriter::try_new(OffscreenSurface::new(), config),
            Err(TypewriterError::Configuration {
                field: "chunk_size",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unresolvable_target_rejects_only_that_operation() {
        let typewriter = make_typewriter();

        let result = typewriter
            .start_typing("x", Some("missing".into()), TypewriterOptions::default())
            .await;
        assert!(matches!(result, Err(TypewriterError::Content { .. })));
        assert!(!typewriter.is_typing());

        typewriter
            .start_typing("ok", Some("out".into()), TypewriterOptions::default())
            .await
            .unwrap();
        assert_eq!(typewriter.visible_text(), "ok");
    }

    #[tokio::test]
    async fn test_backspace_without_target_is_a_content_error() {
        let typewriter = make_typewriter();
        let result = typewriter.backspace(Some(1), TypewriterOptions::default()).await;
        assert!(matches!(result, Err(TypewriterError::Content { .. })));
    }

    #[tokio::test]
    async fn test_destroyed_session_rejects_operations() {
        let typewriter = make_typewriter();
        typewriter.destroy();

        assert_eq!(
            typewriter.stop().await,
            Err(TypewriterError::Lifecycle { operation: "stop" })
        );
        assert_eq!(
            typewriter
                .start_typing("x", None, TypewriterOptions::default())
                .await,
            Err(TypewriterError::Lifecycle {
                operation: "start_typing"
            })
        );
        assert!(typewriter.is_destroyed());
    }

    #[tokio::test]
    async fn test_invalid_options_are_rejected_synchronously() {
        let typewriter = make_typewriter();
        let options = TypewriterOptions {
            cursor_char: Some(String::new()),
            ..Default::default()
        };
        let result = typewriter.start_typing("x", Some("out".into()), options).await;
        assert!(matches!(
            result,
            Err(TypewriterError::Configuration {
                field: "cursor_char",
                ..
            })
        ));
        assert_eq!(typewriter.current_target(), None);
    }

    #[tokio::test]
    async fn test_cursor_is_hidden_on_finish() {
        let typewriter = make_typewriter();
        typewriter
            .start_typing("Hi", Some("out".into()), TypewriterOptions::default())
            .await
            .unwrap();
        assert_eq!(typewriter.cursor_node(), None);

        let options = TypewriterOptions {
            hide_cursor_on_finish: Some(false),
            cursor_char: Some("_".into()),
            ..Default::default()
        };
        typewriter
            .start_typing("Hi", Some("out".into()), options)
            .await
            .unwrap();
        let root = typewriter.current_target().unwrap();
        let markup = typewriter.with_surface(|surface| surface.render_markup(root));
        assert!(markup.starts_with("Hi<span"));
        assert!(markup.ends_with(">_</span>"));
    }
}

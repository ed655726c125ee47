// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Sequences type → clear → type cycles.
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//! Idle ─► Typing ─► EndDelay ─► Clearing | Backspacing ─► StartDelay
//!            │                          │
//!            └──────────────────────────┴──────────► Terminal
//! ```

use std::{sync::atomic::{AtomicU32, Ordering},
          time::Duration};

use crate::{ClearStrategy, ContentNode, DEBUG_TYPEWRITER, DelayOutcome, EraseLimit,
            EraseOutcome, FinalBehavior, LoopCount, OperationContext, RenderSurface,
            StepSettings, WalkOutcome, erase_content, reveal_content};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPlan {
    pub count: LoopCount,
    pub start_delay: Duration,
    pub end_delay: Duration,
    pub clear_strategy: ClearStrategy,
    pub final_behavior: FinalBehavior,
    pub type_step: StepSettings,
    pub erase_step: StepSettings,
}

/// `resume` tells a clearing phase whether another typing pass follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Typing,
    EndDelay { resume: bool },
    Clearing { resume: bool },
    Backspacing { resume: bool },
    StartDelay,
    Terminal(WalkOutcome),
}

/// Runs the loop described by `plan` over `fragment`.
///
/// `iteration` is bumped only when a typing pass completes on its own. A pass cut short
/// by cancellation or detachment doesn't count. `LoopCount::Finite(0)` returns right
/// away without touching the tree.
pub async fn run_loop<S: RenderSurface>(
    ctx: &OperationContext<'_, S>,
    fragment: &[ContentNode],
    plan: &LoopPlan,
    iteration: &AtomicU32,
) -> WalkOutcome {
    if plan.count == LoopCount::Finite(0) {
        return WalkOutcome::Completed;
    }

    let mut completed: u32 = 0;
    let mut phase = LoopPhase::Typing;

    loop {
        DEBUG_TYPEWRITER.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(message = "loop phase", phase = ?phase, completed = completed);
        });

        phase = match phase {
            LoopPhase::Typing => match reveal_content(ctx, fragment, plan.type_step).await {
                WalkOutcome::Completed => {
                    completed = completed.saturating_add(1);
                    iteration.store(completed, Ordering::Release);
                    if plan.count.has_more_after(completed) {
                        LoopPhase::EndDelay { resume: true }
                    } else if plan.final_behavior == FinalBehavior::Remove {
                        LoopPhase::EndDelay { resume: false }
                    } else {
                        LoopPhase::Terminal(WalkOutcome::Completed)
                    }
                }
                halt => LoopPhase::Terminal(halt),
            },

            LoopPhase::EndDelay { resume } => match ctx.delay(plan.end_delay).await {
                DelayOutcome::Elapsed => match plan.clear_strategy {
                    ClearStrategy::Clear => LoopPhase::Clearing { resume },
                    ClearStrategy::Backspace => LoopPhase::Backspacing { resume },
                },
                DelayOutcome::Cancelled => LoopPhase::Terminal(WalkOutcome::Cancelled),
            },

            LoopPhase::Clearing { resume } => match ctx.checkpoint() {
                Some(halt) => LoopPhase::Terminal(halt),
                None => {
                    ctx.with_stage(|stage| stage.clear_content(ctx.root));
                    after_clear(resume)
                }
            },

            LoopPhase::Backspacing { resume } => {
                match erase_content(ctx, EraseLimit::Unbounded, plan.erase_step).await {
                    EraseOutcome::Completed { .. } => after_clear(resume),
                    EraseOutcome::Cancelled => LoopPhase::Terminal(WalkOutcome::Cancelled),
                    EraseOutcome::Detached => LoopPhase::Terminal(WalkOutcome::Detached),
                }
            }

            LoopPhase::StartDelay => match ctx.delay(plan.start_delay).await {
                DelayOutcome::Elapsed => LoopPhase::Typing,
                DelayOutcome::Cancelled => LoopPhase::Terminal(WalkOutcome::Cancelled),
            },

            LoopPhase::Terminal(outcome) => return outcome,
        };
    }
}

fn after_clear(resume: bool) -> LoopPhase {
    if resume {
        LoopPhase::StartDelay
    } else {
        LoopPhase::Terminal(WalkOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CancellationToken, NodeId, OffscreenSurface, ScrollSettings, Stage,
                StdMutex, TimerRegistry, TokenId};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    struct Fixture {
        stage: StdMutex<Stage<OffscreenSurface>>,
        timers: TimerRegistry,
        token: CancellationToken,
        root: NodeId,
        iteration: AtomicU32,
    }

    impl Fixture {
        fn new() -> Self {
            let mut stage = Stage::new(OffscreenSurface::new());
            let body = stage.surface.document_root();
            let root = stage.surface.append_new_element(body, "div", None);
            Self {
                stage: StdMutex::new(stage),
                timers: TimerRegistry::new(),
                token: CancellationToken::new(TokenId(1)),
                root,
                iteration: AtomicU32::new(0),
            }
        }

        fn ctx(&self) -> OperationContext<'_, OffscreenSurface> {
            OperationContext {
                stage: &self.stage,
                timers: &self.timers,
                token: &self.token,
                root: self.root,
            }
        }

        fn plan(
            &self,
            count: LoopCount,
            clear_strategy: ClearStrategy,
            final_behavior: FinalBehavior,
        ) -> LoopPlan {
            let step = StepSettings {
                chunk_size: 1,
                delay: Duration::from_millis(10),
                scroll: ScrollSettings {
                    enabled: false,
                    interval: 1,
                    target: self.root,
                },
            };
            LoopPlan {
                count,
                start_delay: Duration::from_millis(30),
                end_delay: Duration::from_millis(80),
                clear_strategy,
                final_behavior,
                type_step: step,
                erase_step: step,
            }
        }

        fn text(&self) -> String { self.stage.lock().unwrap().visible_text(self.root) }
    }

    #[test_case(ClearStrategy::Clear, FinalBehavior::Keep, "AB")]
    #[test_case(ClearStrategy::Clear, FinalBehavior::Remove, "")]
    #[test_case(ClearStrategy::Backspace, FinalBehavior::Keep, "AB")]
    #[test_case(ClearStrategy::Backspace, FinalBehavior::Remove, "")]
    #[tokio::test(start_paused = true)]
    async fn test_finite_loop_final_state(
        clear_strategy: ClearStrategy,
        final_behavior: FinalBehavior,
        expected: &str,
    ) {
        let fixture = Fixture::new();
        let fragment = vec![ContentNode::text("AB")];
        let plan = fixture.plan(LoopCount::Finite(3), clear_strategy, final_behavior);

        let outcome = run_loop(&fixture.ctx(), &fragment, &plan, &fixture.iteration).await;

        assert_eq!(outcome, WalkOutcome::Completed);
        assert_eq!(fixture.iteration.load(Ordering::Acquire), 3);
        assert_eq!(fixture.text(), expected);
        assert!(fixture.timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_count_does_nothing() {
        let fixture = Fixture::new();
        let fragment = vec![ContentNode::text("AB")];
        let plan = fixture.plan(LoopCount::Finite(0), ClearStrategy::Clear, FinalBehavior::Keep);

        let start = tokio::time::Instant::now();
        let outcome = run_loop(&fixture.ctx(), &fragment, &plan, &fixture.iteration).await;

        assert_eq!(outcome, WalkOutcome::Completed);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(fixture.iteration.load(Ordering::Acquire), 0);
        assert_eq!(fixture.text(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_pass_is_not_counted() {
        let fixture = Fixture::new();
        let fragment = vec![ContentNode::text("AB")];
        let plan = fixture.plan(LoopCount::Infinite, ClearStrategy::Clear, FinalBehavior::Keep);

        // Pass 1 types A@0 B@10 and finishes @20, end delay to 100, clear, start delay
        // to 130, pass 2 types A@130. Cancel in the middle of pass 2.
        let ctx = fixture.ctx();
        let run = run_loop(&ctx, &fragment, &plan, &fixture.iteration);
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(135)).await;
            fixture.token.cancel();
        };
        let (outcome, ()) = tokio::join!(run, cancel);

        assert_eq!(outcome, WalkOutcome::Cancelled);
        assert_eq!(fixture.iteration.load(Ordering::Acquire), 1);
        assert_eq!(fixture.text(), "A");
        assert!(fixture.timers.is_empty());
    }
}

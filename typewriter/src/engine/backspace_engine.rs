// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Backspacing. The inverse of [`crate::reveal_content`]: removes trailing content from
//! the target tree, deepest and rightmost first, without ever leaving it malformed.
//!
//! ```text
//! <p>Hi <b>there</b>|</p>        (| is the caret marker)
//!        ▲ start here, walk children in reverse
//! <p>Hi <b>th|</b></p>           strip chunks off the trailing text node
//! <p>Hi |</p>                    <b> is empty, delete it, relocate the marker
//! ```

use futures_util::{FutureExt, future::BoxFuture};
use unicode_segmentation::UnicodeSegmentation;

use crate::{DEBUG_TYPEWRITER, DelayOutcome, NodeId, NodeKind, OperationContext,
            RenderSurface, StepSettings, WalkOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseLimit {
    /// Erase everything under the root (the loop's "clear via backspace").
    Unbounded,
    /// Erase at most this many graphemes.
    Chars(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseOutcome {
    Completed { removed: usize },
    Cancelled,
    Detached,
}

#[derive(Debug)]
struct EraseBudget {
    remaining: Option<usize>,
    removed: usize,
}

impl EraseBudget {
    fn new(limit: EraseLimit) -> Self {
        Self {
            remaining: match limit {
                EraseLimit::Unbounded => None,
                EraseLimit::Chars(count) => Some(count),
            },
            removed: 0,
        }
    }

    fn is_exhausted(&self) -> bool { self.remaining == Some(0) }

    /// How many of `wanted` graphemes may be removed right now.
    fn allowance(&self, wanted: usize) -> usize {
        self.remaining.map_or(wanted, |remaining| remaining.min(wanted))
    }

    fn consume(&mut self, count: usize) {
        self.removed += count;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(count);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    BudgetExhausted,
    Halt(WalkOutcome),
}

/// Erases trailing content under `ctx.root`, honoring `limit`.
///
/// - Each strip removes up to `settings.chunk_size` graphemes from the end of one text
///   node and is followed by one cancellable delay.
/// - A bounded erase stops exactly when its budget hits zero, possibly in the middle of
///   a text node. It never removes more than asked.
/// - Emptied text nodes and elements are deleted. The marker is moved along so it
///   always trails the remaining content.
pub async fn erase_content<S: RenderSurface>(
    ctx: &OperationContext<'_, S>,
    limit: EraseLimit,
    settings: StepSettings,
) -> EraseOutcome {
    let mut budget = EraseBudget::new(limit);

    if !budget.is_exhausted() {
        match erase_children(ctx, ctx.root, &mut budget, settings).await {
            Flow::Halt(WalkOutcome::Cancelled) => return EraseOutcome::Cancelled,
            Flow::Halt(WalkOutcome::Detached) => return EraseOutcome::Detached,
            Flow::Halt(WalkOutcome::Completed)
            | Flow::Continue
            | Flow::BudgetExhausted => {}
        }
    }

    ctx.with_stage(|stage| {
        stage.relocate_marker(ctx.root);
        stage.follow_scroll(settings.scroll);
    });

    DEBUG_TYPEWRITER.then(|| {
        tracing::debug!(message = "erase complete", removed = budget.removed);
    });

    EraseOutcome::Completed {
        removed: budget.removed,
    }
}

fn erase_children<'a, S: RenderSurface>(
    ctx: &'a OperationContext<'a, S>,
    node: NodeId,
    budget: &'a mut EraseBudget,
    settings: StepSettings,
) -> BoxFuture<'a, Flow> {
    async move {
        let children = ctx.with_stage(|stage| stage.surface.children(node));
        let mut flow = Flow::Continue;

        for child in children.into_iter().rev() {
            if let Some(halt) = ctx.checkpoint() {
                return Flow::Halt(halt);
            }
            if budget.is_exhausted() {
                flow = Flow::BudgetExhausted;
                break;
            }

            let kind = ctx.with_stage(|stage| {
                if stage.cursor.is_marker(child) {
                    None
                } else {
                    stage.surface.kind(child)
                }
            });

            flow = match kind {
                Some(NodeKind::Text) => erase_text_node(ctx, child, budget, settings).await,
                Some(NodeKind::Element) => {
                    let flow = erase_children(ctx, child, budget, settings).await;
                    if let Flow::Halt(_) = flow {
                        return flow;
                    }
                    ctx.with_stage(|stage| stage.remove_if_empty(child, ctx.root));
                    flow
                }
                None => continue,
            };

            match flow {
                Flow::Continue => {}
                Flow::BudgetExhausted => break,
                Flow::Halt(_) => return flow,
            }
        }

        ctx.with_stage(|stage| stage.sweep_empty_text(node));
        flow
    }
    .boxed()
}

async fn erase_text_node<S: RenderSurface>(
    ctx: &OperationContext<'_, S>,
    node: NodeId,
    budget: &mut EraseBudget,
    settings: StepSettings,
) -> Flow {
    // The caret trails whatever is being erased.
    ctx.with_stage(|stage| {
        if let Some(parent) = stage.surface.parent(node) {
            stage.place_marker_at_end(parent);
        }
    });

    loop {
        if let Some(halt) = ctx.checkpoint() {
            return Flow::Halt(halt);
        }

        let allowance = budget.allowance(settings.chunk_size.max(1));
        let strip = ctx.with_stage(|stage| {
            let text = stage.surface.text(node).unwrap_or_default();
            let graphemes: Vec<&str> = text.graphemes(true).collect();
            if graphemes.is_empty() {
                stage.surface.delete_node(node);
                return None;
            }

            let count = allowance.min(graphemes.len());
            let kept = graphemes[..graphemes.len() - count].concat();
            let is_now_empty = kept.is_empty();
            if is_now_empty {
                stage.surface.delete_node(node);
            } else {
                stage.surface.set_text(node, &kept);
            }
            stage.scroll_on_flush(settings.scroll);
            Some((count, is_now_empty))
        });

        let Some((count, is_now_empty)) = strip else {
            return Flow::Continue;
        };
        budget.consume(count);

        if ctx.delay(settings.delay).await == DelayOutcome::Cancelled {
            return Flow::Halt(WalkOutcome::Cancelled);
        }

        if budget.is_exhausted() {
            return Flow::BudgetExhausted;
        }
        if is_now_empty {
            return Flow::Continue;
        }
    }
}

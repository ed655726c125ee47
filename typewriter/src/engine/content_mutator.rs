// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Typing. Walks a [`ContentNode`] fragment in pre-order and grows the target tree one
//! chunk at a time, so that at every suspension point the target holds a prefix of the
//! full rendering.

use unicode_segmentation::UnicodeSegmentation;

use crate::{ContentNode, DEBUG_TYPEWRITER, DelayOutcome, NodeId, OperationContext,
            RenderSurface, StepSettings, WalkOutcome};

/// Reveals `fragment` under `ctx.root`.
///
/// Each text run is split into chunks of `settings.chunk_size` graphemes (the last one
/// may be shorter). Every chunk is one flush, followed by one cancellable delay. So a
/// run of `n` graphemes takes `ceil(n / chunk_size)` flushes. Elements are created
/// empty (with their attributes) as soon as the walk reaches them.
///
/// Cancellation and detachment are checked before each flush and before entering each
/// node. Neither is an error: the walk just stops and reports why.
pub async fn reveal_content<S: RenderSurface>(
    ctx: &OperationContext<'_, S>,
    fragment: &[ContentNode],
    settings: StepSettings,
) -> WalkOutcome {
    let mut stack: Vec<(&ContentNode, NodeId)> =
        fragment.iter().rev().map(|node| (node, ctx.root)).collect();

    while let Some((node, parent)) = stack.pop() {
        if let Some(halt) = ctx.checkpoint() {
            return halt;
        }

        match node {
            ContentNode::TextRun(text) => {
                let outcome = reveal_text_run(ctx, parent, text, settings).await;
                if outcome != WalkOutcome::Completed {
                    return outcome;
                }
            }
            ContentNode::Element {
                tag,
                attributes,
                children,
            } => {
                let element =
                    ctx.with_stage(|stage| stage.append_element(parent, tag, attributes));
                stack.extend(children.iter().rev().map(|child| (child, element)));
            }
        }
    }

    // Catch up on flushes that didn't add up to a full scroll interval.
    ctx.with_stage(|stage| stage.follow_scroll(settings.scroll));

    DEBUG_TYPEWRITER.then(|| {
        tracing::debug!(message = "reveal complete", root = %ctx.root);
    });

    WalkOutcome::Completed
}

async fn reveal_text_run<S: RenderSurface>(
    ctx: &OperationContext<'_, S>,
    parent: NodeId,
    text: &str,
    settings: StepSettings,
) -> WalkOutcome {
    let graphemes: Vec<&str> = text.graphemes(true).collect();

    for chunk in graphemes.chunks(settings.chunk_size.max(1)) {
        if let Some(halt) = ctx.checkpoint() {
            return halt;
        }

        ctx.with_stage(|stage| {
            stage.flush_text(parent, &chunk.concat());
            stage.scroll_on_flush(settings.scroll);
        });

        if ctx.delay(settings.delay).await == DelayOutcome::Cancelled {
            return WalkOutcome::Cancelled;
        }
    }

    WalkOutcome::Completed
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{NodeId, RenderSurface};

/// How close (in surface units) to the bottom edge a user scroll must land for
/// auto-follow to resume.
pub const DEFAULT_BOTTOM_TOLERANCE: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    pub enabled: bool,
    /// Follow every `interval` flushes. Never 0.
    pub interval: usize,
    /// The content root, or a separate scroll container.
    pub target: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDecision {
    Disabled,
    NotDue,
    NoOverflow,
    Suspended,
    Followed { offset: usize },
}

/// Keeps the newest content in view, unless the user scrolled away from the bottom.
/// Lives across operations, since a user scroll outlives any one of them.
#[derive(Debug)]
pub struct ScrollPolicy {
    is_following: bool,
    flushes_since_scroll: usize,
    bottom_tolerance: usize,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            is_following: true,
            flushes_since_scroll: 0,
            bottom_tolerance: DEFAULT_BOTTOM_TOLERANCE,
        }
    }
}

impl ScrollPolicy {
    #[must_use]
    pub fn is_following(&self) -> bool { self.is_following }

    pub fn reset_counter(&mut self) { self.flushes_since_scroll = 0; }

    /// Counts one flush, and follows once `interval` flushes have accumulated.
    pub fn on_flush(
        &mut self,
        surface: &mut impl RenderSurface,
        settings: ScrollSettings,
    ) -> ScrollDecision {
        if !settings.enabled {
            return ScrollDecision::Disabled;
        }
        self.flushes_since_scroll += 1;
        if self.flushes_since_scroll < settings.interval.max(1) {
            return ScrollDecision::NotDue;
        }
        self.flushes_since_scroll = 0;
        self.follow(surface, settings)
    }

    /// Scrolls `settings.target` to the bottom right now, if allowed.
    pub fn follow(
        &mut self,
        surface: &mut impl RenderSurface,
        settings: ScrollSettings,
    ) -> ScrollDecision {
        if !settings.enabled {
            return ScrollDecision::Disabled;
        }

        if let Some(user_offset) = surface.take_user_scroll(settings.target) {
            let max_offset = surface.scroll_extents(settings.target).max_offset();
            self.is_following = user_offset + self.bottom_tolerance >= max_offset;
        }

        let extents = surface.scroll_extents(settings.target);
        if !extents.overflows() {
            return ScrollDecision::NoOverflow;
        }
        if !self.is_following {
            return ScrollDecision::Suspended;
        }

        let offset = extents.max_offset();
        surface.set_scroll_offset(settings.target, offset);
        ScrollDecision::Followed { offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OffscreenSurface;
    use pretty_assertions::assert_eq;

    fn overflowing_surface(lines: usize) -> (OffscreenSurface, NodeId) {
        let mut surface = OffscreenSurface::new();
        let root = surface.document_root();
        let div = surface.append_new_element(root, "div", None);
        let text = surface.create_text(&vec!["line"; lines].join("\n"));
        surface.append_child(div, text);
        surface.set_viewport_extent(div, Some(3));
        (surface, div)
    }

    fn settings(target: NodeId, interval: usize) -> ScrollSettings {
        ScrollSettings {
            enabled: true,
            interval,
            target,
        }
    }

    #[test]
    fn test_no_overflow_skips() {
        let (mut surface, div) = overflowing_surface(2);
        let mut policy = ScrollPolicy::default();
        assert_eq!(
            policy.follow(&mut surface, settings(div, 1)),
            ScrollDecision::NoOverflow
        );
    }

    #[test]
    fn test_follows_every_interval() {
        let (mut surface, div) = overflowing_surface(10);
        let mut policy = ScrollPolicy::default();
        let settings = settings(div, 2);

        assert_eq!(policy.on_flush(&mut surface, settings), ScrollDecision::NotDue);
        assert_eq!(
            policy.on_flush(&mut surface, settings),
            ScrollDecision::Followed { offset: 7 }
        );
        assert_eq!(surface.scroll_offset(div), 7);
    }

    #[test]
    fn test_user_scroll_suspends_then_resumes() {
        let (mut surface, div) = overflowing_surface(10);
        let mut policy = ScrollPolicy::default();
        let settings = settings(div, 1);

        surface.user_scroll_to(div, 0);
        assert_eq!(policy.follow(&mut surface, settings), ScrollDecision::Suspended);
        assert!(!policy.is_following());
        assert_eq!(surface.scroll_offset(div), 0);

        // Within tolerance of the bottom.
        surface.user_scroll_to(div, 6);
        assert_eq!(
            policy.follow(&mut surface, settings),
            ScrollDecision::Followed { offset: 7 }
        );
        assert!(policy.is_following());
    }

    #[test]
    fn test_disabled() {
        let (mut surface, div) = overflowing_surface(10);
        let mut policy = ScrollPolicy::default();
        let settings = ScrollSettings {
            enabled: false,
            ..settings(div, 1)
        };
        assert_eq!(policy.on_flush(&mut surface, settings), ScrollDecision::Disabled);
        assert_eq!(surface.scroll_offset(div), 0);
    }
}

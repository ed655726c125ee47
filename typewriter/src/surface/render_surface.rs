// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The [`RenderSurface`] trait is the only way the engine touches the outside world. Any
//! tree of elements and text nodes (a DOM, a terminal widget tree, the
//! [`crate::OffscreenSurface`] used in tests) can sit behind it.

use serde::{Deserialize, Serialize};

/// Opaque handle to a node owned by a [`RenderSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
}

/// Scroll geometry along the single axis the engine follows. Units are up to the
/// surface (lines, pixels, rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollExtents {
    pub content_extent: usize,
    pub viewport_extent: usize,
}

impl ScrollExtents {
    #[must_use]
    pub fn overflows(&self) -> bool { self.content_extent > self.viewport_extent }

    /// The offset that shows the bottom of the content.
    #[must_use]
    pub fn max_offset(&self) -> usize {
        self.content_extent.saturating_sub(self.viewport_extent)
    }
}

/// Mutable tree of element and text nodes, plus the scroll hooks the engine needs.
///
/// Implementations must keep these rules:
/// - [`append_child`](Self::append_child) on a node that already has a parent moves it.
/// - [`remove_child`](Self::remove_child) detaches but keeps the node alive so it can be
///   appended again. [`delete_node`](Self::delete_node) detaches and frees the subtree.
/// - Queries on unknown nodes return empty values, they never panic.
pub trait RenderSurface: Send + 'static {
    fn document_root(&self) -> NodeId;

    fn create_element(&mut self, tag: &str) -> NodeId;

    fn create_text(&mut self, text: &str) -> NodeId;

    /// # Errors
    ///
    /// Returns an error if the surface rejects the attribute (eg: an invalid name). The
    /// engine logs and skips such attributes.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str)
    -> miette::Result<()>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn append_child(&mut self, parent: NodeId, child: NodeId);

    fn remove_child(&mut self, parent: NodeId, child: NodeId);

    fn delete_node(&mut self, node: NodeId);

    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn text(&self, node: NodeId) -> Option<String>;

    fn set_text(&mut self, node: NodeId, text: &str);

    /// Whether `node` is reachable from [`document_root`](Self::document_root).
    fn is_connected(&self, node: NodeId) -> bool;

    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    fn scroll_offset(&self, node: NodeId) -> usize;

    fn set_scroll_offset(&mut self, node: NodeId, offset: usize);

    fn scroll_extents(&self, node: NodeId) -> ScrollExtents;

    /// Returns the latest offset the user scrolled `node` to since the last call, and
    /// clears it.
    fn take_user_scroll(&mut self, node: NodeId) -> Option<usize>;

    /// Registers a global style sheet once. Returns `false` if `style_id` was already
    /// registered.
    fn register_style(&mut self, style_id: &str, rules: &str) -> bool;

    /// Whether `node` is `ancestor` or sits below it.
    fn is_inclusive_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(it) = current {
            if it == ancestor {
                return true;
            }
            current = self.parent(it);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_extents_overflow() {
        let fits = ScrollExtents {
            content_extent: 3,
            viewport_extent: 5,
        };
        assert!(!fits.overflows());
        assert_eq!(fits.max_offset(), 0);

        let overflows = ScrollExtents {
            content_extent: 12,
            viewport_extent: 5,
        };
        assert!(overflows.overflows());
        assert_eq!(overflows.max_offset(), 7);
    }
}

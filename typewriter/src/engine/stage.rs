// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! [`Stage`] bundles the render surface with the state that has to change in lock step
//! with it: the caret marker and the scroll policy. All tree edits made by the engine
//! go through here.

use unicode_segmentation::UnicodeSegmentation;

use crate::{Attributes, CursorManager, NodeId, NodeKind, RenderSurface, ScrollDecision,
            ScrollPolicy, ScrollSettings};

#[derive(Debug)]
pub struct Stage<S> {
    pub surface: S,
    pub cursor: CursorManager,
    pub scroll: ScrollPolicy,
}

impl<S: RenderSurface> Stage<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            cursor: CursorManager::default(),
            scroll: ScrollPolicy::default(),
        }
    }

    #[must_use]
    pub fn is_connected(&self, root: NodeId) -> bool { self.surface.is_connected(root) }

    pub fn place_marker_at_end(&mut self, parent: NodeId) {
        self.cursor.place_at_end(&mut self.surface, parent);
    }

    /// Creates an element with `attributes`, appends it to `parent`, and moves the marker
    /// right after it. Attributes the surface rejects are skipped.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &Attributes,
    ) -> NodeId {
        let element = self.surface.create_element(tag);
        for attribute in attributes {
            if let Err(error) =
                self.surface
                    .set_attribute(element, &attribute.name, &attribute.value)
            {
                // % is Display, ? is Debug.
                tracing::warn!(
                    message = "Skipping attribute that could not be copied",
                    tag = %tag,
                    attribute = %attribute.name,
                    error = ?error
                );
            }
        }

        self.cursor.detach(&mut self.surface);
        self.surface.append_child(parent, element);
        self.cursor.place_at_end(&mut self.surface, parent);

        element
    }

    /// Appends `text` to `parent`, merging into the trailing text node if there is one,
    /// then moves the marker to the end of `parent`.
    pub fn flush_text(&mut self, parent: NodeId, text: &str) {
        self.cursor.detach(&mut self.surface);

        let trailing_text = self
            .surface
            .children(parent)
            .last()
            .copied()
            .filter(|last| self.surface.kind(*last) == Some(NodeKind::Text));

        match trailing_text {
            Some(node) => {
                let mut merged = self.surface.text(node).unwrap_or_default();
                merged.push_str(text);
                self.surface.set_text(node, &merged);
            }
            None => {
                let node = self.surface.create_text(text);
                self.surface.append_child(parent, node);
            }
        }

        self.cursor.place_at_end(&mut self.surface, parent);
    }

    /// Deletes every child of `root` except the marker, which ends up as the only child.
    pub fn clear_content(&mut self, root: NodeId) {
        for child in self.surface.children(root) {
            if !self.cursor.is_marker(child) {
                self.surface.delete_node(child);
            }
        }
        self.cursor.place_at_end(&mut self.surface, root);
    }

    /// Deletes `element` if it holds no text (marker excluded), then moves the marker
    /// after the last node left under `root`. Returns whether it was deleted.
    pub fn remove_if_empty(&mut self, element: NodeId, root: NodeId) -> bool {
        if !self.is_empty_excluding_marker(element) {
            return false;
        }
        if self.cursor.is_inside(&self.surface, element) {
            self.cursor.detach(&mut self.surface);
        }
        self.surface.delete_node(element);
        self.relocate_marker(root);
        true
    }

    /// Deletes the empty text nodes directly under `parent`.
    pub fn sweep_empty_text(&mut self, parent: NodeId) {
        for child in self.surface.children(parent) {
            let is_empty_text = self.surface.kind(child) == Some(NodeKind::Text)
                && self.surface.text(child).is_some_and(|it| it.is_empty());
            if is_empty_text {
                self.surface.delete_node(child);
            }
        }
    }

    /// Puts the marker right after the last node under `root` in document order (empty
    /// text excluded), or at the end of `root` when it holds nothing else.
    pub fn relocate_marker(&mut self, root: NodeId) {
        let parent = self
            .walk_excluding_marker(root)
            .into_iter()
            .skip(1)
            .rev()
            .find(|node| self.surface.text(*node).is_none_or(|it| !it.is_empty()))
            .and_then(|node| self.surface.parent(node))
            .unwrap_or(root);
        self.cursor.place_at_end(&mut self.surface, parent);
    }

    #[must_use]
    pub fn visible_text(&self, root: NodeId) -> String {
        self.walk_excluding_marker(root)
            .into_iter()
            .filter_map(|node| self.surface.text(node))
            .collect()
    }

    /// Grapheme count under `node`, marker excluded.
    #[must_use]
    pub fn char_len_excluding_marker(&self, node: NodeId) -> usize {
        self.walk_excluding_marker(node)
            .into_iter()
            .filter_map(|node| self.surface.text(node))
            .map(|text| text.graphemes(true).count())
            .sum()
    }

    #[must_use]
    pub fn is_empty_excluding_marker(&self, node: NodeId) -> bool {
        self.char_len_excluding_marker(node) == 0
    }

    pub fn scroll_on_flush(&mut self, settings: ScrollSettings) -> ScrollDecision {
        self.scroll.on_flush(&mut self.surface, settings)
    }

    pub fn follow_scroll(&mut self, settings: ScrollSettings) -> ScrollDecision {
        self.scroll.follow(&mut self.surface, settings)
    }

    /// Pre-order walk of `node`, skipping the marker's subtree.
    fn walk_excluding_marker(&self, node: NodeId) -> Vec<NodeId> {
        let mut collected_nodes = vec![];
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if self.cursor.is_marker(current) {
                continue;
            }
            collected_nodes.push(current);
            stack.extend(self.surface.children(current).into_iter().rev());
        }
        collected_nodes
    }
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! In-memory [`RenderSurface`]. Scroll geometry is line based: the content extent of an
//! element is the number of lines in its text content, and the viewport extent is set by
//! the caller with [`OffscreenSurface::set_viewport_extent`].

use std::fmt::Write as _;

use super::node_arena::NodeArena;
use crate::{NodeId, NodeKind, RenderSurface, ScrollExtents, escape_attribute_value,
            escape_text, is_void_element};

#[derive(Debug, Clone)]
pub enum SurfaceNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        scroll: ScrollState,
    },
    Text(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    pub offset: usize,
    /// `None` means the element grows with its content and never overflows.
    pub viewport_extent: Option<usize>,
    pub pending_user_scroll: Option<usize>,
}

#[derive(Debug)]
pub struct OffscreenSurface {
    arena: NodeArena<SurfaceNode>,
    document_root: NodeId,
    styles: Vec<(String, String)>,
}

impl Default for OffscreenSurface {
    fn default() -> Self { Self::new() }
}

impl OffscreenSurface {
    #[must_use]
    pub fn new() -> Self {
        let mut arena = NodeArena::new();
        let document_root = arena.add_new_node(SurfaceNode::Element {
            tag: "body".to_string(),
            attributes: vec![],
            scroll: ScrollState::default(),
        });
        Self {
            arena,
            document_root,
            styles: vec![],
        }
    }

    /// Creates an element, gives it an `id` attribute when provided, and appends it to
    /// `parent`.
    pub fn append_new_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        id: Option<&str>,
    ) -> NodeId {
        let node = self.create_element(tag);
        if let Some(id) = id {
            self.set_attr_unchecked(node, "id", id);
        }
        self.append_child(parent, node);
        node
    }

    pub fn set_viewport_extent(&mut self, node: NodeId, extent: Option<usize>) {
        if let Some(scroll) = self.scroll_state_mut(node) {
            scroll.viewport_extent = extent;
        }
    }

    /// Simulates the user dragging the scrollbar of `node`.
    pub fn user_scroll_to(&mut self, node: NodeId, offset: usize) {
        let max_offset = self.scroll_extents(node).max_offset();
        if let Some(scroll) = self.scroll_state_mut(node) {
            scroll.offset = offset.min(max_offset);
            scroll.pending_user_scroll = Some(scroll.offset);
        }
    }

    /// Concatenated text of every text node under `node`, in document order.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut acc = String::new();
        for id in self.arena.tree_walk_dfs(node).unwrap_or_default() {
            if let Some(SurfaceNode::Text(text)) = self.payload(id) {
                acc.push_str(text);
            }
        }
        acc
    }

    /// Pre-order ids of `node` and everything under it.
    #[must_use]
    pub fn tree_walk(&self, node: NodeId) -> Vec<NodeId> {
        self.arena.tree_walk_dfs(node).unwrap_or_default()
    }

    /// Serializes the children of `node` as markup, eg: `Hi <b>there</b>`.
    #[must_use]
    pub fn render_markup(&self, node: NodeId) -> String {
        let mut acc = String::new();
        for child in self.arena.get_children_of(node) {
            self.write_markup(child, &mut acc);
        }
        acc
    }

    #[must_use]
    pub fn registered_styles(&self) -> &[(String, String)] { &self.styles }

    /// Live nodes, attached or not. Useful to check that nothing leaks.
    #[must_use]
    pub fn node_count(&self) -> usize { self.arena.len() }

    fn write_markup(&self, node: NodeId, acc: &mut String) {
        match self.payload(node) {
            Some(SurfaceNode::Text(text)) => acc.push_str(&escape_text(text)),
            Some(SurfaceNode::Element {
                tag, attributes, ..
            }) => {
                acc.push('<');
                acc.push_str(tag);
                for (name, value) in attributes {
                    // We don't care about the result of this operation.
                    write!(acc, " {name}=\"{}\"", escape_attribute_value(value)).ok();
                }
                acc.push('>');
                if is_void_element(tag) {
                    return;
                }
                for child in self.arena.get_children_of(node) {
                    self.write_markup(child, acc);
                }
                // We don't care about the result of this operation.
                write!(acc, "</{tag}>").ok();
            }
            None => {}
        }
    }

    fn payload(&self, node: NodeId) -> Option<&SurfaceNode> {
        self.arena.get_node(node).map(|it| &it.payload)
    }

    fn scroll_state(&self, node: NodeId) -> Option<&ScrollState> {
        match self.payload(node) {
            Some(SurfaceNode::Element { scroll, .. }) => Some(scroll),
            _ => None,
        }
    }

    fn scroll_state_mut(&mut self, node: NodeId) -> Option<&mut ScrollState> {
        match self.arena.get_node_mut(node).map(|it| &mut it.payload) {
            Some(SurfaceNode::Element { scroll, .. }) => Some(scroll),
            _ => None,
        }
    }

    fn set_attr_unchecked(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(SurfaceNode::Element { attributes, .. }) =
            self.arena.get_node_mut(node).map(|it| &mut it.payload)
        else {
            return false;
        };
        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
        true
    }
}

fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|ch| {
            ch.is_whitespace()
                || ch.is_control()
                || matches!(ch, '"' | '\'' | '<' | '>' | '/' | '=')
        })
}

impl RenderSurface for OffscreenSurface {
    fn document_root(&self) -> NodeId { self.document_root }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.arena.add_new_node(SurfaceNode::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: vec![],
            scroll: ScrollState::default(),
        })
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.arena.add_new_node(SurfaceNode::Text(text.to_string()))
    }

    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> miette::Result<()> {
        if !is_valid_attribute_name(name) {
            miette::bail!("Invalid attribute name {name:?}");
        }
        if !self.set_attr_unchecked(node, name, value) {
            miette::bail!("Node {node} is not an element");
        }
        Ok(())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match self.payload(node) {
            Some(SurfaceNode::Element { attributes, .. }) => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
            _ => None,
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if matches!(self.payload(parent), Some(SurfaceNode::Element { .. })) {
            self.arena.attach(parent, child);
        }
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.arena.get_parent_of(child) == Some(parent) {
            self.arena.detach(child);
        }
    }

    fn delete_node(&mut self, node: NodeId) {
        if node != self.document_root {
            self.arena.delete_node(node);
        }
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.payload(node).map(|it| match it {
            SurfaceNode::Element { .. } => NodeKind::Element,
            SurfaceNode::Text(_) => NodeKind::Text,
        })
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        match self.payload(node) {
            Some(SurfaceNode::Element { tag, .. }) => Some(tag.clone()),
            _ => None,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> { self.arena.get_parent_of(node) }

    fn children(&self, node: NodeId) -> Vec<NodeId> { self.arena.get_children_of(node) }

    fn text(&self, node: NodeId) -> Option<String> {
        match self.payload(node) {
            Some(SurfaceNode::Text(text)) => Some(text.clone()),
            _ => None,
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(SurfaceNode::Text(existing)) =
            self.arena.get_node_mut(node).map(|it| &mut it.payload)
        {
            text.clone_into(existing);
        }
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.arena.node_exists(node)
            && (node == self.document_root || self.arena.is_ancestor(self.document_root, node))
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.arena
            .tree_walk_dfs(self.document_root)
            .unwrap_or_default()
            .into_iter()
            .find(|node| self.attribute(*node, "id").as_deref() == Some(id))
    }

    fn scroll_offset(&self, node: NodeId) -> usize {
        self.scroll_state(node).map_or(0, |it| it.offset)
    }

    fn set_scroll_offset(&mut self, node: NodeId, offset: usize) {
        let max_offset = self.scroll_extents(node).max_offset();
        if let Some(scroll) = self.scroll_state_mut(node) {
            scroll.offset = offset.min(max_offset);
        }
    }

    fn scroll_extents(&self, node: NodeId) -> ScrollExtents {
        let text = self.text_content(node);
        let content_extent = if text.is_empty() {
            0
        } else {
            text.matches('\n').count() + 1
        };
        let viewport_extent = self
            .scroll_state(node)
            .and_then(|it| it.viewport_extent)
            .unwrap_or(content_extent);
        ScrollExtents {
            content_extent,
            viewport_extent,
        }
    }

    fn take_user_scroll(&mut self, node: NodeId) -> Option<usize> {
        self.scroll_state_mut(node)
            .and_then(|it| it.pending_user_scroll.take())
    }

    fn register_style(&mut self, style_id: &str, rules: &str) -> bool {
        if self.styles.iter().any(|(id, _)| id == style_id) {
            return false;
        }
        self.styles.push((style_id.to_string(), rules.to_string()));
        true
    }
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{NodeId, RenderSurface};

pub const CURSOR_CLASS_NAME: &str = "r3bl-typewriter-cursor";
pub const CURSOR_DATA_ATTRIBUTE: &str = "data-typewriter-cursor";
pub const CURSOR_STYLE_ID: &str = "r3bl-typewriter-cursor-style";
pub const CURSOR_STYLE_RULES: &str = "\
.r3bl-typewriter-cursor { display: inline-block; \
animation: r3bl-typewriter-blink 1s step-end infinite; }
@keyframes r3bl-typewriter-blink { 50% { opacity: 0; } }";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CursorMarker {
    element: NodeId,
    caret_text: NodeId,
}

/// Owns the caret marker: a `span` element holding the caret character.
///
/// The marker is never content. It's skipped by every length, emptiness and text
/// query in [`crate::Stage`]. Moving it always goes detach-then-append, so it never has
/// two parents.
#[derive(Debug, Default)]
pub struct CursorManager {
    marker: Option<CursorMarker>,
}

impl CursorManager {
    #[must_use]
    pub fn marker(&self) -> Option<NodeId> { self.marker.map(|it| it.element) }

    #[must_use]
    pub fn is_marker(&self, node: NodeId) -> bool { self.marker() == Some(node) }

    /// Called at the start of every operation. Creates the marker lazily when `show`
    /// is set (refreshing the caret character if it already exists), or releases it.
    pub fn prepare(&mut self, surface: &mut impl RenderSurface, show: bool, caret: &str) {
        if !show {
            self.release(surface);
            return;
        }
        match self.marker {
            Some(marker) if surface.kind(marker.element).is_some() => {
                surface.set_text(marker.caret_text, caret);
            }
            _ => self.marker = Some(create_marker(surface, caret)),
        }
    }

    pub fn detach(&self, surface: &mut impl RenderSurface) {
        let Some(marker) = self.marker else {
            return;
        };
        if let Some(parent) = surface.parent(marker.element) {
            surface.remove_child(parent, marker.element);
        }
    }

    /// Makes the marker the last child of `parent`.
    pub fn place_at_end(&self, surface: &mut impl RenderSurface, parent: NodeId) {
        let Some(marker) = self.marker else {
            return;
        };
        self.detach(surface);
        surface.append_child(parent, marker.element);
    }

    /// Whether the marker sits somewhere under `ancestor` (or is it).
    #[must_use]
    pub fn is_inside(&self, surface: &impl RenderSurface, ancestor: NodeId) -> bool {
        self.marker()
            .is_some_and(|marker| surface.is_inclusive_descendant(marker, ancestor))
    }

    /// Removes the marker from the tree and frees it. A later [`Self::prepare`] creates
    /// a fresh one.
    pub fn release(&mut self, surface: &mut impl RenderSurface) {
        if let Some(marker) = self.marker.take() {
            surface.delete_node(marker.element);
        }
    }
}

fn create_marker(surface: &mut impl RenderSurface, caret: &str) -> CursorMarker {
    surface.register_style(CURSOR_STYLE_ID, CURSOR_STYLE_RULES);

    let element = surface.create_element("span");
    for (name, value) in [("class", CURSOR_CLASS_NAME), (CURSOR_DATA_ATTRIBUTE, "true")] {
        if let Err(error) = surface.set_attribute(element, name, value) {
            // % is Display, ? is Debug.
            tracing::warn!(
                message = "Could not set cursor attribute",
                attribute = %name,
                error = ?error
            );
        }
    }

    let caret_text = surface.create_text(caret);
    surface.append_child(element, caret_text);

    CursorMarker {
        element,
        caret_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OffscreenSurface;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prepare_creates_marker_once_and_refreshes_caret() {
        let mut surface = OffscreenSurface::new();
        let root = surface.document_root();
        let mut cursor = CursorManager::default();

        cursor.prepare(&mut surface, true, "|");
        let marker = cursor.marker().unwrap();
        cursor.place_at_end(&mut surface, root);
        assert_eq!(
            surface.render_markup(root),
            r#"<span class="r3bl-typewriter-cursor" data-typewriter-cursor="true">|</span>"#
        );

        cursor.prepare(&mut surface, true, "_");
        assert_eq!(cursor.marker(), Some(marker));
        assert_eq!(surface.text_content(root), "_");
        assert_eq!(surface.registered_styles().len(), 1);
    }

    #[test]
    fn test_place_at_end_moves_marker() {
        let mut surface = OffscreenSurface::new();
        let root = surface.document_root();
        let a = surface.append_new_element(root, "p", None);
        let b = surface.append_new_element(root, "p", None);
        let mut cursor = CursorManager::default();
        cursor.prepare(&mut surface, true, "|");

        cursor.place_at_end(&mut surface, a);
        assert!(cursor.is_inside(&surface, a));

        cursor.place_at_end(&mut surface, b);
        assert!(!cursor.is_inside(&surface, a));
        assert!(cursor.is_inside(&surface, b));
        assert_eq!(surface.children(a), vec![]);
    }

    #[test]
    fn test_hidden_cursor_is_released() {
        let mut surface = OffscreenSurface::new();
        let root = surface.document_root();
        let mut cursor = CursorManager::default();
        cursor.prepare(&mut surface, true, "|");
        cursor.place_at_end(&mut surface, root);

        cursor.prepare(&mut surface, false, "|");

        assert_eq!(cursor.marker(), None);
        assert_eq!(surface.children(root), vec![]);
        assert_eq!(surface.node_count(), 1);
    }
}

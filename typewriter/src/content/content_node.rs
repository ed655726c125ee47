// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use smallvec::SmallVec;
use unicode_segmentation::UnicodeSegmentation;

/// Most elements carry few attributes, so they're kept inline.
pub type Attributes = SmallVec<[Attribute; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Immutable description of what to reveal. Built once per operation by the
/// [`crate::ContentPipeline`], then walked by the mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNode {
    TextRun(String),
    Element {
        tag: String,
        attributes: Attributes,
        children: Vec<ContentNode>,
    },
}

impl ContentNode {
    pub fn text(text: impl Into<String>) -> Self { Self::TextRun(text.into()) }

    pub fn element(
        tag: impl Into<String>,
        attributes: impl IntoIterator<Item = Attribute>,
        children: Vec<ContentNode>,
    ) -> Self {
        Self::Element {
            tag: tag.into(),
            attributes: attributes.into_iter().collect(),
            children,
        }
    }

    /// Number of user-perceived characters (grapheme clusters) in the subtree.
    #[must_use]
    pub fn char_len(&self) -> usize {
        match self {
            Self::TextRun(text) => char_len(text),
            Self::Element { children, .. } => children.iter().map(Self::char_len).sum(),
        }
    }

    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut acc = String::new();
        self.push_plain_text(&mut acc);
        acc
    }

    fn push_plain_text(&self, acc: &mut String) {
        match self {
            Self::TextRun(text) => acc.push_str(text),
            Self::Element { children, .. } => {
                for child in children {
                    child.push_plain_text(acc);
                }
            }
        }
    }
}

/// Grapheme cluster count. This is the unit for chunking, budgets and lengths.
#[must_use]
pub fn char_len(text: &str) -> usize { text.graphemes(true).count() }

/// Total [`char_len`] of a fragment.
#[must_use]
pub fn fragment_char_len(fragment: &[ContentNode]) -> usize {
    fragment.iter().map(ContentNode::char_len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_char_len_counts_graphemes() {
        assert_eq!(char_len("abc"), 3);
        assert_eq!(char_len("e\u{301}"), 1);
        assert_eq!(char_len("👨‍👩‍👧"), 1);
        assert_eq!(char_len(""), 0);
    }

    #[test]
    fn test_element_len_and_plain_text() {
        let node = ContentNode::element(
            "p",
            [Attribute::new("class", "x")],
            vec![
                ContentNode::text("Hi "),
                ContentNode::element("b", [], vec![ContentNode::text("you")]),
            ],
        );
        assert_eq!(node.char_len(), 6);
        assert_eq!(node.plain_text(), "Hi you");
    }
}

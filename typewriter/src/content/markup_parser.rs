// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::ops::Deref;

use ego_tree::NodeRef;
use scraper::{Html, Node};

use crate::{Attribute, Attributes, ContentNode, TypewriterResult};

/// Turns (already sanitized) markup into a [`ContentNode`] fragment.
pub trait MarkupParser: Send + Sync {
    /// # Errors
    ///
    /// Returns [`crate::TypewriterError::ContentParse`] if the markup can't be parsed.
    fn parse(&self, markup: &str) -> TypewriterResult<Vec<ContentNode>>;
}

/// [`MarkupParser`] backed by `scraper` (html5ever) fragment parsing. Parsing is lenient,
/// so malformed markup is repaired rather than rejected.
///
/// - Comments, doctypes and processing instructions are dropped.
/// - Whitespace-only text runs that span a line break are dropped, so indentation
///   between tags is never typed out. A lone space between inline tags is kept.
/// - Attributes are ordered by name.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlMarkupParser;

impl MarkupParser for HtmlMarkupParser {
    fn parse(&self, markup: &str) -> TypewriterResult<Vec<ContentNode>> {
        let fragment = Html::parse_fragment(markup);
        let mut acc = vec![];
        // The fragment root is a synthetic `<html>` element.
        convert_children(*fragment.root_element(), &mut acc);
        Ok(acc)
    }
}

fn convert_children(parent: NodeRef<'_, Node>, acc: &mut Vec<ContentNode>) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.deref();
                if is_layout_whitespace(text) {
                    continue;
                }
                // html5ever can split a run in two, merge them back.
                if let Some(ContentNode::TextRun(last)) = acc.last_mut() {
                    last.push_str(text);
                } else {
                    acc.push(ContentNode::text(text));
                }
            }
            Node::Element(element) => {
                let mut attributes: Attributes = element
                    .attrs()
                    .map(|(name, value)| Attribute::new(name, value))
                    .collect();
                attributes.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));

                let mut children = vec![];
                convert_children(child, &mut children);

                acc.push(ContentNode::Element {
                    tag: element.name().to_string(),
                    attributes,
                    children,
                });
            }
            _ => {}
        }
    }
}

fn is_layout_whitespace(text: &str) -> bool {
    text.trim().is_empty() && text.contains('\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plain_text() {
        let fragment = HtmlMarkupParser.parse("Hello world").unwrap();
        assert_eq!(fragment, vec![ContentNode::text("Hello world")]);
    }

    #[test]
    fn test_parse_nested_elements() {
        let fragment = HtmlMarkupParser
            .parse(r#"Hi <b class="x">bold <i>deep</i></b>!"#)
            .unwrap();
        assert_eq!(
            fragment,
            vec![
                ContentNode::text("Hi "),
                ContentNode::element(
                    "b",
                    [Attribute::new("class", "x")],
                    vec![
                        ContentNode::text("bold "),
                        ContentNode::element("i", [], vec![ContentNode::text("deep")]),
                    ],
                ),
                ContentNode::text("!"),
            ]
        );
    }

    #[test]
    fn test_space_between_inline_tags_is_kept() {
        let fragment = HtmlMarkupParser.parse("<b>a</b> <i>b</i>").unwrap();
        assert_eq!(
            fragment,
            vec![
                ContentNode::element("b", [], vec![ContentNode::text("a")]),
                ContentNode::text(" "),
                ContentNode::element("i", [], vec![ContentNode::text("b")]),
            ]
        );
    }

    #[test]
    fn test_whitespace_only_runs_and_comments_are_dropped() {
        let fragment = HtmlMarkupParser
            .parse("<ul>\n  <li>a</li>\n  <!-- note -->\n  <li>b</li>\n</ul>")
            .unwrap();
        assert_eq!(
            fragment,
            vec![ContentNode::element(
                "ul",
                [],
                vec![
                    ContentNode::element("li", [], vec![ContentNode::text("a")]),
                    ContentNode::element("li", [], vec![ContentNode::text("b")]),
                ],
            )]
        );
    }

    #[test]
    fn test_entities_are_decoded() {
        let fragment = HtmlMarkupParser.parse("a &amp; b").unwrap();
        assert_eq!(fragment, vec![ContentNode::text("a & b")]);
    }
}

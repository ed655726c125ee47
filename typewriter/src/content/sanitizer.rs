// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::ops::Deref;

use ego_tree::NodeRef;
use scraper::{Html, Node};

use crate::{escape_attribute_value, escape_text, is_void_element};

/// Untrusted markup in, safe markup out. Runs before the markup is parsed.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, markup: &str) -> String;
}

/// Passes markup through untouched. Only for trusted sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSanitizer;

impl Sanitizer for NoopSanitizer {
    fn sanitize(&self, markup: &str) -> String { markup.to_string() }
}

/// Elements that are kept, along with their allowed attributes.
const ALLOWED_ELEMENTS: [&str; 52] = [
    "a", "abbr", "article", "aside", "b", "bdi", "bdo", "blockquote", "br", "caption",
    "cite", "code", "col", "colgroup", "dd", "del", "dfn", "div", "dl", "dt", "em",
    "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "i", "img", "ins", "kbd", "li", "mark", "ol", "p", "pre", "q", "s", "samp", "small",
    "span", "strong", "sub", "sup", "table", "u", "ul",
];

/// Table internals, kept like [`ALLOWED_ELEMENTS`].
const ALLOWED_TABLE_ELEMENTS: [&str; 6] = ["tbody", "td", "tfoot", "th", "thead", "tr"];

/// Elements dropped together with everything inside them. Any other element that isn't
/// allowed is unwrapped: the tag goes, its children stay.
const DROPPED_ELEMENTS: [&str; 22] = [
    "base", "embed", "frame", "frameset", "head", "iframe", "link", "math", "meta",
    "noembed", "noframes", "noscript", "object", "plaintext", "script", "select", "style",
    "svg", "template", "textarea", "title", "xmp",
];

const ALLOWED_ATTRIBUTES: [&str; 17] = [
    "alt", "cite", "class", "colspan", "datetime", "dir", "height", "href", "id", "lang",
    "reversed", "rowspan", "scope", "span", "src", "start", "title",
];

/// Attributes holding a URL. Their value must pass [`is_allowed_url`].
const URL_ATTRIBUTES: [&str; 3] = ["cite", "href", "src"];

const ALLOWED_URL_SCHEMES: [&str; 4] = ["http", "https", "mailto", "tel"];

/// Keeps only listed markup and re-serializes it:
/// - Elements in [`ALLOWED_ELEMENTS`] are kept, [`DROPPED_ELEMENTS`] go with their
///   subtree, anything else is unwrapped.
/// - Attributes in [`ALLOWED_ATTRIBUTES`] are kept, plus `data-*` and `aria-*`.
/// - URLs are kept when relative or using one of [`ALLOWED_URL_SCHEMES`].
/// - Comments are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowListSanitizer;

impl Sanitizer for AllowListSanitizer {
    fn sanitize(&self, markup: &str) -> String {
        let fragment = Html::parse_fragment(markup);
        let mut acc = String::with_capacity(markup.len());
        write_children(*fragment.root_element(), &mut acc);
        acc
    }
}

fn write_children(parent: NodeRef<'_, Node>, acc: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => acc.push_str(&escape_text(text.deref())),
            Node::Element(element) => {
                let tag = element.name();
                if DROPPED_ELEMENTS.contains(&tag) {
                    continue;
                }
                if !is_allowed_element(tag) {
                    write_children(child, acc);
                    continue;
                }
                acc.push('<');
                acc.push_str(tag);
                let mut attributes: Vec<_> = element
                    .attrs()
                    .filter(|(name, value)| is_allowed_attribute(name, value))
                    .collect();
                attributes.sort_by_key(|(name, _)| *name);
                for (name, value) in attributes {
                    acc.push(' ');
                    acc.push_str(name);
                    acc.push_str("=\"");
                    acc.push_str(&escape_attribute_value(value));
                    acc.push('"');
                }
                acc.push('>');
                if is_void_element(tag) {
                    continue;
                }
                write_children(child, acc);
                acc.push_str("</");
                acc.push_str(tag);
                acc.push('>');
            }
            _ => {}
        }
    }
}

fn is_allowed_element(tag: &str) -> bool {
    ALLOWED_ELEMENTS.contains(&tag) || ALLOWED_TABLE_ELEMENTS.contains(&tag)
}

fn is_allowed_attribute(name: &str, value: &str) -> bool {
    let name = name.to_ascii_lowercase();
    let is_listed = ALLOWED_ATTRIBUTES.contains(&name.as_str())
        || is_custom_attribute(&name, "data-")
        || is_custom_attribute(&name, "aria-");
    if !is_listed {
        return false;
    }
    if URL_ATTRIBUTES.contains(&name.as_str()) {
        return is_allowed_url(value);
    }
    true
}

fn is_custom_attribute(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix).is_some_and(|rest| {
        !rest.is_empty()
            && rest
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    })
}

/// Relative URLs pass. Absolute ones need an allowed scheme. Whitespace and control
/// characters are ignored the way browsers ignore them when resolving the scheme.
fn is_allowed_url(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    let scheme_end = normalized.find(':');
    let path_start = normalized.find(['/', '?', '#']);
    match (scheme_end, path_start) {
        (None, _) => true,
        (Some(colon), Some(path)) if path < colon => true,
        (Some(colon), _) => ALLOWED_URL_SCHEMES.contains(&&normalized[..colon]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("<b>Hi</b>", "<b>Hi</b>" ; "plain element is kept")]
    #[test_case("a<script>alert(1)</script>b", "ab" ; "script subtree is dropped")]
    #[test_case(r#"<img src="x.png" onerror="alert(1)">"#, r#"<img src="x.png">"# ; "event handler is dropped")]
    #[test_case(r#"<a href=" javascript:alert(1)">x</a>"#, "<a>x</a>" ; "javascript url is dropped")]
    #[test_case(r#"<a href="https://r3bl.com">x</a>"#, r#"<a href="https://r3bl.com">x</a>"# ; "http url is kept")]
    #[test_case(r#"<a href="/docs?q=a:b">x</a>"#, r#"<a href="/docs?q=a:b">x</a>"# ; "relative url is kept")]
    #[test_case("x<!-- hidden -->y", "xy" ; "comments are dropped")]
    #[test_case("1 &lt; 2", "1 &lt; 2" ; "text stays escaped")]
    #[test_case(r#"<meta http-equiv="refresh" content="0;url=javascript:alert(1)">"#, "" ; "meta refresh is dropped")]
    #[test_case(r#"<svg><animate values="javascript:alert(1)" attributeName="href">"#, "" ; "svg subtree is dropped")]
    #[test_case(r#"<a href="data:text/html,<script>alert(1)</script>">"#, "<a></a>" ; "data url is dropped")]
    #[test_case(r#"<base href="https://evil.example/">"#, "" ; "base is dropped")]
    #[test_case(r#"<form action="https://evil.example/"><b>x</b></form>"#, "<b>x</b>" ; "unknown element is unwrapped")]
    #[test_case(r#"<p style="x" data-id="7" aria-label="l">x</p>"#, r#"<p aria-label="l" data-id="7">x</p>"# ; "style attribute is dropped")]
    fn test_allow_list_sanitizer(input: &str, expected: &str) {
        assert_eq!(AllowListSanitizer.sanitize(input), expected);
    }

    #[test]
    fn test_noop_sanitizer_is_identity() {
        let markup = "<script>x</script>";
        assert_eq!(NoopSanitizer.sanitize(markup), markup);
    }
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Escaping helpers shared by the sanitizer and [`crate::OffscreenSurface`].

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

#[must_use]
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|it| it.eq_ignore_ascii_case(tag))
}

#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut acc = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => acc.push_str("&amp;"),
            '<' => acc.push_str("&lt;"),
            '>' => acc.push_str("&gt;"),
            _ => acc.push(ch),
        }
    }
    acc
}

#[must_use]
pub fn escape_attribute_value(value: &str) -> String {
    let mut acc = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => acc.push_str("&amp;"),
            '"' => acc.push_str("&quot;"),
            _ => acc.push(ch),
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("a < b & c", "a &lt; b &amp; c")]
    #[test_case("plain", "plain")]
    #[test_case("<br>", "&lt;br&gt;")]
    fn test_escape_text(input: &str, expected: &str) {
        assert_eq!(escape_text(input), expected);
    }

    #[test]
    fn test_escape_attribute_value() {
        assert_eq!(escape_attribute_value(r#"say "hi" & go"#), "say &quot;hi&quot; &amp; go");
    }

    #[test]
    fn test_void_elements() {
        assert!(is_void_element("br"));
        assert!(is_void_element("IMG"));
        assert!(!is_void_element("b"));
    }
}

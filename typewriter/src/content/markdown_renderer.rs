// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use pulldown_cmark::{Options, Parser, html};

use crate::TypewriterResult;

/// Renders markdown source into markup, which then goes through the sanitizer and the
/// [`crate::MarkupParser`].
pub trait MarkdownRenderer: Send + Sync {
    /// In `inline` mode a single wrapping paragraph is not emitted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TypewriterError::ContentParse`] if the source can't be rendered.
    fn render(&self, source: &str, inline: bool) -> TypewriterResult<String>;
}

/// CommonMark plus tables, strikethrough and task lists.
#[derive(Debug, Default, Clone, Copy)]
pub struct PulldownMarkdownRenderer;

impl MarkdownRenderer for PulldownMarkdownRenderer {
    fn render(&self, source: &str, inline: bool) -> TypewriterResult<String> {
        let options =
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        let parser = Parser::new_ext(source, options);

        let mut acc = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut acc, parser);

        if inline {
            return Ok(strip_paragraph_wrapper(&acc).to_string());
        }
        Ok(acc)
    }
}

/// `<p>text</p>\n` becomes `text`. Anything with more than one block is left as is.
fn strip_paragraph_wrapper(markup: &str) -> &str {
    let trimmed = markup.trim_end();
    match trimmed
        .strip_prefix("<p>")
        .and_then(|it| it.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("<p>") => inner,
        _ => markup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_block_mode_wraps_paragraph() {
        let markup = PulldownMarkdownRenderer.render("Hi **you**", false).unwrap();
        assert_eq!(markup, "<p>Hi <strong>you</strong></p>\n");
    }

    #[test]
    fn test_inline_mode_strips_paragraph() {
        let markup = PulldownMarkdownRenderer.render("Hi *you*", true).unwrap();
        assert_eq!(markup, "Hi <em>you</em>");
    }

    #[test]
    fn test_inline_mode_keeps_multiple_blocks() {
        let markup = PulldownMarkdownRenderer.render("a\n\nb", true).unwrap();
        assert_eq!(markup, "<p>a</p>\n<p>b</p>\n");
    }
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt::Debug, sync::Arc};

use crate::{AllowListSanitizer, ContentNode, HtmlMarkupParser, MarkdownRenderer,
            MarkupParser, PulldownMarkdownRenderer, Sanitizer, TypewriterResult};

/// Which stages of the [`ContentPipeline`] run for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineFlags {
    pub parse_markdown: bool,
    pub markdown_inline: bool,
    pub parse_markup: bool,
    pub trusted_markup: bool,
}

/// Source text to [`ContentNode`] fragment:
///
/// ```text
/// source ─► markdown renderer? ─► sanitizer (unless trusted) ─► markup parser ─► fragment
/// ```
///
/// With markup parsing off the (possibly rendered) source becomes a single text run, so
/// tags are typed out literally.
#[derive(Clone)]
pub struct ContentPipeline {
    pub markdown_renderer: Arc<dyn MarkdownRenderer>,
    pub sanitizer: Arc<dyn Sanitizer>,
    pub markup_parser: Arc<dyn MarkupParser>,
}

impl Debug for ContentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentPipeline").finish_non_exhaustive()
    }
}

impl Default for ContentPipeline {
    fn default() -> Self {
        Self {
            markdown_renderer: Arc::new(PulldownMarkdownRenderer),
            sanitizer: Arc::new(AllowListSanitizer),
            markup_parser: Arc::new(HtmlMarkupParser),
        }
    }
}

impl ContentPipeline {
    /// # Errors
    ///
    /// Propagates [`crate::TypewriterError::ContentParse`] from the collaborators.
    pub fn build(
        &self,
        source: &str,
        flags: PipelineFlags,
    ) -> TypewriterResult<Vec<ContentNode>> {
        let markup = if flags.parse_markdown {
            self.markdown_renderer.render(source, flags.markdown_inline)?
        } else {
            source.to_string()
        };

        if !flags.parse_markup {
            if markup.is_empty() {
                return Ok(vec![]);
            }
            return Ok(vec![ContentNode::TextRun(markup)]);
        }

        let markup = if flags.trusted_markup {
            markup
        } else {
            self.sanitizer.sanitize(&markup)
        };

        self.markup_parser.parse(&markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoopSanitizer, TypewriterError};
    use pretty_assertions::assert_eq;

    const MARKUP: PipelineFlags = PipelineFlags {
        parse_markdown: false,
        markdown_inline: false,
        parse_markup: true,
        trusted_markup: false,
    };

    #[test]
    fn test_plain_text_when_markup_is_off() {
        let fragment = ContentPipeline::default()
            .build("<b>Hi</b>", PipelineFlags::default())
            .unwrap();
        assert_eq!(fragment, vec![ContentNode::text("<b>Hi</b>")]);
    }

    #[test]
    fn test_untrusted_markup_is_sanitized() {
        let fragment = ContentPipeline::default()
            .build("Hi<script>x</script>", MARKUP)
            .unwrap();
        assert_eq!(fragment, vec![ContentNode::text("Hi")]);
    }

    #[test]
    fn test_markdown_inline_to_fragment() {
        let flags = PipelineFlags {
            parse_markdown: true,
            markdown_inline: true,
            ..MARKUP
        };
        let fragment = ContentPipeline::default().build("**Hi**", flags).unwrap();
        assert_eq!(
            fragment,
            vec![ContentNode::element("strong", [], vec![ContentNode::text("Hi")])]
        );
    }

    #[test]
    fn test_custom_collaborators_are_used() {
        #[derive(Debug)]
        struct FailingParser;
        impl MarkupParser for FailingParser {
            fn parse(&self, _: &str) -> TypewriterResult<Vec<ContentNode>> {
                Err(TypewriterError::ContentParse {
                    reason: "nope".into(),
                })
            }
        }

        let pipeline = ContentPipeline {
            sanitizer: Arc::new(NoopSanitizer),
            markup_parser: Arc::new(FailingParser),
            ..ContentPipeline::default()
        };
        assert!(matches!(
            pipeline.build("x", MARKUP),
            Err(TypewriterError::ContentParse { .. })
        ));
    }
}

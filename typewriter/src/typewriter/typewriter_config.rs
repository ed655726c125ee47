// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Instance config, per call options, and their resolution into [`ResolvedOptions`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{NodeId, PipelineFlags, ScrollSettings, StepSettings, TypewriterError,
            TypewriterResult, ok};

/// A target root, or a scroll container. Either a node on the surface, or the `id`
/// attribute of an element on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetRef {
    Node(NodeId),
    Id(String),
}

impl From<NodeId> for TargetRef {
    fn from(node: NodeId) -> Self { Self::Node(node) }
}

impl From<&str> for TargetRef {
    fn from(id: &str) -> Self { Self::Id(id.to_string()) }
}

impl From<String> for TargetRef {
    fn from(id: String) -> Self { Self::Id(id) }
}

/// How many typing passes a loop makes. In JSON: a number, or `"infinite"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "LoopCountRepr", into = "LoopCountRepr")]
pub enum LoopCount {
    Finite(u32),
    #[default]
    Infinite,
}

impl LoopCount {
    /// Whether another typing pass follows after `completed` passes.
    #[must_use]
    pub fn has_more_after(&self, completed: u32) -> bool {
        match self {
            Self::Finite(count) => completed < *count,
            Self::Infinite => true,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LoopCountRepr {
    Count(u32),
    Keyword(String),
}

impl TryFrom<LoopCountRepr> for LoopCount {
    type Error = String;

    fn try_from(repr: LoopCountRepr) -> Result<Self, Self::Error> {
        match repr {
            LoopCountRepr::Count(count) => Ok(Self::Finite(count)),
            LoopCountRepr::Keyword(keyword) => match keyword.to_ascii_lowercase().as_str() {
                "infinite" | "infinity" => Ok(Self::Infinite),
                _ => Err(format!("expected a count or \"infinite\", got {keyword:?}")),
            },
        }
    }
}

impl From<LoopCount> for LoopCountRepr {
    fn from(count: LoopCount) -> Self {
        match count {
            LoopCount::Finite(count) => Self::Count(count),
            LoopCount::Infinite => Self::Keyword("infinite".to_string()),
        }
    }
}

/// How a loop wipes the typed content between passes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClearStrategy {
    /// Delete everything at once.
    #[default]
    Clear,
    /// Erase it chunk by chunk, like a person holding backspace.
    Backspace,
}

/// What the last loop pass leaves behind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FinalBehavior {
    #[default]
    Keep,
    Remove,
}

/// Instance defaults. Every per call [`TypewriterOptions`] field falls back to these.
///
/// ```
/// use r3bl_typewriter::{ClearStrategy, LoopCount, TypewriterConfig};
///
/// let config = TypewriterConfig::try_from_json_str(
///     r#"{ "chunk_size": 3, "loop_count": 2, "clear_strategy": "backspace" }"#,
/// ).unwrap();
/// assert_eq!(config.chunk_size, 3);
/// assert_eq!(config.loop_count, LoopCount::Finite(2));
/// assert_eq!(config.clear_strategy, ClearStrategy::Backspace);
/// assert_eq!(config.type_delay_ms, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypewriterConfig {
    /// Fallback content for [`crate::Typewriter::start_loop`].
    pub text: Option<String>,
    pub target: Option<TargetRef>,
    pub type_delay_ms: u64,
    pub backspace_delay_ms: u64,
    pub chunk_size: usize,
    pub loop_count: LoopCount,
    pub clear_strategy: ClearStrategy,
    pub final_behavior: FinalBehavior,
    pub loop_start_delay_ms: u64,
    pub loop_end_delay_ms: u64,
    pub show_cursor: bool,
    pub cursor_char: String,
    pub hide_cursor_on_finish: bool,
    pub clear_before_start: bool,
    pub auto_scroll: bool,
    pub scroll_interval: usize,
    pub scroll_container: Option<TargetRef>,
    pub parse_markup: bool,
    pub parse_markdown: bool,
    pub markdown_inline: bool,
    /// Skip the sanitizer. Only for markup you wrote yourself.
    pub trusted_markup: bool,
}

impl Default for TypewriterConfig {
    fn default() -> Self {
        Self {
            text: None,
            target: None,
            type_delay_ms: 50,
            backspace_delay_ms: 50,
            chunk_size: 1,
            loop_count: LoopCount::Infinite,
            clear_strategy: ClearStrategy::Clear,
            final_behavior: FinalBehavior::Keep,
            loop_start_delay_ms: 300,
            loop_end_delay_ms: 800,
            show_cursor: true,
            cursor_char: "|".to_string(),
            hide_cursor_on_finish: true,
            clear_before_start: true,
            auto_scroll: true,
            scroll_interval: 1,
            scroll_container: None,
            parse_markup: true,
            parse_markdown: false,
            markdown_inline: false,
            trusted_markup: false,
        }
    }
}

impl TypewriterConfig {
    /// # Errors
    ///
    /// Returns [`TypewriterError::Configuration`] if the JSON is malformed, has values of
    /// the wrong type (eg: a negative delay), or fails [`Self::validate`].
    pub fn try_from_json_str(json: &str) -> TypewriterResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|error| TypewriterError::configuration("json", error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`TypewriterError::Configuration`] naming the first invalid field.
    pub fn validate(&self) -> TypewriterResult<()> {
        validate_chunk_size(self.chunk_size)?;
        validate_scroll_interval(self.scroll_interval)?;
        validate_cursor_char(&self.cursor_char)?;
        ok!()
    }
}

/// Per call overrides. `None` means "use the instance config".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypewriterOptions {
    pub type_delay_ms: Option<u64>,
    pub backspace_delay_ms: Option<u64>,
    pub chunk_size: Option<usize>,
    pub loop_count: Option<LoopCount>,
    pub clear_strategy: Option<ClearStrategy>,
    pub final_behavior: Option<FinalBehavior>,
    pub loop_start_delay_ms: Option<u64>,
    pub loop_end_delay_ms: Option<u64>,
    pub show_cursor: Option<bool>,
    pub cursor_char: Option<String>,
    pub hide_cursor_on_finish: Option<bool>,
    pub clear_before_start: Option<bool>,
    pub auto_scroll: Option<bool>,
    pub scroll_interval: Option<usize>,
    pub scroll_container: Option<TargetRef>,
    pub parse_markup: Option<bool>,
    pub parse_markdown: Option<bool>,
    pub markdown_inline: Option<bool>,
    pub trusted_markup: Option<bool>,
}

/// The effective settings of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub type_delay: Duration,
    pub backspace_delay: Duration,
    pub chunk_size: usize,
    pub loop_count: LoopCount,
    pub clear_strategy: ClearStrategy,
    pub final_behavior: FinalBehavior,
    pub loop_start_delay: Duration,
    pub loop_end_delay: Duration,
    pub show_cursor: bool,
    pub cursor_char: String,
    pub hide_cursor_on_finish: bool,
    pub clear_before_start: bool,
    pub auto_scroll: bool,
    pub scroll_interval: usize,
    pub scroll_container: Option<TargetRef>,
    pub pipeline_flags: PipelineFlags,
}

impl ResolvedOptions {
    /// # Errors
    ///
    /// Returns [`TypewriterError::Configuration`] if an override is out of range.
    pub fn try_resolve(
        config: &TypewriterConfig,
        options: &TypewriterOptions,
    ) -> TypewriterResult<Self> {
        let chunk_size = options.chunk_size.unwrap_or(config.chunk_size);
        validate_chunk_size(chunk_size)?;

        let scroll_interval = options.scroll_interval.unwrap_or(config.scroll_interval);
        validate_scroll_interval(scroll_interval)?;

        let cursor_char = options
            .cursor_char
            .clone()
            .unwrap_or_else(|| config.cursor_char.clone());
        validate_cursor_char(&cursor_char)?;

        let millis = |option: Option<u64>, fallback: u64| {
            Duration::from_millis(option.unwrap_or(fallback))
        };

        Ok(Self {
            type_delay: millis(options.type_delay_ms, config.type_delay_ms),
            backspace_delay: millis(options.backspace_delay_ms, config.backspace_delay_ms),
            chunk_size,
            loop_count: options.loop_count.unwrap_or(config.loop_count),
            clear_strategy: options.clear_strategy.unwrap_or(config.clear_strategy),
            final_behavior: options.final_behavior.unwrap_or(config.final_behavior),
            loop_start_delay: millis(options.loop_start_delay_ms, config.loop_start_delay_ms),
            loop_end_delay: millis(options.loop_end_delay_ms, config.loop_end_delay_ms),
            show_cursor: options.show_cursor.unwrap_or(config.show_cursor),
            cursor_char,
            hide_cursor_on_finish: options
                .hide_cursor_on_finish
                .unwrap_or(config.hide_cursor_on_finish),
            clear_before_start: options
                .clear_before_start
                .unwrap_or(config.clear_before_start),
            auto_scroll: options.auto_scroll.unwrap_or(config.auto_scroll),
            scroll_interval,
            scroll_container: options
                .scroll_container
                .clone()
                .or_else(|| config.scroll_container.clone()),
            pipeline_flags: PipelineFlags {
                parse_markdown: options.parse_markdown.unwrap_or(config.parse_markdown),
                markdown_inline: options.markdown_inline.unwrap_or(config.markdown_inline),
                parse_markup: options.parse_markup.unwrap_or(config.parse_markup),
                trusted_markup: options.trusted_markup.unwrap_or(config.trusted_markup),
            },
        })
    }

    #[must_use]
    pub fn scroll_settings(&self, target: NodeId) -> ScrollSettings {
        ScrollSettings {
            enabled: self.auto_scroll,
            interval: self.scroll_interval,
            target,
        }
    }

    #[must_use]
    pub fn type_step(&self, scroll: ScrollSettings) -> StepSettings {
        StepSettings {
            chunk_size: self.chunk_size,
            delay: self.type_delay,
            scroll,
        }
    }

    #[must_use]
    pub fn erase_step(&self, scroll: ScrollSettings) -> StepSettings {
        StepSettings {
            chunk_size: self.chunk_size,
            delay: self.backspace_delay,
            scroll,
        }
    }
}

fn validate_chunk_size(chunk_size: usize) -> TypewriterResult<()> {
    if chunk_size == 0 {
        return Err(TypewriterError::configuration("chunk_size", "must be at least 1"));
    }
    Ok(())
}

fn validate_scroll_interval(scroll_interval: usize) -> TypewriterResult<()> {
    if scroll_interval == 0 {
        return Err(TypewriterError::configuration(
            "scroll_interval",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_cursor_char(cursor_char: &str) -> TypewriterResult<()> {
    if cursor_char.is_empty() {
        return Err(TypewriterError::configuration("cursor_char", "must not be empty"));
    }
    Ok(())
}

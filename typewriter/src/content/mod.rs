// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod content_node;
pub mod content_pipeline;
pub mod markdown_renderer;
pub mod markup_parser;
pub mod markup_writer;
pub mod sanitizer;

// Re-export.
pub use content_node::*;
pub use content_pipeline::*;
pub use markdown_renderer::*;
pub use markup_parser::*;
pub use markup_writer::*;
pub use sanitizer::*;

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod node_arena;
pub mod offscreen_surface;
pub mod render_surface;

// Re-export.
pub use node_arena::*;
pub use offscreen_surface::*;
pub use render_surface::*;

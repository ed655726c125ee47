// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod lifecycle_callbacks;
pub mod typewriter_config;
pub mod typewriter_struct;

// Re-export.
pub use lifecycle_callbacks::*;
pub use typewriter_config::*;
pub use typewriter_struct::*;

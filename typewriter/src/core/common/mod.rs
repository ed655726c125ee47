// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod typewriter_error;

// Re-export.
pub use typewriter_error::*;

// Type aliases.
pub type StdMutex<T> = std::sync::Mutex<T>;

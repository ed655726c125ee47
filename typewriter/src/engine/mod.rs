// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod backspace_engine;
pub mod cancellation_token;
pub mod content_mutator;
pub mod cursor_manager;
pub mod loop_controller;
pub mod operation_context;
pub mod operation_scheduler;
pub mod scroll_policy;
pub mod stage;
pub mod timer_registry;

// Re-export.
pub use backspace_engine::*;
pub use cancellation_token::*;
pub use content_mutator::*;
pub use cursor_manager::*;
pub use loop_controller::*;
pub use operation_context::*;
pub use operation_scheduler::*;
pub use scroll_policy::*;
pub use stage::*;
pub use timer_registry::*;

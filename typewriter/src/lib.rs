// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # r3bl_typewriter
//!
//! An async typewriter animation engine. It reveals content on a render surface a few
//! graphemes at a time, erases it again with a backspace animation, and repeats type
//! and clear cycles in a loop, all with a blinking caret that tracks the insertion
//! point.
//!
//! # Table of contents
//!
//! - [Layers](#layers)
//! - [Operations](#operations)
//! - [Cancellation and single flight](#cancellation-and-single-flight)
//! - [Logging](#logging)
//!
//! # Layers
//!
//! ```text
//! Typewriter (session API, callbacks, config)
//!    │
//!    ├── ContentPipeline: markdown ─► sanitizer ─► markup parser ─► ContentNode fragment
//!    │
//!    └── engine: OperationScheduler ─► content mutator / backspace engine / loop
//!           │                           controller, over a Stage (surface + caret +
//!           │                           scroll policy)
//!           └── TimerRegistry + CancellationToken (every delay is cancellable)
//!
//! RenderSurface (trait): OffscreenSurface is the in-memory implementation.
//! ```
//!
//! # Operations
//!
//! | Operation                       | Does                                              |
//! | :------------------------------ | :------------------------------------------------ |
//! | [`Typewriter::start_typing`]    | reveal content once                               |
//! | [`Typewriter::start_loop`]      | type, pause, clear (or backspace), repeat         |
//! | [`Typewriter::backspace`]       | erase `n` graphemes (or everything) from the end  |
//! | [`Typewriter::stop`]            | cancel and wait until settled                     |
//! | [`Typewriter::destroy`]         | cancel, clear timers, remove the caret, for good  |
//!
//! # Cancellation and single flight
//!
//! At most one operation mutates the surface at a time. Starting a new one cancels the
//! in-flight one, which resolves with `Ok(())`. After [`Typewriter::stop`] returns, or
//! after any operation settles, [`Typewriter::pending_timer_count`] is zero.
//!
//! # Logging
//!
//! The engine logs through [`tracing`]. Use [`try_initialize_logging_global`] with a
//! [`TracingConfig`] to route the output to stdout, stderr, or a log file. Flip
//! [`DEBUG_TYPEWRITER`] for verbose engine traces.

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap().
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules.
pub mod content;
pub mod core;
pub mod engine;
pub mod surface;
pub mod typewriter;

// Re-export.
pub use content::*;
pub use core::*;
pub use engine::*;
pub use surface::*;
pub use typewriter::*;

/// Enable verbose engine traces (scheduling, cancellation, scroll decisions).
pub const DEBUG_TYPEWRITER: bool = false;

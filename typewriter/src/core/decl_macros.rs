// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Syntactic sugar for `Ok(())` and `Ok(value)`.
///
/// ```
/// use r3bl_typewriter::ok;
/// fn unit() -> Result<(), ()> { ok!() }
/// fn value() -> Result<u8, ()> { ok!(42) }
/// assert_eq!(unit(), Ok(()));
/// assert_eq!(value(), Ok(42));
/// ```
#[macro_export]
macro_rules! ok {
    // No args.
    () => {
        Ok(())
    };
    // With arg.
    ($value:expr) => {
        Ok($value)
    };
}

/// Locks a [`std::sync::Mutex`], recovering the inner value if a prior holder panicked.
/// The engine never leaves shared state half-written across a panic boundary, so the
/// poisoned value is still consistent.
#[macro_export]
macro_rules! lock_or_recover {
    ($mutex:expr) => {
        $mutex
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

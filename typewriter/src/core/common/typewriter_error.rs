// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Error types for the typewriter engine. See [`TypewriterError`] for details.

/// Type alias to make it easy to work with [`TypewriterError`].
pub type TypewriterResult<T> = Result<T, TypewriterError>;

/// Errors surfaced by the public API of [`crate::Typewriter`].
///
/// | Variant           | Raised                                          | Effect                           |
/// | :---------------- | :---------------------------------------------- | :------------------------------- |
/// | [`Configuration`] | synchronously, at construction or per call      | fatal to that call only          |
/// | [`Lifecycle`]     | synchronously, on a destroyed session           | session state untouched          |
/// | [`Content`]       | from inside the operation (target unresolvable) | rejects only that operation      |
/// | [`ContentParse`]  | from inside the operation (collaborator failed) | rejects only that operation      |
///
/// Cancellation (by [`crate::Typewriter::stop`] or by supersession) is not an error. A
/// cancelled operation resolves with `Ok(())`.
///
/// [`Configuration`]: Self::Configuration
/// [`Lifecycle`]: Self::Lifecycle
/// [`Content`]: Self::Content
/// [`ContentParse`]: Self::ContentParse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum TypewriterError {
    /// A numeric or textual option is out of its allowed range.
    #[error("Invalid option `{field}`: {reason}")]
    #[diagnostic(
        code(r3bl_typewriter::configuration),
        help("Check the instance config and the per call options passed to this operation")
    )]
    Configuration {
        field: &'static str,
        reason: String,
    },

    /// An operation was invoked on a session after [`crate::Typewriter::destroy`].
    #[error("Cannot call `{operation}` on a destroyed typewriter")]
    #[diagnostic(
        code(r3bl_typewriter::lifecycle),
        help("Create a new typewriter, destroyed sessions can't be revived")
    )]
    Lifecycle { operation: &'static str },

    /// The target root can't be resolved on the render surface.
    #[error("Target can't be resolved: {reason}")]
    #[diagnostic(
        code(r3bl_typewriter::content),
        help("Pass a target element, or set one in the config, that exists on the surface")
    )]
    Content { reason: String },

    /// The markdown renderer or markup parser rejected the source.
    #[error("Content can't be parsed: {reason}")]
    #[diagnostic(code(r3bl_typewriter::content_parse))]
    ContentParse { reason: String },
}

impl TypewriterError {
    pub fn configuration(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field,
            reason: reason.into(),
        }
    }

    pub fn content(reason: impl Into<String>) -> Self {
        Self::Content {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_names_the_field() {
        let error = TypewriterError::configuration("chunk_size", "must be at least 1");
        assert_eq!(
            error.to_string(),
            "Invalid option `chunk_size`: must be at least 1"
        );
    }

    #[test]
    fn test_diagnostic_codes_are_stable() {
        let error = TypewriterError::Lifecycle { operation: "stop" };
        assert_eq!(
            error.code().map(|it| it.to_string()),
            Some("r3bl_typewriter::lifecycle".to_string())
        );
    }
}

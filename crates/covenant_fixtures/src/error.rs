//! Generation failure taxonomy.

/// Failures surfaced by the fixture generator.
///
/// Strategies do not raise for recoverable situations; the dispatcher falls
/// back (to the mocking engine for recursion) and only errors once every
/// fallback is exhausted.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GenerationError {
    /// No registered strategy supports the request.
    #[error("No suitable generator for `{type_id}` (requested for `{subject}`)")]
    NoStrategy { subject: String, type_id: String },

    /// The constraint pre-pass rejected the annotation configuration.
    #[error("Invalid annotation value on `{subject}`: {reason}")]
    InvalidAnnotationValue { subject: String, reason: String },

    /// A non-nullable type occurred on its own DFS ancestor path.
    #[error("Recursive generation failed for `{type_id}`: {path}")]
    Recursive { type_id: String, path: String },

    /// The type declares no constructor; only the mocking engine can
    /// provide an instance.
    #[error("`{type_id}` declares no constructor")]
    Unconstructible { type_id: String },

    /// The recursion fallback through the mocking engine also failed.
    #[error("Failed to handle recursion via mocking for `{type_id}`: {message} (cycle {path})")]
    RecursionFallbackFailed {
        type_id: String,
        path: String,
        message: String,
    },

    /// Constructor invocation threw while assembling a structural value.
    #[error("Constructor of `{type_id}` failed: {message}")]
    ConstructorFailed { type_id: String, message: String },

    /// A strategy produced `null` for a non-nullable slot.
    #[error("Generator `{strategy}` returned null for non-nullable `{subject}`")]
    NullForNonNullable { strategy: String, subject: String },

    /// A child reference of a structural type could not be resolved.
    #[error("Failed to resolve `{type_id}` while generating `{subject}`: {message}")]
    Unresolvable {
        subject: String,
        type_id: String,
        message: String,
    },
}

impl GenerationError {
    /// Whether this error is the cycle signal the dispatcher may still
    /// recover from via the mocking engine.
    pub fn is_recursive(&self) -> bool {
        matches!(self, Self::Recursive { .. })
    }
}

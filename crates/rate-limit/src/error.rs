//! Error types for rate limiting.

/// Errors raised when building a limiter from invalid settings.
///
/// Deciding on a request never fails; rejection is reported through
/// [`crate::Decision`].
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// The refill rate is zero, negative, or not finite.
    #[error("Refill rate must be a positive number of tokens per second, got {0}")]
    InvalidRate(f64),

    /// The bucket cannot hold a single token.
    #[error("Burst capacity must be at least 1")]
    InvalidBurst,
}

/// Errors raised when a caller key cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// The organization id is missing or empty.
    #[error("Missing organization id")]
    MissingOrganization,

    /// The user id is missing or empty.
    #[error("Missing user id")]
    MissingUser,

    /// The action class is missing or empty.
    #[error("Missing action class")]
    MissingAction,

    /// A key part contains the `:` separator.
    #[error("The {part} must not contain ':'")]
    Separator {
        /// Which part of the key was rejected.
        part: &'static str,
    },
}

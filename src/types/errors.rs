//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. The variants
//! mirror how a tool call can fail: misconfiguration of the server itself,
//! an unusable repository, bad caller input, or a failing query engine.

use crate::recovery::ErrorContext;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the repository context server.
#[derive(Error, Debug)]
pub enum Error {
    /// Server misconfiguration (no query engine attached). Never retried and
    /// never wrapped in an error envelope.
    #[error("system error: {0}")]
    System(String),

    /// Repository precondition failed (not configured, not initialized).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Invalid or missing tool parameters.
    #[error("validation error: {0}")]
    Validation(String),

    /// Entity missing from the index.
    #[error("not found: {0}")]
    NotFound(String),

    /// Failure raised by the query engine. Displayed verbatim so the
    /// classifier sees the engine's own wording.
    #[error("{0}")]
    Backend(String),

    /// Breaker open or retries exhausted (boxed to keep `Result` small).
    #[error("{0}")]
    Recovery(Box<ErrorContext>),

    /// Cancelled by the caller.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// Timeout.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Message without the category prefix, used when the category is
    /// already implied by the envelope text around it.
    pub fn detail(&self) -> String {
        match self {
            Error::System(msg)
            | Error::Precondition(msg)
            | Error::Validation(msg)
            | Error::NotFound(msg)
            | Error::Backend(msg)
            | Error::Cancelled(msg)
            | Error::Timeout(msg)
            | Error::Internal(msg) => msg.clone(),
            Error::Recovery(ctx) => ctx.to_string(),
            Error::Serialization(e) => e.to_string(),
            Error::Io(e) => e.to_string(),
        }
    }

    /// Short machine-readable code for transport error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Error::System(_) => "SYSTEM",
            Error::Precondition(_) => "FAILED_PRECONDITION",
            Error::Validation(_) => "INVALID_ARGUMENT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Backend(_) => "BACKEND",
            Error::Recovery(_) => "UNAVAILABLE",
            Error::Cancelled(_) => "CANCELLED",
            Error::Timeout(_) => "DEADLINE_EXCEEDED",
            Error::Internal(_) | Error::Serialization(_) | Error::Io(_) => "INTERNAL",
        }
    }

    /// The attached error context, if this error came out of the recovery manager.
    pub fn recovery_context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Recovery(ctx) => Some(ctx),
            _ => None,
        }
    }
}

// Convenience constructors
impl Error {
    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}

impl From<ErrorContext> for Error {
    fn from(ctx: ErrorContext) -> Self {
        Error::Recovery(Box::new(ctx))
    }
}

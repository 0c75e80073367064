//! Error types for the encoder module.

use thiserror::Error;

/// Errors that can occur during recorder operations.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// No usable backend/codec after exhausting the fallback chain.
    #[error("no usable recording encoder: {0}")]
    Unavailable(String),

    /// A required mime type is not supported by the platform.
    #[error("mime type not supported: {0}")]
    MimeUnsupported(String),

    /// The recorder was already started.
    #[error("recorder already started")]
    AlreadyStarted,

    /// The recorder was never started.
    #[error("recorder not started")]
    NotStarted,

    /// Platform encoder failure.
    #[error("encoder backend error: {0}")]
    Backend(String),
}

//! Error types for the capture module.

use thiserror::Error;

/// Errors that can occur during video capture operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user declined screen capture access.
    #[error("permission denied for screen capture")]
    PermissionDenied,

    /// The requested source vanished or could not be opened.
    #[error("capture source unavailable: {0}")]
    SourceUnavailable(String),

    /// Any other platform backend failure.
    #[error("capture backend error: {0}")]
    Backend(String),
}

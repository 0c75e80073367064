//! Error types for the audio module.

use thiserror::Error;

/// Errors that can occur during audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The user declined microphone access.
    #[error("permission denied for microphone")]
    PermissionDenied,

    /// The requested audio device vanished or could not be opened.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The mixer processing context could not be created.
    #[error("mixer graph init failed: {0}")]
    GraphInit(String),

    /// Any other platform backend failure.
    #[error("audio backend error: {0}")]
    Backend(String),
}

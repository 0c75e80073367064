//! Structured error taxonomy surfaced to the presentation layer.
//!
//! The core never formats user-facing text; these values are translated by
//! the UI in the active language.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The media kind a permission denial applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaKind {
    Screen,
    Microphone,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Screen => write!(f, "screen capture"),
            Self::Microphone => write!(f, "microphone"),
        }
    }
}

/// Errors surfaced by the session controller.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionError {
    /// The user declined screen or microphone access. Recoverable.
    #[error("permission denied for {media}")]
    PermissionDenied {
        /// What access was denied.
        media: MediaKind,
    },

    /// An enumerated capture source vanished or could not be queried.
    #[error("capture source unavailable: {id}")]
    SourceUnavailable {
        /// Id of the source, or the kind tag for enumeration failures.
        id: String,
    },

    /// An enumerated audio device vanished.
    #[error("audio device unavailable: {id}")]
    DeviceUnavailable {
        /// Id of the device ("default" for the platform default).
        id: String,
    },

    /// No usable codec/backend for this recording attempt.
    #[error("no usable recording encoder")]
    EncoderUnavailable,

    /// The mixer processing context could not be created.
    #[error("audio mixer could not be created: {message}")]
    GraphInitFailed {
        /// Backend description of the failure.
        message: String,
    },

    /// Start was requested with no source selected.
    #[error("no capture source selected")]
    NoSourceSelected,

    /// Saving the artifact failed; the artifact is retained for retry.
    #[error("save failed: {message}")]
    PersistenceFailure {
        /// Bridge description of the failure.
        message: String,
    },
}

//! Events sent from the engine to the UI.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::state::SessionState;
use crate::types::{AudioDeviceInfo, SourceInfo};

/// Events that the engine can send to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Engine is ready.
    Ready,

    /// Session state has changed.
    StateChanged {
        /// Previous state.
        previous: Box<SessionState>,

        /// Current state.
        current: Box<SessionState>,
    },

    /// List of available capture sources.
    SourcesListed(Vec<SourceInfo>),

    /// List of available audio input devices.
    AudioDevicesListed(Vec<AudioDeviceInfo>),

    /// The microphone was turned on or off.
    MicrophoneToggled { enabled: bool },

    /// Microphone test level (0 - 100).
    MicLevel { level: f32 },

    /// Re-derived estimated output size after a settings change.
    EstimatedSize { mb_per_minute: u32 },

    /// Periodic report while recording; cosmetic only.
    RecordingTick {
        /// Seconds elapsed since the recording started.
        elapsed_secs: u64,

        /// Bytes accumulated so far.
        recorded_bytes: u64,
    },

    /// Achieved preview frame rate over the last second.
    PreviewFps { fps: u32 },

    /// An error occurred. Exactly one event per error condition.
    Error {
        /// The structured error value; the UI translates it.
        error: SessionError,

        /// Whether the session can continue.
        recoverable: bool,
    },

    /// The save-location request was cancelled by the user; not an error.
    SaveCancelled,

    /// The artifact was written to disk.
    Saved {
        /// Final path of the written file.
        path: String,

        /// Number of bytes written.
        bytes: u64,
    },

    /// The artifact was discarded.
    Discarded,

    /// Engine has shut down.
    Shutdown,
}

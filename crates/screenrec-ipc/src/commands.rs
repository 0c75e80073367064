//! Commands sent from the UI to the engine.

use serde::{Deserialize, Serialize};

use crate::types::{QualityTier, SourceInfo, SourceKind};

/// Commands that the UI can send to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionCommand {
    /// Request the list of available capture sources of a kind.
    ListSources { kind: SourceKind },

    /// Request the list of available audio input devices.
    ListAudioDevices,

    /// Select a capture source (Idle/Armed → Armed).
    SelectSource { source: SourceInfo },

    /// Select the microphone device to use (None for the platform default).
    SelectMicrophone { device_id: Option<String> },

    /// Set the microphone gain (clamped to 0.0 - 3.0).
    SetMicGain(f32),

    /// Turn the microphone on or off; legal in any state.
    ToggleMicrophone,

    /// Change the capture resolution.
    SetResolution { width: u32, height: u32 },

    /// Change the capture frame rate.
    SetFps(u32),

    /// Change the quality tier.
    SetQuality(QualityTier),

    /// Change the active UI language ("en", "tr", ...).
    SetLanguage(String),

    /// Enable or disable performance mode (suppresses the preview).
    SetPerformanceMode(bool),

    /// Start the microphone level test.
    StartMicTest,

    /// Stop the microphone level test.
    StopMicTest,

    /// Start recording (Armed → Recording).
    Start,

    /// Stop recording (Recording → Stopped).
    Stop,

    /// Save the stopped artifact through the persistence bridge.
    Save,

    /// Discard the stopped artifact.
    Discard,

    /// Request the current session state.
    GetState,

    /// Shut the engine down completely.
    Shutdown,
}

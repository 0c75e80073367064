//! Platform boundary for audio acquisition.

use screenrec_ipc::AudioDeviceInfo;

use crate::stream::AudioStream;
use crate::{AudioResult, CHANNELS, SAMPLE_RATE};

/// Constraints applied when opening a microphone stream.
///
/// The defaults favor recording fidelity over call-quality heuristics:
/// echo cancellation, noise suppression and auto-gain are all off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicrophoneConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub channels: u16,
    pub sample_rate: u32,
}

impl Default for MicrophoneConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
            channels: CHANNELS,
            sample_rate: SAMPLE_RATE,
        }
    }
}

/// Host platform audio API.
///
/// Implementations convert platform failures into
/// [`AudioError`](crate::AudioError) values; raw platform errors never
/// cross this boundary.
pub trait AudioBackend: Send + Sync {
    /// Enumerate available audio input devices. Labels may be empty until
    /// a permission grant has happened (see
    /// [`list_audio_devices`](crate::list_audio_devices)).
    fn enumerate_inputs(&self) -> AudioResult<Vec<AudioDeviceInfo>>;

    /// Open a microphone stream on the given device, or the platform
    /// default when `device_id` is `None`.
    fn open_microphone(
        &self,
        device_id: Option<&str>,
        constraints: &MicrophoneConstraints,
    ) -> AudioResult<AudioStream>;

    /// Open the system-audio loopback capture bound to a desktop source.
    ///
    /// `Ok(None)` is the legitimate "this platform/source has no system
    /// audio" result and must be checked by the caller; it is not an error.
    fn open_loopback(&self, source_id: &str) -> AudioResult<Option<AudioStream>>;
}

//! Audio capture and mixing.
//!
//! This crate defines the platform boundary for audio acquisition
//! (microphone and system-audio loopback), the permission-probing device
//! listing, the two-branch mixer graph that produces the single mixed
//! track a recording encoder accepts, and the microphone level meter.

mod backend;
mod chunk;
mod device;
mod error;
mod level;
mod mixer;
mod stream;

pub use backend::{AudioBackend, MicrophoneConstraints};
pub use chunk::{AudioChunk, AudioSource};
pub use device::{list_audio_devices, resolve_device};
pub use error::AudioError;
pub use level::{peak_level, LevelMeter};
pub use mixer::{MixedChunk, MixerGraph};
pub use stream::{AudioStream, StreamHandle};

/// Channel capacity for audio chunks.
pub const AUDIO_CHANNEL_CAPACITY: usize = 8;

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Audio sample rate in Hz.
pub const SAMPLE_RATE: u32 = 48000;

/// Number of audio channels (mono, for recording fidelity).
pub const CHANNELS: u16 = 1;

/// Samples per audio chunk (10ms at 48kHz).
pub const SAMPLES_PER_CHUNK: usize = 480;

/// Microphone gain domain.
pub const MIC_GAIN_MIN: f32 = 0.0;
pub const MIC_GAIN_MAX: f32 = 3.0;

/// Default microphone gain.
pub const DEFAULT_MIC_GAIN: f32 = 1.0;

/// System-audio branch gain; system audio is never user-attenuated.
pub const SYSTEM_GAIN: f32 = 1.0;

/// Clamp a gain value to the microphone gain domain.
pub fn clamp_mic_gain(gain: f32) -> f32 {
    gain.clamp(MIC_GAIN_MIN, MIC_GAIN_MAX)
}

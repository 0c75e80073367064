//! Recording encoder adapter.
//!
//! Encoding itself is delegated to whatever platform encoder is available,
//! reached through the [`EncoderHost`] boundary. This crate normalizes the
//! option surface over two backend variants (an enhanced recorder and a
//! baseline fallback) and handles codec preference negotiation, quality-tier
//! bitrate mapping and time-sliced chunk delivery. The choice of backend is
//! made once per recording start and is transparent to the session
//! controller.

mod baseline;
mod enhanced;
mod error;
mod worker;

#[cfg(test)]
pub(crate) mod testsupport;

pub use baseline::BaselineRecorder;
pub use enhanced::EnhancedRecorder;
pub use error::EncoderError;

use std::sync::Arc;

use bytes::Bytes;
use crossbeam_channel::Receiver;
use tracing::{info, warn};

use screenrec_audio::MixedChunk;
use screenrec_capture::CapturedFrame;
use screenrec_ipc::{QualityTier, VideoSettings};

/// Channel capacity for encoded chunk delivery.
pub const CHUNK_CHANNEL_CAPACITY: usize = 8;

/// Fixed time-slice for incremental chunk delivery, in milliseconds.
pub const TIMESLICE_MS: u64 = 1000;

/// Audio bitrate, both backends.
pub const AUDIO_BITRATE_BPS: u32 = 128_000;

/// Codec preference order.
pub const MIME_H264_OPUS: &str = "video/webm;codecs=h264,opus";
pub const MIME_VP9_OPUS: &str = "video/webm;codecs=vp9,opus";
pub const MIME_WEBM: &str = "video/webm";

/// Result type for encoder operations.
pub type EncoderResult<T> = Result<T, EncoderError>;

/// Options for starting a recorder backend.
#[derive(Debug, Clone, Copy)]
pub struct RecorderOptions {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Target frames per second.
    pub fps: u32,

    /// Quality tier, mapped to a backend-specific bitrate.
    pub quality: QualityTier,

    /// Time-slice for incremental chunk delivery, in milliseconds.
    pub timeslice_ms: u64,
}

impl RecorderOptions {
    /// Build options from the current video settings.
    pub fn from_settings(settings: &VideoSettings) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            fps: settings.fps,
            quality: settings.quality,
            timeslice_ms: TIMESLICE_MS,
        }
    }
}

/// Request handed to the platform when constructing an encoder.
#[derive(Debug, Clone)]
pub struct EncoderRequest {
    /// Negotiated mime type.
    pub mime_type: String,

    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Target frames per second.
    pub fps: u32,

    /// Video bitrate in bits per second.
    pub video_bitrate_bps: u32,

    /// Audio bitrate in bits per second.
    pub audio_bitrate_bps: u32,

    /// Whether the combined stream carries an audio track.
    pub has_audio: bool,
}

/// An encoded, containerized output chunk.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// Containerized bytes.
    pub data: Bytes,

    /// Position in recording order.
    pub sequence: u64,

    /// Media time covered up to, in 100ns units.
    pub pts_100ns: u64,
}

/// The platform encoder created by the host.
///
/// Implementations consume frames and mixed audio and produce containerized
/// output bytes; `take_output` drains whatever has been produced since the
/// last call, and `finish` flushes the remainder.
pub trait MediaEncoder: Send {
    /// Feed a captured video frame.
    fn write_video(&mut self, frame: &CapturedFrame) -> EncoderResult<()>;

    /// Feed a mixed audio chunk.
    fn write_audio(&mut self, chunk: &MixedChunk) -> EncoderResult<()>;

    /// Drain containerized bytes produced since the last call.
    fn take_output(&mut self) -> Bytes;

    /// Flush and return any remaining containerized bytes.
    fn finish(&mut self) -> EncoderResult<Bytes>;
}

/// Host platform encoder API.
pub trait EncoderHost: Send + Sync {
    /// Whether the platform can encode the given mime type.
    fn supports_mime(&self, mime: &str) -> bool;

    /// Construct a platform encoder for the given request.
    fn create(&self, request: &EncoderRequest) -> EncoderResult<Box<dyn MediaEncoder>>;
}

/// The single combined stream handed to a recorder backend:
/// one video track and at most one mixed audio track.
pub struct CombinedStream {
    /// Captured video frames.
    pub video: Receiver<CapturedFrame>,

    /// Mixed audio chunks, if an audio track is present.
    pub audio: Option<Receiver<MixedChunk>>,
}

impl CombinedStream {
    /// (video, audio) track counts of this stream.
    pub fn track_counts(&self) -> (u32, u32) {
        (1, self.audio.is_some() as u32)
    }
}

/// Trait for recorder backends.
pub trait RecorderBackend: Send {
    /// Start recording the combined stream.
    fn start(&mut self, stream: CombinedStream) -> EncoderResult<()>;

    /// Receiver for progressively delivered chunks (size reporting only;
    /// the authoritative sequence comes from [`stop`](Self::stop)).
    fn chunks(&self) -> Receiver<EncodedChunk>;

    /// Stop, flush, and return the complete chunk sequence in recording
    /// order.
    fn stop(&mut self) -> EncoderResult<Vec<EncodedChunk>>;

    /// Negotiated mime type.
    fn mime_type(&self) -> &'static str;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Create a recorder backend, preferring the enhanced recorder with a
/// baseline fallback.
pub fn create_recorder(
    host: Arc<dyn EncoderHost>,
    options: RecorderOptions,
) -> EncoderResult<Box<dyn RecorderBackend>> {
    match EnhancedRecorder::new(Arc::clone(&host), options) {
        Ok(recorder) => {
            info!("using enhanced recorder backend");
            Ok(Box::new(recorder))
        }
        Err(e) => {
            warn!("enhanced recorder unavailable: {e}, falling back to baseline");
            match BaselineRecorder::new(host, options) {
                Ok(recorder) => {
                    info!(mime = recorder.mime_type(), "using baseline recorder backend");
                    Ok(Box::new(recorder))
                }
                Err(e) => Err(EncoderError::Unavailable(e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::FakeHost;

    #[test]
    fn factory_prefers_enhanced_backend() {
        let host = Arc::new(FakeHost::supporting(&[MIME_H264_OPUS, MIME_VP9_OPUS, MIME_WEBM]));
        let options = RecorderOptions::from_settings(&VideoSettings::default());
        let recorder = create_recorder(host, options).unwrap();
        assert_eq!(recorder.name(), "enhanced");
        assert_eq!(recorder.mime_type(), MIME_H264_OPUS);
    }

    #[test]
    fn factory_falls_back_to_baseline() {
        let host = Arc::new(FakeHost::supporting(&[MIME_VP9_OPUS, MIME_WEBM]));
        let options = RecorderOptions::from_settings(&VideoSettings::default());
        let recorder = create_recorder(host, options).unwrap();
        assert_eq!(recorder.name(), "baseline");
        assert_eq!(recorder.mime_type(), MIME_VP9_OPUS);
    }

    #[test]
    fn factory_exhausts_fallback_chain() {
        let host = Arc::new(FakeHost::supporting(&[]));
        let options = RecorderOptions::from_settings(&VideoSettings::default());
        let err = create_recorder(host, options).err().unwrap();
        assert!(matches!(err, EncoderError::Unavailable(_)));
    }

    #[test]
    fn combined_stream_reports_track_counts() {
        let (_vtx, vrx) = crossbeam_channel::bounded(1);
        let (_atx, arx) = crossbeam_channel::bounded(1);
        let with_audio = CombinedStream {
            video: vrx.clone(),
            audio: Some(arx),
        };
        assert_eq!(with_audio.track_counts(), (1, 1));
        let without_audio = CombinedStream {
            video: vrx,
            audio: None,
        };
        assert_eq!(without_audio.track_counts(), (1, 0));
    }
}

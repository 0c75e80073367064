//! The enhanced recorder backend.
//!
//! Preferred when the platform can encode H.264+Opus; records at the
//! higher bitrate table. Falls through to the baseline backend otherwise.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, instrument};

use screenrec_ipc::QualityTier;

use crate::worker::Worker;
use crate::{
    CombinedStream, EncodedChunk, EncoderError, EncoderHost, EncoderRequest, EncoderResult,
    RecorderBackend, RecorderOptions, AUDIO_BITRATE_BPS, CHUNK_CHANNEL_CAPACITY, MIME_H264_OPUS,
};

/// Enhanced recorder: H.264+Opus at 12/6/3 Mbps.
pub struct EnhancedRecorder {
    host: Arc<dyn EncoderHost>,
    options: RecorderOptions,
    worker: Option<Worker>,
    chunk_tx: Sender<EncodedChunk>,
    chunk_rx: Receiver<EncodedChunk>,
}

impl EnhancedRecorder {
    /// Probe the host and construct the backend.
    pub fn new(host: Arc<dyn EncoderHost>, options: RecorderOptions) -> EncoderResult<Self> {
        if !host.supports_mime(MIME_H264_OPUS) {
            return Err(EncoderError::MimeUnsupported(MIME_H264_OPUS.to_string()));
        }

        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(CHUNK_CHANNEL_CAPACITY);
        Ok(Self {
            host,
            options,
            worker: None,
            chunk_tx,
            chunk_rx,
        })
    }

    /// Video bitrate for a quality tier, in bits per second.
    pub fn video_bitrate_bps(quality: QualityTier) -> u32 {
        match quality {
            QualityTier::High => 12_000_000,
            QualityTier::Medium => 6_000_000,
            QualityTier::Low => 3_000_000,
        }
    }
}

impl RecorderBackend for EnhancedRecorder {
    #[instrument(name = "enhanced_start", skip(self, stream))]
    fn start(&mut self, stream: CombinedStream) -> EncoderResult<()> {
        if self.worker.is_some() {
            return Err(EncoderError::AlreadyStarted);
        }

        let request = EncoderRequest {
            mime_type: MIME_H264_OPUS.to_string(),
            width: self.options.width,
            height: self.options.height,
            fps: self.options.fps,
            video_bitrate_bps: Self::video_bitrate_bps(self.options.quality),
            audio_bitrate_bps: AUDIO_BITRATE_BPS,
            has_audio: stream.audio.is_some(),
        };
        let encoder = self.host.create(&request)?;

        debug!(
            bitrate = request.video_bitrate_bps,
            timeslice_ms = self.options.timeslice_ms,
            "starting enhanced recorder"
        );
        self.worker = Some(Worker::spawn(
            encoder,
            stream,
            self.options.timeslice_ms,
            self.chunk_tx.clone(),
        )?);
        Ok(())
    }

    fn chunks(&self) -> Receiver<EncodedChunk> {
        self.chunk_rx.clone()
    }

    #[instrument(name = "enhanced_stop", skip(self))]
    fn stop(&mut self) -> EncoderResult<Vec<EncodedChunk>> {
        let Some(mut worker) = self.worker.take() else {
            return Err(EncoderError::NotStarted);
        };
        worker.finish()
    }

    fn mime_type(&self) -> &'static str {
        MIME_H264_OPUS
    }

    fn name(&self) -> &'static str {
        "enhanced"
    }
}

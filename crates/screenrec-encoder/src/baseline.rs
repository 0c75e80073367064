//! The baseline recorder backend.
//!
//! The fallback when the enhanced recorder is unavailable. Negotiates the
//! codec through the preference chain H.264+Opus → VP9+Opus → plain WebM,
//! and records at the lower bitrate table.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, instrument};

use screenrec_ipc::QualityTier;

use crate::worker::Worker;
use crate::{
    CombinedStream, EncodedChunk, EncoderError, EncoderHost, EncoderRequest, EncoderResult,
    RecorderBackend, RecorderOptions, AUDIO_BITRATE_BPS, CHUNK_CHANNEL_CAPACITY, MIME_H264_OPUS,
    MIME_VP9_OPUS, MIME_WEBM,
};

/// Baseline recorder: negotiated codec at 8/4/2 Mbps.
pub struct BaselineRecorder {
    host: Arc<dyn EncoderHost>,
    options: RecorderOptions,
    mime: &'static str,
    worker: Option<Worker>,
    chunk_tx: Sender<EncodedChunk>,
    chunk_rx: Receiver<EncodedChunk>,
}

impl BaselineRecorder {
    /// Negotiate a codec with the host and construct the backend.
    pub fn new(host: Arc<dyn EncoderHost>, options: RecorderOptions) -> EncoderResult<Self> {
        let mime = Self::negotiate_mime(host.as_ref())
            .ok_or_else(|| EncoderError::MimeUnsupported(MIME_WEBM.to_string()))?;

        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(CHUNK_CHANNEL_CAPACITY);
        Ok(Self {
            host,
            options,
            mime,
            worker: None,
            chunk_tx,
            chunk_rx,
        })
    }

    /// First supported mime type in preference order.
    fn negotiate_mime(host: &dyn EncoderHost) -> Option<&'static str> {
        [MIME_H264_OPUS, MIME_VP9_OPUS, MIME_WEBM]
            .into_iter()
            .find(|mime| host.supports_mime(mime))
    }

    /// Video bitrate for a quality tier, in bits per second.
    pub fn video_bitrate_bps(quality: QualityTier) -> u32 {
        match quality {
            QualityTier::High => 8_000_000,
            QualityTier::Medium => 4_000_000,
            QualityTier::Low => 2_000_000,
        }
    }
}

impl RecorderBackend for BaselineRecorder {
    #[instrument(name = "baseline_start", skip(self, stream))]
    fn start(&mut self, stream: CombinedStream) -> EncoderResult<()> {
        if self.worker.is_some() {
            return Err(EncoderError::AlreadyStarted);
        }

        let request = EncoderRequest {
            mime_type: self.mime.to_string(),
            width: self.options.width,
            height: self.options.height,
            fps: self.options.fps,
            video_bitrate_bps: Self::video_bitrate_bps(self.options.quality),
            audio_bitrate_bps: AUDIO_BITRATE_BPS,
            has_audio: stream.audio.is_some(),
        };
        let encoder = self.host.create(&request)?;

        debug!(
            mime = self.mime,
            bitrate = request.video_bitrate_bps,
            "starting baseline recorder"
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

    #[instrument(name = "baseline_stop", skip(self))]
    fn stop(&mut self) -> EncoderResult<Vec<EncodedChunk>> {
        let Some(mut worker) = self.worker.take() else {
            return Err(EncoderError::NotStarted);
        };
        worker.finish()
    }

    fn mime_type(&self) -> &'static str {
        self.mime
    }

    fn name(&self) -> &'static str {
        "baseline"
    }
}

//! Per-recording resource management: phased initialization and rollback.
//!
//! The start sequence acquires resources in a fixed phase order; when any
//! phase fails, every completed phase is rolled back in reverse so no
//! stream, graph or encoder leaks on the error path.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::{debug, info, instrument, warn};

use screenrec_audio::{AudioBackend, AudioChunk, AudioError, AudioStream, MixerGraph};
use screenrec_capture::{CaptureError, ScreenBackend, VideoStream};
use screenrec_encoder::{
    create_recorder, CombinedStream, EncodedChunk, EncoderHost, RecorderBackend, RecorderOptions,
};
use screenrec_ipc::{MediaKind, SessionError, StartPhase, VideoSettings};

/// Everything the start sequence needs, captured up front.
pub(crate) struct StartContext {
    pub screen: Arc<dyn ScreenBackend>,
    pub audio: Arc<dyn AudioBackend>,
    pub encoder: Arc<dyn EncoderHost>,
    pub source_id: String,
    pub settings: VideoSettings,
    /// Chunk receiver of the already-open microphone stream, when the
    /// microphone is enabled.
    pub mic_rx: Option<Receiver<AudioChunk>>,
    pub mic_gain: f32,
}

/// Resources acquired for the active recording.
pub(crate) struct SessionResources {
    pub video: Option<VideoStream>,
    pub system_audio: Option<AudioStream>,
    pub mixer: Option<MixerGraph>,
    pub recorder: Option<Box<dyn RecorderBackend>>,
    pub chunk_rx: Option<Receiver<EncodedChunk>>,
    current_phase: Option<StartPhase>,
}

impl SessionResources {
    pub fn new() -> Self {
        Self {
            video: None,
            system_audio: None,
            mixer: None,
            recorder: None,
            chunk_rx: None,
            current_phase: None,
        }
    }

    /// Run every start phase in order.
    #[instrument(name = "init_resources", skip(self, ctx))]
    pub fn initialize(&mut self, ctx: &StartContext) -> Result<(), SessionError> {
        let mut phase = StartPhase::OpenVideo;
        loop {
            self.current_phase = Some(phase);
            self.init_phase(ctx, phase)?;

            match phase.next() {
                Some(next) => phase = next,
                None => break,
            }
        }
        Ok(())
    }

    fn init_phase(&mut self, ctx: &StartContext, phase: StartPhase) -> Result<(), SessionError> {
        info!(phase = phase.name(), "initializing");
        match phase {
            StartPhase::OpenVideo => self.open_video(ctx),
            StartPhase::OpenSystemAudio => self.open_system_audio(ctx),
            StartPhase::InitMixer => self.init_mixer(ctx),
            StartPhase::StartEncoder => self.start_encoder(ctx),
        }
    }

    fn open_video(&mut self, ctx: &StartContext) -> Result<(), SessionError> {
        let stream = ctx
            .screen
            .open_video(&ctx.source_id, &ctx.settings)
            .map_err(|e| capture_error_to_session(e, &ctx.source_id))?;

        debug!("video stream opened");
        self.video = Some(stream);
        Ok(())
    }

    fn open_system_audio(&mut self, ctx: &StartContext) -> Result<(), SessionError> {
        match ctx
            .audio
            .open_loopback(&ctx.source_id)
            .map_err(audio_error_to_session)?
        {
            Some(stream) => {
                debug!("system audio stream opened");
                self.system_audio = Some(stream);
            }
            // Legitimate empty-capability result, not an error.
            None => debug!("source has no system audio"),
        }
        Ok(())
    }

    fn init_mixer(&mut self, ctx: &StartContext) -> Result<(), SessionError> {
        let mixer = MixerGraph::new().map_err(audio_error_to_session)?;

        match self.system_audio.as_ref() {
            Some(stream) => mixer.attach_system(stream.chunks()),
            None => warn!("no system audio track, system branch not attached"),
        }

        if let Some(mic_rx) = ctx.mic_rx.clone() {
            mixer.attach_mic(mic_rx, ctx.mic_gain);
        }

        self.mixer = Some(mixer);
        Ok(())
    }

    fn start_encoder(&mut self, ctx: &StartContext) -> Result<(), SessionError> {
        let options = RecorderOptions::from_settings(&ctx.settings);
        let mut recorder = create_recorder(Arc::clone(&ctx.encoder), options).map_err(|e| {
            warn!("no recorder backend available: {e}");
            SessionError::EncoderUnavailable
        })?;

        let video = match self.video.as_ref() {
            Some(stream) => stream.frames(),
            None => return Err(SessionError::EncoderUnavailable),
        };
        let audio = self.mixer.as_ref().map(|mixer| mixer.output());

        let stream = CombinedStream { video, audio };
        let (video_tracks, audio_tracks) = stream.track_counts();
        debug!(video_tracks, audio_tracks, "combined stream assembled");

        recorder.start(stream).map_err(|e| {
            warn!("recorder start failed: {e}");
            SessionError::EncoderUnavailable
        })?;

        self.chunk_rx = Some(recorder.chunks());
        self.recorder = Some(recorder);
        Ok(())
    }

    /// Roll back from the current phase backwards.
    #[instrument(name = "rollback_resources", skip(self))]
    pub fn rollback(&mut self) {
        if let Some(mut phase) = self.current_phase {
            loop {
                info!(phase = phase.name(), "rolling back");
                self.rollback_phase(phase);

                match phase.previous() {
                    Some(previous) => phase = previous,
                    None => break,
                }
            }
        }
        self.current_phase = None;
    }

    fn rollback_phase(&mut self, phase: StartPhase) {
        match phase {
            StartPhase::StartEncoder => {
                if let Some(mut recorder) = self.recorder.take() {
                    let _ = recorder.stop();
                }
                self.chunk_rx = None;
            }
            StartPhase::InitMixer => {
                if let Some(mut mixer) = self.mixer.take() {
                    mixer.close();
                }
            }
            StartPhase::OpenSystemAudio => {
                if let Some(mut stream) = self.system_audio.take() {
                    stream.close();
                }
            }
            StartPhase::OpenVideo => {
                if let Some(mut stream) = self.video.take() {
                    stream.close();
                }
            }
        }
    }

    /// Release capture-side resources after a normal stop. The recorder has
    /// already been taken and stopped by the caller.
    pub fn release_after_stop(&mut self) {
        self.chunk_rx = None;
        if let Some(mut mixer) = self.mixer.take() {
            mixer.close();
        }
        if let Some(mut stream) = self.system_audio.take() {
            stream.close();
        }
        if let Some(mut stream) = self.video.take() {
            stream.close();
        }
        self.current_phase = None;
    }
}

pub(crate) fn capture_error_to_session(error: CaptureError, source_id: &str) -> SessionError {
    match error {
        CaptureError::PermissionDenied => SessionError::PermissionDenied {
            media: MediaKind::Screen,
        },
        CaptureError::SourceUnavailable(id) => SessionError::SourceUnavailable { id },
        CaptureError::Backend(message) => {
            warn!("capture backend: {message}");
            SessionError::SourceUnavailable {
                id: source_id.to_string(),
            }
        }
    }
}

pub(crate) fn audio_error_to_session(error: AudioError) -> SessionError {
    match error {
        AudioError::PermissionDenied => SessionError::PermissionDenied {
            media: MediaKind::Microphone,
        },
        AudioError::DeviceUnavailable(id) => SessionError::DeviceUnavailable { id },
        AudioError::GraphInit(message) => SessionError::GraphInitFailed { message },
        AudioError::Backend(message) => {
            warn!("audio backend: {message}");
            SessionError::DeviceUnavailable {
                id: "default".to_string(),
            }
        }
    }
}

//! The session controller command loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, instrument, warn};

use screenrec_audio::{
    clamp_mic_gain, list_audio_devices, resolve_device, AudioBackend, AudioStream, LevelMeter,
    MicrophoneConstraints,
};
use screenrec_capture::{localized_sources, ScreenBackend};
use screenrec_encoder::{EncodedChunk, EncoderHost};
use screenrec_ipc::{
    QualityTier, RecordConfig, SessionCommand, SessionError, SessionEvent, SessionState,
    SourceInfo, SourceKind, StartPhase, VideoSettings,
};
use screenrec_storage::{
    container, suggested_file_name, PersistenceBridge, RecordingArtifact, SaveLocation,
};

use crate::preview::PreviewPump;
use crate::resources::{audio_error_to_session, SessionResources, StartContext};
use crate::settings::{Settings, SettingsStore};

/// The injected platform capabilities the engine runs against.
pub struct PlatformHosts {
    pub screen: Arc<dyn ScreenBackend>,
    pub audio: Arc<dyn AudioBackend>,
    pub encoder: Arc<dyn EncoderHost>,
    pub persistence: Arc<dyn PersistenceBridge>,
}

/// A running microphone test: the probe stream plus its level meter.
struct MicTest {
    stream: AudioStream,
    meter: LevelMeter,
}

/// The recording session controller.
///
/// All state transitions and mixer mutations execute on this single
/// command loop, so they are atomic with respect to each other.
pub struct Engine {
    command_rx: Receiver<SessionCommand>,
    event_tx: Sender<SessionEvent>,
    hosts: PlatformHosts,
    settings_store: Arc<dyn SettingsStore>,
    settings: Settings,
    video_settings: VideoSettings,
    performance_mode: bool,
    state: SessionState,
    resources: SessionResources,
    /// The microphone stream outlives individual recordings: it is released
    /// at stop time only when the user has the microphone disabled.
    mic: Option<AudioStream>,
    mic_enabled: bool,
    mic_test: Option<MicTest>,
    preview: Option<PreviewPump>,
    artifact_chunks: Vec<EncodedChunk>,
    recording_started: Option<Instant>,
    recorded_bytes: u64,
    last_tick: Instant,
}

impl Engine {
    /// Create a new engine.
    pub fn new(
        hosts: PlatformHosts,
        settings_store: Arc<dyn SettingsStore>,
        command_rx: Receiver<SessionCommand>,
        event_tx: Sender<SessionEvent>,
    ) -> Self {
        let settings = settings_store.load().unwrap_or_default().clamped();

        Self {
            command_rx,
            event_tx,
            hosts,
            settings_store,
            settings,
            video_settings: VideoSettings::default(),
            performance_mode: false,
            state: SessionState::Idle,
            resources: SessionResources::new(),
            mic: None,
            mic_enabled: false,
            mic_test: None,
            preview: None,
            artifact_chunks: Vec::new(),
            recording_started: None,
            recorded_bytes: 0,
            last_tick: Instant::now(),
        }
    }

    /// Run the engine (blocking).
    #[instrument(name = "engine_run", skip(self))]
    pub fn run(&mut self) {
        info!("engine starting");
        self.send_event(SessionEvent::Ready);

        loop {
            match self.command_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => self.on_tick(),
                Err(RecvTimeoutError::Disconnected) => {
                    info!("command channel disconnected, shutting down");
                    self.teardown();
                    break;
                }
            }
        }

        info!("engine stopped");
    }

    /// Handle a command. Returns false if the engine should stop.
    fn handle_command(&mut self, command: SessionCommand) -> bool {
        debug!(?command, "handling command");

        match command {
            SessionCommand::ListSources { kind } => self.list_sources(kind),
            SessionCommand::ListAudioDevices => self.list_devices(),
            SessionCommand::SelectSource { source } => self.select_source(source),
            SessionCommand::SelectMicrophone { device_id } => self.select_microphone(device_id),
            SessionCommand::SetMicGain(gain) => self.set_mic_gain(gain),
            SessionCommand::ToggleMicrophone => self.toggle_microphone(),
            SessionCommand::SetResolution { width, height } => {
                self.video_settings.width = width;
                self.video_settings.height = height;
                self.apply_video_settings();
            }
            SessionCommand::SetFps(fps) => {
                self.video_settings.fps = fps;
                self.apply_video_settings();
            }
            SessionCommand::SetQuality(quality) => {
                self.video_settings.quality = quality;
                self.apply_video_settings();
            }
            SessionCommand::SetLanguage(language) => {
                self.settings.language = language;
                self.settings_store.save(&self.settings);
            }
            SessionCommand::SetPerformanceMode(enabled) => self.set_performance_mode(enabled),
            SessionCommand::StartMicTest => self.start_mic_test(),
            SessionCommand::StopMicTest => self.stop_mic_test(),
            SessionCommand::Start => self.start_recording(),
            SessionCommand::Stop => self.stop_recording(),
            SessionCommand::Save => self.save_recording(),
            SessionCommand::Discard => self.discard_recording(),
            SessionCommand::GetState => self.send_state(),
            SessionCommand::Shutdown => {
                self.teardown();
                self.send_event(SessionEvent::Shutdown);
                return false;
            }
        }

        true
    }

    /// Maintenance work between commands: running size, level meter
    /// forwarding, and the 1-second recording tick.
    fn on_tick(&mut self) {
        if let Some(chunk_rx) = self.resources.chunk_rx.as_ref() {
            let delivered: u64 = chunk_rx.try_iter().map(|c| c.data.len() as u64).sum();
            self.recorded_bytes += delivered;
        }

        if let Some(test) = self.mic_test.as_ref() {
            let levels: Vec<f32> = test.meter.levels().try_iter().collect();
            for level in levels {
                self.send_event(SessionEvent::MicLevel { level });
            }
        }

        if self.state.is_recording() && self.last_tick.elapsed() >= Duration::from_secs(1) {
            self.last_tick = Instant::now();
            let elapsed_secs = self
                .recording_started
                .map(|started| started.elapsed().as_secs())
                .unwrap_or(0);
            self.send_event(SessionEvent::RecordingTick {
                elapsed_secs,
                recorded_bytes: self.recorded_bytes,
            });
        }
    }

    fn list_sources(&mut self, kind: SourceKind) {
        match self.hosts.screen.enumerate_sources() {
            Ok(sources) => {
                let sources = localized_sources(sources, kind, &self.settings.language);
                self.send_event(SessionEvent::SourcesListed(sources));
            }
            Err(e) => {
                // Fail soft: empty list plus one recoverable notification.
                warn!("source enumeration failed: {e}");
                self.send_event(SessionEvent::Error {
                    error: SessionError::SourceUnavailable {
                        id: kind.id_prefix().trim_end_matches(':').to_string(),
                    },
                    recoverable: true,
                });
                self.send_event(SessionEvent::SourcesListed(Vec::new()));
            }
        }
    }

    fn list_devices(&mut self) {
        match list_audio_devices(self.hosts.audio.as_ref()) {
            Ok(devices) => self.send_event(SessionEvent::AudioDevicesListed(devices)),
            Err(e) => {
                // Enumeration soft-failure: degrade to an empty list.
                warn!("audio device enumeration failed: {e}");
                self.send_event(SessionEvent::AudioDevicesListed(Vec::new()));
            }
        }
    }

    fn select_source(&mut self, source: SourceInfo) {
        if !(self.state.is_idle() || self.state.is_armed()) {
            warn!(state = self.state.name(), "ignoring source selection");
            return;
        }

        debug!(id = %source.id, "source selected");
        self.transition_to(SessionState::Armed { source });
        self.restart_preview();
    }

    fn select_microphone(&mut self, device_id: Option<String>) {
        // Applied the next time a microphone stream is opened.
        self.settings.microphone_device = device_id;
        self.settings_store.save(&self.settings);
    }

    fn set_mic_gain(&mut self, gain: f32) {
        let gain = clamp_mic_gain(gain);
        self.settings.microphone_gain = gain;
        self.settings_store.save(&self.settings);

        // Live-update the running graph and meter.
        if let Some(mixer) = self.resources.mixer.as_ref() {
            mixer.set_mic_gain(gain);
        }
        if let Some(test) = self.mic_test.as_ref() {
            test.meter.set_gain(gain);
        }
    }

    fn toggle_microphone(&mut self) {
        if self.mic_enabled {
            self.mic_enabled = false;

            if self.state.is_recording() {
                // Detach from the live graph; the stream stays open and the
                // remaining branches are uninterrupted.
                if let Some(mixer) = self.resources.mixer.as_ref() {
                    mixer.detach_mic();
                }
            } else if let Some(mut stream) = self.mic.take() {
                stream.close();
            }

            self.send_event(SessionEvent::MicrophoneToggled { enabled: false });
            return;
        }

        let device_id = self.microphone_device();
        match self
            .hosts
            .audio
            .open_microphone(device_id.as_deref(), &MicrophoneConstraints::default())
        {
            Ok(stream) => {
                if self.state.is_recording() {
                    // Hot-attach without stopping the recording.
                    if let Some(mixer) = self.resources.mixer.as_ref() {
                        mixer.attach_mic(stream.chunks(), self.settings.microphone_gain);
                    }
                }
                self.mic = Some(stream);
                self.mic_enabled = true;
                self.send_event(SessionEvent::MicrophoneToggled { enabled: true });
            }
            Err(e) => {
                self.send_event(SessionEvent::Error {
                    error: audio_error_to_session(e),
                    recoverable: true,
                });
            }
        }
    }

    fn apply_video_settings(&mut self) {
        self.send_event(SessionEvent::EstimatedSize {
            mb_per_minute: self.video_settings.estimated_size_mb_per_minute(),
        });

        // While recording, the new settings take effect on the next
        // recording; the running encoder is never mutated.
        if self.state.is_armed() && !self.performance_mode {
            self.restart_preview();
        }
    }

    fn set_performance_mode(&mut self, enabled: bool) {
        self.performance_mode = enabled;

        if enabled {
            self.stop_preview();
            self.video_settings.quality = QualityTier::High;
            self.send_event(SessionEvent::EstimatedSize {
                mb_per_minute: self.video_settings.estimated_size_mb_per_minute(),
            });
        } else if self.state.is_armed() {
            self.restart_preview();
        }
    }

    fn start_mic_test(&mut self) {
        if self.mic_test.is_some() {
            self.stop_mic_test();
            return;
        }

        let device_id = self.microphone_device();
        match self
            .hosts
            .audio
            .open_microphone(device_id.as_deref(), &MicrophoneConstraints::default())
        {
            Ok(stream) => {
                match LevelMeter::start(stream.chunks(), self.settings.microphone_gain) {
                    Ok(meter) => self.mic_test = Some(MicTest { stream, meter }),
                    Err(e) => warn!("level meter could not be started: {e}"),
                }
            }
            Err(e) => {
                self.send_event(SessionEvent::Error {
                    error: audio_error_to_session(e),
                    recoverable: true,
                });
            }
        }
    }

    fn stop_mic_test(&mut self) {
        if let Some(mut test) = self.mic_test.take() {
            test.meter.stop();
            test.stream.close();
        }
    }

    /// The persisted device selection is a weak reference: resolve it
    /// against the current enumeration and fall back to the platform
    /// default when the device has been unplugged.
    fn microphone_device(&self) -> Option<String> {
        let wanted = self.settings.microphone_device.clone()?;
        match self.hosts.audio.enumerate_inputs() {
            Ok(devices) => resolve_device(&devices, Some(&wanted)).map(|device| device.id.clone()),
            Err(e) => {
                debug!("device enumeration unavailable, using stored id: {e}");
                Some(wanted)
            }
        }
    }

    #[instrument(name = "start_recording", skip(self))]
    fn start_recording(&mut self) {
        let source = match &self.state {
            SessionState::Armed { source } => source.clone(),
            SessionState::Idle => {
                // User error: no side effects, nothing opened.
                self.send_event(SessionEvent::Error {
                    error: SessionError::NoSourceSelected,
                    recoverable: true,
                });
                return;
            }
            _ => {
                debug!(state = self.state.name(), "ignoring start");
                return;
            }
        };

        self.transition_to(SessionState::Starting {
            phase: StartPhase::OpenVideo,
        });

        let mic_rx = if self.mic_enabled {
            self.mic.as_ref().map(|stream| stream.chunks())
        } else {
            None
        };

        let ctx = StartContext {
            screen: Arc::clone(&self.hosts.screen),
            audio: Arc::clone(&self.hosts.audio),
            encoder: Arc::clone(&self.hosts.encoder),
            source_id: source.id.clone(),
            settings: self.video_settings,
            mic_rx,
            mic_gain: self.settings.microphone_gain,
        };

        match self.resources.initialize(&ctx) {
            Ok(()) => {
                self.recording_started = Some(Instant::now());
                self.recorded_bytes = 0;
                self.artifact_chunks.clear();
                self.last_tick = Instant::now();

                let config = RecordConfig {
                    source,
                    settings: self.video_settings,
                    mic_enabled: self.mic_enabled,
                    mic_device: self.settings.microphone_device.clone(),
                };
                self.transition_to(SessionState::Recording { config });
                info!("recording started");
            }
            Err(error) => {
                warn!("recording start failed: {error}");
                self.resources.rollback();
                self.transition_to(SessionState::Armed { source });
                self.send_event(SessionEvent::Error {
                    error,
                    recoverable: true,
                });
            }
        }
    }

    #[instrument(name = "stop_recording", skip(self))]
    fn stop_recording(&mut self) {
        let config = match &self.state {
            SessionState::Recording { config } => config.clone(),
            _ => {
                // Idempotent: stop outside Recording has no effect.
                debug!(state = self.state.name(), "ignoring stop");
                return;
            }
        };

        let chunks = match self.resources.recorder.take() {
            Some(mut recorder) => match recorder.stop() {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!("recorder stop failed: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        self.resources.release_after_stop();

        // The microphone stream is kept for the next recording unless the
        // user has it disabled.
        if !self.mic_enabled {
            if let Some(mut stream) = self.mic.take() {
                stream.close();
            }
        }

        let total_bytes: u64 = chunks.iter().map(|c| c.data.len() as u64).sum();
        if total_bytes == 0 {
            // Zero-byte artifact: nothing to present; report and re-arm.
            self.clear_session();
            self.transition_to(SessionState::Armed {
                source: config.source,
            });
            self.send_event(SessionEvent::Error {
                error: SessionError::EncoderUnavailable,
                recoverable: true,
            });
            return;
        }

        let chunk_count = chunks.len();
        self.recorded_bytes = total_bytes;
        self.artifact_chunks = chunks;
        self.recording_started = None;
        info!(chunk_count, total_bytes, "recording stopped");
        self.transition_to(SessionState::Stopped {
            chunk_count,
            total_bytes,
        });
    }

    #[instrument(name = "save_recording", skip(self))]
    fn save_recording(&mut self) {
        if !self.state.is_stopped() {
            warn!(state = self.state.name(), "ignoring save");
            return;
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let suggested =
            suggested_file_name(&self.video_settings, &self.settings.language, &timestamp);

        let location = match self.hosts.persistence.choose_save_location(&suggested) {
            Ok(location) => location,
            Err(e) => {
                self.send_event(SessionEvent::Error {
                    error: SessionError::PersistenceFailure {
                        message: e.to_string(),
                    },
                    recoverable: true,
                });
                return;
            }
        };

        let path = match location {
            SaveLocation::Path(path) => path,
            SaveLocation::Cancelled => {
                // Not an error; the artifact stays available.
                self.send_event(SessionEvent::SaveCancelled);
                return;
            }
        };

        let artifact = RecordingArtifact::new(
            self.artifact_chunks
                .iter()
                .map(|chunk| chunk.data.clone())
                .collect(),
        );
        let blob = artifact.into_bytes();
        if let Some((video_tracks, audio_tracks)) = container::count_tracks(&blob) {
            debug!(video_tracks, audio_tracks, "saving artifact");
        }

        match self.hosts.persistence.write_bytes(&blob, &path) {
            Ok(written) => {
                let bytes = blob.len() as u64;
                self.clear_session();
                self.stop_preview();
                self.transition_to(SessionState::Idle);
                self.send_event(SessionEvent::Saved {
                    path: written.display().to_string(),
                    bytes,
                });
            }
            Err(e) => {
                // State stays Stopped so the artifact is not lost.
                self.send_event(SessionEvent::Error {
                    error: SessionError::PersistenceFailure {
                        message: e.to_string(),
                    },
                    recoverable: true,
                });
            }
        }
    }

    fn discard_recording(&mut self) {
        if !self.state.is_stopped() {
            debug!(state = self.state.name(), "ignoring discard");
            return;
        }

        self.clear_session();
        self.stop_preview();
        self.transition_to(SessionState::Idle);
        self.send_event(SessionEvent::Discarded);
    }

    fn send_state(&mut self) {
        let state = self.state.clone();
        self.send_event(SessionEvent::StateChanged {
            previous: Box::new(state.clone()),
            current: Box::new(state),
        });
    }

    fn restart_preview(&mut self) {
        self.stop_preview();
        if self.performance_mode {
            return;
        }

        let source_id = match &self.state {
            SessionState::Armed { source } => source.id.clone(),
            _ => return,
        };

        match self.hosts.screen.open_video(&source_id, &self.video_settings) {
            Ok(stream) => match PreviewPump::start(stream, self.event_tx.clone()) {
                Ok(pump) => self.preview = Some(pump),
                Err(e) => warn!("preview pump could not be started: {e}"),
            },
            Err(e) => {
                warn!("preview could not be started: {e}");
                self.send_event(SessionEvent::Error {
                    error: crate::resources::capture_error_to_session(e, &source_id),
                    recoverable: true,
                });
            }
        }
    }

    fn stop_preview(&mut self) {
        if let Some(pump) = self.preview.take() {
            pump.stop();
        }
    }

    fn clear_session(&mut self) {
        self.artifact_chunks.clear();
        self.recorded_bytes = 0;
        self.recording_started = None;
    }

    /// Release everything; used on shutdown and channel disconnect.
    fn teardown(&mut self) {
        if self.state.is_recording() {
            self.stop_recording();
        }
        self.stop_mic_test();
        self.stop_preview();
        if let Some(mut stream) = self.mic.take() {
            stream.close();
        }
        self.resources.release_after_stop();
        self.clear_session();
    }

    fn transition_to(&mut self, new_state: SessionState) {
        let previous = std::mem::replace(&mut self.state, new_state.clone());

        debug!(
            previous = previous.name(),
            current = new_state.name(),
            "state transition"
        );

        self.send_event(SessionEvent::StateChanged {
            previous: Box::new(previous),
            current: Box::new(new_state),
        });
    }

    fn send_event(&self, event: SessionEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("failed to send event: {e}");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.teardown();
    }
}

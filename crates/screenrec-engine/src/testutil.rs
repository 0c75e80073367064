//! Fake platform hosts and a harness for driving the engine in tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use screenrec_audio::{
    AudioBackend, AudioChunk, AudioError, AudioResult, AudioStream, MicrophoneConstraints,
};
use screenrec_capture::{
    CaptureError, CaptureResult, CapturedFrame, CaptureTimestamp, ScreenBackend, VideoStream,
};
use screenrec_encoder::{
    EncoderError, EncoderHost, EncoderRequest, EncoderResult, MediaEncoder,
};
use screenrec_ipc::{
    command_channel, event_channel, AudioDeviceInfo, SessionCommand, SessionEvent, SessionState,
    SourceInfo, SourceKind, VideoSettings,
};
use screenrec_storage::{
    container::{self, TrackKind},
    write_atomic, PersistenceBridge, SaveLocation, StorageResult,
};

use crate::settings::{Settings, SettingsStore};
use crate::{Engine, PlatformHosts};

pub fn screen_source(id: &str, name: &str) -> SourceInfo {
    SourceInfo {
        id: id.to_string(),
        name: name.to_string(),
        kind: SourceKind::Screen,
        thumbnail_png: None,
    }
}

struct CountingVideoStop(Arc<AtomicUsize>);

impl screenrec_capture::StreamHandle for CountingVideoStop {
    fn stop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct CountingAudioStop(Arc<AtomicUsize>);

impl screenrec_audio::StreamHandle for CountingAudioStop {
    fn stop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeScreenBackend {
    pub sources: Vec<SourceInfo>,
    pub frame_senders: Mutex<Vec<Sender<CapturedFrame>>>,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
    pub fail_enumerate: AtomicBool,
}

impl FakeScreenBackend {
    pub fn new(sources: Vec<SourceInfo>) -> Self {
        Self {
            sources,
            frame_senders: Mutex::new(Vec::new()),
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            fail_enumerate: AtomicBool::new(false),
        }
    }

    /// Sender feeding the most recently opened stream.
    pub fn latest_frame_sender(&self) -> Sender<CapturedFrame> {
        self.frame_senders
            .lock()
            .last()
            .cloned()
            .expect("no video stream opened")
    }

    pub fn push_frame(&self, pts_ms: u64, sequence: u64) {
        let frame = CapturedFrame::new(
            Bytes::from_static(&[9, 9, 9, 9]),
            2,
            1,
            CaptureTimestamp::from_pts_100ns(pts_ms * 10_000),
            sequence,
        );
        self.latest_frame_sender().send(frame).expect("stream gone");
    }
}

impl ScreenBackend for FakeScreenBackend {
    fn enumerate_sources(&self) -> CaptureResult<Vec<SourceInfo>> {
        if self.fail_enumerate.load(Ordering::SeqCst) {
            return Err(CaptureError::Backend("enumeration failed".to_string()));
        }
        Ok(self.sources.clone())
    }

    fn open_video(&self, source_id: &str, settings: &VideoSettings) -> CaptureResult<VideoStream> {
        if !self.sources.iter().any(|s| s.id == source_id) {
            return Err(CaptureError::SourceUnavailable(source_id.to_string()));
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = crossbeam_channel::bounded(64);
        self.frame_senders.lock().push(tx);
        Ok(VideoStream::new(
            rx,
            settings.width,
            settings.height,
            settings.fps,
            Box::new(CountingVideoStop(Arc::clone(&self.closed))),
        ))
    }
}

pub struct FakeAudioBackend {
    pub devices: Vec<AudioDeviceInfo>,
    pub deny_mic: AtomicBool,
    pub loopback_present: bool,
    pub mic_senders: Mutex<Vec<Sender<AudioChunk>>>,
    pub loopback_senders: Mutex<Vec<Sender<AudioChunk>>>,
    pub mic_opened: AtomicUsize,
    pub mic_closed: Arc<AtomicUsize>,
    pub loopback_closed: Arc<AtomicUsize>,
}

impl FakeAudioBackend {
    pub fn new(loopback_present: bool) -> Self {
        Self {
            devices: vec![AudioDeviceInfo {
                id: "usb-mic".to_string(),
                label: "USB Microphone".to_string(),
                is_default: true,
            }],
            deny_mic: AtomicBool::new(false),
            loopback_present,
            mic_senders: Mutex::new(Vec::new()),
            loopback_senders: Mutex::new(Vec::new()),
            mic_opened: AtomicUsize::new(0),
            mic_closed: Arc::new(AtomicUsize::new(0)),
            loopback_closed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl AudioBackend for FakeAudioBackend {
    fn enumerate_inputs(&self) -> AudioResult<Vec<AudioDeviceInfo>> {
        Ok(self.devices.clone())
    }

    fn open_microphone(
        &self,
        device_id: Option<&str>,
        _constraints: &MicrophoneConstraints,
    ) -> AudioResult<AudioStream> {
        if self.deny_mic.load(Ordering::SeqCst) {
            return Err(AudioError::PermissionDenied);
        }

        self.mic_opened.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = crossbeam_channel::bounded(64);
        self.mic_senders.lock().push(tx);
        Ok(AudioStream::new(
            rx,
            device_id.map(str::to_string),
            Box::new(CountingAudioStop(Arc::clone(&self.mic_closed))),
        ))
    }

    fn open_loopback(&self, _source_id: &str) -> AudioResult<Option<AudioStream>> {
        if !self.loopback_present {
            return Ok(None);
        }

        let (tx, rx) = crossbeam_channel::bounded(64);
        self.loopback_senders.lock().push(tx);
        Ok(Some(AudioStream::new(
            rx,
            None,
            Box::new(CountingAudioStop(Arc::clone(&self.loopback_closed))),
        )))
    }
}

/// A platform encoder that emits real container framing: a header on the
/// first video write, then one cluster per frame. Audio writes are accepted
/// but emit nothing, keeping chunk boundaries deterministic.
struct FakeMediaEncoder {
    pending: BytesMut,
    has_audio: bool,
    header_written: bool,
}

impl MediaEncoder for FakeMediaEncoder {
    fn write_video(&mut self, frame: &CapturedFrame) -> EncoderResult<()> {
        if !self.header_written {
            self.header_written = true;
            let tracks: &[TrackKind] = if self.has_audio {
                &[TrackKind::Video, TrackKind::Audio]
            } else {
                &[TrackKind::Video]
            };
            self.pending.extend_from_slice(&container::build_header(tracks));
        }
        self.pending
            .extend_from_slice(&container::build_cluster(frame.timestamp.pts_ms(), &frame.data));
        Ok(())
    }

    fn write_audio(&mut self, _chunk: &screenrec_audio::MixedChunk) -> EncoderResult<()> {
        Ok(())
    }

    fn take_output(&mut self) -> Bytes {
        self.pending.split().freeze()
    }

    fn finish(&mut self) -> EncoderResult<Bytes> {
        Ok(self.pending.split().freeze())
    }
}

pub struct FakeEncoderHost {
    pub supported: Vec<String>,
}

impl FakeEncoderHost {
    pub fn supporting(mimes: &[&str]) -> Self {
        Self {
            supported: mimes.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn all_codecs() -> Self {
        Self::supporting(&[
            screenrec_encoder::MIME_H264_OPUS,
            screenrec_encoder::MIME_VP9_OPUS,
            screenrec_encoder::MIME_WEBM,
        ])
    }
}

impl EncoderHost for FakeEncoderHost {
    fn supports_mime(&self, mime: &str) -> bool {
        self.supported.iter().any(|m| m == mime)
    }

    fn create(&self, request: &EncoderRequest) -> EncoderResult<Box<dyn MediaEncoder>> {
        if self.supported.is_empty() {
            return Err(EncoderError::Unavailable("no codecs".to_string()));
        }
        Ok(Box::new(FakeMediaEncoder {
            pending: BytesMut::new(),
            has_audio: request.has_audio,
            header_written: false,
        }))
    }
}

pub struct FakeBridge {
    pub location: Mutex<SaveLocation>,
    pub writes: Mutex<Vec<PathBuf>>,
    pub fail_write: AtomicBool,
    pub write_to_disk: bool,
}

impl FakeBridge {
    pub fn saving_to(path: PathBuf, write_to_disk: bool) -> Self {
        Self {
            location: Mutex::new(SaveLocation::Path(path)),
            writes: Mutex::new(Vec::new()),
            fail_write: AtomicBool::new(false),
            write_to_disk,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            location: Mutex::new(SaveLocation::Cancelled),
            writes: Mutex::new(Vec::new()),
            fail_write: AtomicBool::new(false),
            write_to_disk: false,
        }
    }
}

impl PersistenceBridge for FakeBridge {
    fn choose_save_location(&self, _suggested_name: &str) -> StorageResult<SaveLocation> {
        Ok(self.location.lock().clone())
    }

    fn write_bytes(&self, data: &[u8], path: &Path) -> StorageResult<PathBuf> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(screenrec_storage::StorageError::WriteFailed(
                "disk full".to_string(),
            ));
        }

        self.writes.lock().push(path.to_path_buf());
        if self.write_to_disk {
            write_atomic(data, path)
        } else {
            Ok(path.to_path_buf())
        }
    }
}

#[derive(Default)]
pub struct MemorySettingsStore {
    pub saved: Mutex<Option<Settings>>,
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Option<Settings> {
        self.saved.lock().clone()
    }

    fn save(&self, settings: &Settings) {
        *self.saved.lock() = Some(settings.clone());
    }
}

/// A running engine with channel handles and shared fakes.
pub struct Harness {
    pub commands: Sender<SessionCommand>,
    pub events: Receiver<SessionEvent>,
    pub screen: Arc<FakeScreenBackend>,
    pub audio: Arc<FakeAudioBackend>,
    pub bridge: Arc<FakeBridge>,
    pub store: Arc<MemorySettingsStore>,
    thread: Option<JoinHandle<()>>,
}

impl Harness {
    pub fn launch(
        screen: FakeScreenBackend,
        audio: FakeAudioBackend,
        encoder: FakeEncoderHost,
        bridge: FakeBridge,
    ) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let screen = Arc::new(screen);
        let audio = Arc::new(audio);
        let bridge = Arc::new(bridge);
        let store = Arc::new(MemorySettingsStore::default());

        let hosts = PlatformHosts {
            screen: Arc::clone(&screen) as Arc<dyn ScreenBackend>,
            audio: Arc::clone(&audio) as Arc<dyn AudioBackend>,
            encoder: Arc::new(encoder) as Arc<dyn EncoderHost>,
            persistence: Arc::clone(&bridge) as Arc<dyn PersistenceBridge>,
        };

        let (command_tx, command_rx) = command_channel();
        let (event_tx, event_rx) = event_channel();

        let store_for_engine = Arc::clone(&store) as Arc<dyn SettingsStore>;
        let thread = std::thread::spawn(move || {
            let mut engine = Engine::new(hosts, store_for_engine, command_rx, event_tx);
            engine.run();
        });

        let harness = Self {
            commands: command_tx,
            events: event_rx,
            screen,
            audio,
            bridge,
            store,
            thread: Some(thread),
        };
        harness.wait_for(|e| matches!(e, SessionEvent::Ready), "engine ready");
        harness
    }

    pub fn send(&self, command: SessionCommand) {
        self.commands.send(command).expect("engine gone");
    }

    /// Wait for the first event matching the predicate, discarding others.
    pub fn wait_for(
        &self,
        predicate: impl Fn(&SessionEvent) -> bool,
        what: &str,
    ) -> SessionEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(event) = self.events.recv_timeout(Duration::from_millis(100)) {
                if predicate(&event) {
                    return event;
                }
            }
        }
        panic!("timed out waiting for {what}");
    }

    /// Wait until the engine reports entering the given state name.
    pub fn wait_for_state(&self, name: &str) -> SessionState {
        let event = self.wait_for(
            |e| matches!(e, SessionEvent::StateChanged { current, .. } if current.name() == name),
            name,
        );
        match event {
            SessionEvent::StateChanged { current, .. } => *current,
            _ => unreachable!(),
        }
    }

    /// Query the current state via GetState (prev == current marks the
    /// query response).
    pub fn state(&self) -> SessionState {
        self.send(SessionCommand::GetState);
        let event = self.wait_for(
            |e| matches!(e, SessionEvent::StateChanged { previous, current } if previous == current),
            "state query",
        );
        match event {
            SessionEvent::StateChanged { current, .. } => *current,
            _ => unreachable!(),
        }
    }

    pub fn shutdown(mut self) {
        self.send(SessionCommand::Shutdown);
        self.wait_for(|e| matches!(e, SessionEvent::Shutdown), "shutdown");
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.commands.send(SessionCommand::Shutdown);
            let _ = thread.join();
        }
    }
}

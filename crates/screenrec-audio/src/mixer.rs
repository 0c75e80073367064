//! The two-branch audio mixer graph.
//!
//! Summation happens here, before the encoder sees the stream, because
//! recording encoders accept only a single audio track per output. The
//! graph owns a 10ms-cadence mix thread; branches are hot-pluggable slots
//! that can be attached and detached without interrupting each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace};

use crate::chunk::AudioChunk;
use crate::error::AudioError;
use crate::{
    clamp_mic_gain, AudioResult, AUDIO_CHANNEL_CAPACITY, DEFAULT_MIC_GAIN, SAMPLES_PER_CHUNK,
    SYSTEM_GAIN,
};

/// A mixed audio output chunk.
#[derive(Debug, Clone)]
pub struct MixedChunk {
    /// Mono f32 samples.
    pub samples: Vec<f32>,

    /// Presentation timestamp in 100ns units.
    pub pts_100ns: u64,

    /// Sequence number.
    pub sequence: u64,
}

type BranchSlot = Arc<Mutex<Option<Receiver<AudioChunk>>>>;

/// The real-time audio mixer graph.
///
/// Holds at most one system branch (fixed unity gain) and at most one
/// microphone branch (live-adjustable gain). The output receiver identity
/// is stable for the graph's lifetime; teardown happens exactly once.
pub struct MixerGraph {
    mix_thread: Option<JoinHandle<()>>,
    should_stop: Arc<AtomicBool>,
    output: Receiver<MixedChunk>,
    system_slot: BranchSlot,
    mic_slot: BranchSlot,
    mic_gain: Arc<RwLock<f32>>,
}

impl MixerGraph {
    /// Allocate the mixing context and start the mix thread.
    #[instrument(name = "mixer_create")]
    pub fn new() -> AudioResult<Self> {
        let (sender, output) = crossbeam_channel::bounded(AUDIO_CHANNEL_CAPACITY);

        let should_stop = Arc::new(AtomicBool::new(false));
        let system_slot: BranchSlot = Arc::new(Mutex::new(None));
        let mic_slot: BranchSlot = Arc::new(Mutex::new(None));
        let mic_gain = Arc::new(RwLock::new(DEFAULT_MIC_GAIN));

        let handle = thread::Builder::new()
            .name("audio-mixer".into())
            .spawn({
                let should_stop = Arc::clone(&should_stop);
                let system_slot = Arc::clone(&system_slot);
                let mic_slot = Arc::clone(&mic_slot);
                let mic_gain = Arc::clone(&mic_gain);
                move || mix_thread(sender, should_stop, system_slot, mic_slot, mic_gain)
            })
            .map_err(|e| AudioError::GraphInit(e.to_string()))?;

        info!("mixer graph created");
        Ok(Self {
            mix_thread: Some(handle),
            should_stop,
            output,
            system_slot,
            mic_slot,
            mic_gain,
        })
    }

    /// Connect the system-audio branch at fixed unity gain.
    pub fn attach_system(&self, chunks: Receiver<AudioChunk>) {
        let previous = self.system_slot.lock().replace(chunks);
        if previous.is_some() {
            debug!("previous system branch discarded");
        }
        debug!("system branch attached");
    }

    /// Connect the microphone branch at the given gain.
    ///
    /// Any previous microphone branch is disconnected and discarded first,
    /// so exactly one microphone branch feeds the summing stage at a time.
    pub fn attach_mic(&self, chunks: Receiver<AudioChunk>, gain: f32) {
        *self.mic_gain.write() = clamp_mic_gain(gain);
        let previous = self.mic_slot.lock().replace(chunks);
        if previous.is_some() {
            debug!("previous microphone branch discarded");
        }
        debug!(gain = self.mic_gain(), "microphone branch attached");
    }

    /// Live-update the microphone gain; takes effect on the next mixed
    /// frame.
    pub fn set_mic_gain(&self, gain: f32) {
        *self.mic_gain.write() = clamp_mic_gain(gain);
    }

    /// Current microphone gain.
    pub fn mic_gain(&self) -> f32 {
        *self.mic_gain.read()
    }

    /// Disconnect the microphone branch. The system branch is unaffected.
    pub fn detach_mic(&self) {
        if self.mic_slot.lock().take().is_some() {
            debug!("microphone branch detached");
        }
    }

    /// Whether a system branch is connected.
    pub fn has_system_branch(&self) -> bool {
        self.system_slot.lock().is_some()
    }

    /// Whether a microphone branch is connected.
    pub fn has_mic_branch(&self) -> bool {
        self.mic_slot.lock().is_some()
    }

    /// The single mixed output track. Identity is stable for the graph's
    /// lifetime.
    pub fn output(&self) -> Receiver<MixedChunk> {
        self.output.clone()
    }

    /// Stop the mix thread and drop the branches. Idempotent.
    #[instrument(name = "mixer_close", skip(self))]
    pub fn close(&mut self) {
        let Some(handle) = self.mix_thread.take() else {
            return;
        };

        self.should_stop.store(true, Ordering::SeqCst);
        let _ = handle.join();

        self.system_slot.lock().take();
        self.mic_slot.lock().take();
        info!("mixer graph closed");
    }
}

impl Drop for MixerGraph {
    fn drop(&mut self) {
        self.close();
    }
}

fn mix_thread(
    sender: Sender<MixedChunk>,
    should_stop: Arc<AtomicBool>,
    system_slot: BranchSlot,
    mic_slot: BranchSlot,
    mic_gain: Arc<RwLock<f32>>,
) {
    debug!("mix thread started");

    let mut mix_buffer = vec![0.0f32; SAMPLES_PER_CHUNK];
    let mut sequence = 0u64;
    let start_time = Instant::now();

    let chunk_duration = Duration::from_millis(10);
    let mut next_chunk_time = start_time;

    while !should_stop.load(Ordering::SeqCst) {
        mix_buffer.fill(0.0);

        if let Some(rx) = system_slot.lock().as_ref() {
            if let Ok(chunk) = rx.try_recv() {
                mix_into(&mut mix_buffer, &chunk.samples, SYSTEM_GAIN);
            }
        }

        let gain = *mic_gain.read();
        if let Some(rx) = mic_slot.lock().as_ref() {
            if let Ok(chunk) = rx.try_recv() {
                mix_into(&mut mix_buffer, &chunk.samples, gain);
            }
        }

        for sample in mix_buffer.iter_mut() {
            *sample = soft_clip(*sample);
        }

        let elapsed = next_chunk_time.duration_since(start_time);
        let pts_100ns = elapsed.as_nanos() as u64 / 100;

        let output = MixedChunk {
            samples: mix_buffer.clone(),
            pts_100ns,
            sequence,
        };

        match sender.try_send(output) {
            Ok(()) => {}
            Err(crossbeam_channel::TrySendError::Full(_)) => {
                trace!("mixed audio channel full, dropping chunk");
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
        }

        sequence += 1;
        next_chunk_time += chunk_duration;

        let now = Instant::now();
        if next_chunk_time > now {
            thread::sleep(next_chunk_time - now);
        }
    }

    debug!("mix thread exiting");
}

/// Sum gain-scaled samples into the mix buffer.
fn mix_into(buffer: &mut [f32], samples: &[f32], gain: f32) {
    for (slot, &sample) in buffer.iter_mut().zip(samples) {
        *slot += sample * gain;
    }
}

/// Soft clipping function to prevent harsh digital clipping.
fn soft_clip(sample: f32) -> f32 {
    if sample > 1.0 {
        1.0 - (-sample + 1.0).exp() * 0.5
    } else if sample < -1.0 {
        -1.0 + (sample + 1.0).exp() * 0.5
    } else {
        sample
    }
}

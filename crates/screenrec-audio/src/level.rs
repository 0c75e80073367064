//! Microphone level metering.
//!
//! The meter is a cooperative task: it owns a cancellation token, checks it
//! on every iteration, and also stops once the owning stream's channel
//! disconnects.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, instrument};

use screenrec_ipc::CancellationToken;

use crate::chunk::AudioChunk;
use crate::error::AudioError;
use crate::{clamp_mic_gain, AudioResult, AUDIO_CHANNEL_CAPACITY};

/// Peak level of a chunk, scaled by gain, as a 0-100 meter value.
pub fn peak_level(samples: &[f32], gain: f32) -> f32 {
    let peak = samples.iter().fold(0.0f32, |max, &s| max.max(s.abs()));
    (peak * 100.0 * gain).min(100.0)
}

/// A running microphone level meter.
pub struct LevelMeter {
    token: CancellationToken,
    thread: Option<JoinHandle<()>>,
    levels: Receiver<f32>,
    gain: Arc<RwLock<f32>>,
}

impl LevelMeter {
    /// Start metering the given chunk stream at the given gain.
    #[instrument(name = "level_meter_start", skip(chunks))]
    pub fn start(chunks: Receiver<AudioChunk>, gain: f32) -> AudioResult<Self> {
        let token = CancellationToken::new();
        let shared_gain = Arc::new(RwLock::new(clamp_mic_gain(gain)));
        let (level_tx, levels) = crossbeam_channel::bounded(AUDIO_CHANNEL_CAPACITY);

        let thread = thread::Builder::new()
            .name("mic-level".into())
            .spawn({
                let token = token.clone();
                let gain = Arc::clone(&shared_gain);
                move || {
                    while !token.is_cancelled() {
                        match chunks.recv_timeout(Duration::from_millis(50)) {
                            Ok(chunk) => {
                                let level = peak_level(&chunk.samples, *gain.read());
                                let _ = level_tx.try_send(level);
                            }
                            Err(RecvTimeoutError::Timeout) => {}
                            // Owning stream is gone; stop rescheduling.
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    debug!("level meter exiting");
                }
            })
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        Ok(Self {
            token,
            thread: Some(thread),
            levels,
            gain: shared_gain,
        })
    }

    /// A receiver for the computed 0-100 levels.
    pub fn levels(&self) -> Receiver<f32> {
        self.levels.clone()
    }

    /// Live-update the gain applied to the meter.
    pub fn set_gain(&self, gain: f32) {
        *self.gain.write() = clamp_mic_gain(gain);
    }

    /// Cancel the meter and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        self.token.cancel();
        let _ = handle.join();
    }
}

impl Drop for LevelMeter {
    fn drop(&mut self) {
        self.stop();
    }
}

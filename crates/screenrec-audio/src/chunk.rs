//! Captured audio chunk types.

use std::time::Instant;

/// Which branch a captured chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSource {
    /// Microphone input.
    Microphone,

    /// System-audio loopback.
    System,
}

/// An audio chunk captured from a device.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Mono f32 samples at [`SAMPLE_RATE`](crate::SAMPLE_RATE).
    pub samples: Vec<f32>,

    /// Timestamp when this chunk was captured.
    pub timestamp: Instant,

    /// Monotonically increasing sequence number.
    pub sequence: u64,

    /// Source this chunk was captured from.
    pub source: AudioSource,
}

impl AudioChunk {
    /// Create a new chunk.
    pub fn new(samples: Vec<f32>, sequence: u64, source: AudioSource) -> Self {
        Self {
            samples,
            timestamp: Instant::now(),
            sequence,
            source,
        }
    }

    /// Number of samples in this chunk.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

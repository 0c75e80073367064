//! Audio stream handles.

use crossbeam_channel::Receiver;
use tracing::debug;

use crate::chunk::AudioChunk;

/// Platform-side handle that stops chunk production when asked.
pub trait StreamHandle: Send {
    /// Stop producing chunks and release the underlying platform capture.
    fn stop(&mut self);
}

/// An open audio capture stream (microphone or loopback).
///
/// The close handle has exactly one owner; the chunk receiver may be cloned
/// into the mixer. Closing is idempotent.
pub struct AudioStream {
    chunks: Receiver<AudioChunk>,
    device_id: Option<String>,
    handle: Option<Box<dyn StreamHandle>>,
}

impl AudioStream {
    /// Create a stream from a chunk receiver and a platform handle.
    pub fn new(
        chunks: Receiver<AudioChunk>,
        device_id: Option<String>,
        handle: Box<dyn StreamHandle>,
    ) -> Self {
        Self {
            chunks,
            device_id,
            handle: Some(handle),
        }
    }

    /// A receiver for the captured chunks.
    pub fn chunks(&self) -> Receiver<AudioChunk> {
        self.chunks.clone()
    }

    /// Device this stream was opened on (None for the platform default).
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Stop the stream. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
            debug!(device = ?self.device_id, "audio stream closed");
        }
    }

    /// Whether the stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        self.close();
    }
}

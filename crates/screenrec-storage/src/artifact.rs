//! Recorded artifact assembly.

use bytes::{Bytes, BytesMut};

/// The accumulated output of a stopped recording: an ordered sequence of
/// containerized byte chunks.
#[derive(Debug, Default)]
pub struct RecordingArtifact {
    chunks: Vec<Bytes>,
}

impl RecordingArtifact {
    /// Assemble an artifact from chunks already in recording order.
    pub fn new(chunks: Vec<Bytes>) -> Self {
        Self { chunks }
    }

    /// Number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total size in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }

    /// Whether the artifact carries no data at all.
    pub fn is_empty(&self) -> bool {
        self.total_bytes() == 0
    }

    /// Concatenate the chunks into the final byte blob.
    pub fn into_bytes(mut self) -> Bytes {
        // Single-chunk recordings skip the copy.
        if self.chunks.len() == 1 {
            return self.chunks.pop().unwrap_or_default();
        }

        let mut blob = BytesMut::with_capacity(self.total_bytes() as usize);
        for chunk in self.chunks {
            blob.extend_from_slice(&chunk);
        }
        blob.freeze()
    }
}

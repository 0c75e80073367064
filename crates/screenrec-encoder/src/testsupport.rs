//! Fake host/encoder implementations shared by this crate's tests.

use bytes::{BufMut, Bytes, BytesMut};

use screenrec_audio::MixedChunk;
use screenrec_capture::CapturedFrame;

use crate::{EncoderHost, EncoderRequest, EncoderResult, MediaEncoder};

/// A platform encoder that records every video write as a small marker so
/// tests can assert on chunk contents and ordering.
#[derive(Default)]
pub(crate) struct FakeEncoder {
    pending: BytesMut,
}

impl MediaEncoder for FakeEncoder {
    fn write_video(&mut self, frame: &CapturedFrame) -> EncoderResult<()> {
        self.pending.put_u64(frame.sequence);
        Ok(())
    }

    fn write_audio(&mut self, _chunk: &MixedChunk) -> EncoderResult<()> {
        Ok(())
    }

    fn take_output(&mut self) -> Bytes {
        self.pending.split().freeze()
    }

    fn finish(&mut self) -> EncoderResult<Bytes> {
        Ok(self.pending.split().freeze())
    }
}

/// A host that supports a fixed set of mime types.
pub(crate) struct FakeHost {
    supported: Vec<String>,
}

impl FakeHost {
    pub fn supporting(mimes: &[&str]) -> Self {
        Self {
            supported: mimes.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl EncoderHost for FakeHost {
    fn supports_mime(&self, mime: &str) -> bool {
        self.supported.iter().any(|m| m == mime)
    }

    fn create(&self, _request: &EncoderRequest) -> EncoderResult<Box<dyn MediaEncoder>> {
        Ok(Box::new(FakeEncoder::default()))
    }
}

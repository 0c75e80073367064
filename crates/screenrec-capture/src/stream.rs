//! Video stream handles.

use crossbeam_channel::Receiver;
use tracing::debug;

use crate::frame::CapturedFrame;

/// Platform-side handle that stops frame production when asked.
pub trait StreamHandle: Send {
    /// Stop producing frames and release the underlying platform capture.
    fn stop(&mut self);
}

/// An open video capture stream.
///
/// The close handle has exactly one owner; the frame receiver may be cloned
/// into consumers. Closing is idempotent: the handle is taken on the first
/// close and a second close is a no-op.
pub struct VideoStream {
    frames: Receiver<CapturedFrame>,
    width: u32,
    height: u32,
    fps: u32,
    handle: Option<Box<dyn StreamHandle>>,
}

impl VideoStream {
    /// Create a stream from a frame receiver and a platform handle.
    pub fn new(
        frames: Receiver<CapturedFrame>,
        width: u32,
        height: u32,
        fps: u32,
        handle: Box<dyn StreamHandle>,
    ) -> Self {
        Self {
            frames,
            width,
            height,
            fps,
            handle: Some(handle),
        }
    }

    /// A receiver for the captured frames.
    pub fn frames(&self) -> Receiver<CapturedFrame> {
        self.frames.clone()
    }

    /// Stream dimensions in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Target frames per second.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Stop the stream. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
            debug!(width = self.width, height = self.height, "video stream closed");
        }
    }

    /// Whether the stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for VideoStream {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct CountingHandle(Arc<AtomicUsize>);

    impl StreamHandle for CountingHandle {
        fn stop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn close_is_idempotent() {
        let stops = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = crossbeam_channel::bounded(1);
        let mut stream =
            VideoStream::new(rx, 1920, 1080, 60, Box::new(CountingHandle(stops.clone())));

        assert!(!stream.is_closed());
        stream.close();
        stream.close();
        assert!(stream.is_closed());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_closes_once() {
        let stops = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = crossbeam_channel::bounded(1);
        {
            let mut stream =
                VideoStream::new(rx, 640, 480, 30, Box::new(CountingHandle(stops.clone())));
            stream.close();
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}

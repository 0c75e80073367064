//! Platform boundary for video capture.

use screenrec_ipc::{SourceInfo, VideoSettings};

use crate::stream::VideoStream;
use crate::CaptureResult;

/// Host platform capture API.
///
/// Implementations wrap whatever the platform offers (desktop capturer,
/// graphics capture, a portal). They must tag source ids with the kind
/// prefix (`screen:` / `window:`) and convert platform failures into
/// [`CaptureError`](crate::CaptureError) values.
pub trait ScreenBackend: Send + Sync {
    /// Enumerate all capturable screens and windows, with thumbnails where
    /// the platform provides them.
    fn enumerate_sources(&self) -> CaptureResult<Vec<SourceInfo>>;

    /// Open a capture stream bound to `source_id` at exactly the resolution
    /// and frame rate of `settings`.
    fn open_video(&self, source_id: &str, settings: &VideoSettings) -> CaptureResult<VideoStream>;
}

//! Screen/window video stream acquisition.
//!
//! This crate defines the platform boundary for video capture: a backend
//! trait that enumerates sources and opens exact-resolution streams, the
//! frame and stream-handle types, and locale-aware source-name
//! normalization. Platform errors are converted to the capture taxonomy
//! here and never escape raw.

mod backend;
mod error;
mod frame;
mod source;
mod stream;

pub use backend::ScreenBackend;
pub use error::CaptureError;
pub use frame::{CaptureTimestamp, CapturedFrame};
pub use source::{canonical_full_screen_name, localized_sources, normalize_source_name};
pub use stream::{StreamHandle, VideoStream};

/// Channel capacity for captured frames.
pub const FRAME_CHANNEL_CAPACITY: usize = 3;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

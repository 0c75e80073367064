//! Typed UI<->Engine messages for the screen recorder.
//!
//! This crate defines all the message types used for communication between
//! the presentation layer and the recording engine core.

mod cancel;
mod commands;
mod error;
mod events;
mod state;
mod types;

pub use cancel::CancellationToken;
pub use commands::SessionCommand;
pub use error::{MediaKind, SessionError};
pub use events::SessionEvent;
pub use state::{SessionState, StartPhase};
pub use types::{
    AudioDeviceInfo, QualityTier, RecordConfig, SourceInfo, SourceKind, VideoSettings,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (UI → Engine).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (Engine → UI).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<SessionCommand>, Receiver<SessionCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<SessionEvent>, Receiver<SessionEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}

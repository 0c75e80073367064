//! Session state machine types.

use serde::{Deserialize, Serialize};

use crate::types::{RecordConfig, SourceInfo};

/// The current state of the recording session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    /// No capture source chosen.
    #[default]
    Idle,

    /// A source is selected; recording has not started.
    Armed {
        /// The selected capture source.
        source: SourceInfo,
    },

    /// The start sequence is running.
    Starting {
        /// Current startup phase.
        phase: StartPhase,
    },

    /// Capture, mixing and encoding are running.
    Recording {
        /// Configuration this recording was started with.
        config: RecordConfig,
    },

    /// An artifact is ready for save or discard.
    Stopped {
        /// Number of encoded chunks in the artifact.
        chunk_count: usize,

        /// Total artifact size in bytes.
        total_bytes: u64,
    },
}

impl SessionState {
    /// Returns true if no source is selected.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if a source is selected and recording has not started.
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }

    /// Returns true if a recording is running.
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    /// Returns true if an artifact is awaiting save or discard.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Armed { .. } => "Armed",
            Self::Starting { .. } => "Starting",
            Self::Recording { .. } => "Recording",
            Self::Stopped { .. } => "Stopped",
        }
    }
}

/// Startup phases for the recording start sequence, in order.
///
/// On failure, every completed phase is rolled back in reverse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartPhase {
    /// Opening the video capture stream.
    OpenVideo,

    /// Opening the system-audio loopback stream.
    OpenSystemAudio,

    /// Creating the mixer graph and attaching branches.
    InitMixer,

    /// Selecting and starting the recorder backend.
    StartEncoder,
}

impl StartPhase {
    /// Returns the next phase, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::OpenVideo => Some(Self::OpenSystemAudio),
            Self::OpenSystemAudio => Some(Self::InitMixer),
            Self::InitMixer => Some(Self::StartEncoder),
            Self::StartEncoder => None,
        }
    }

    /// Returns the previous phase, if any (for rollback).
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::OpenVideo => None,
            Self::OpenSystemAudio => Some(Self::OpenVideo),
            Self::InitMixer => Some(Self::OpenSystemAudio),
            Self::StartEncoder => Some(Self::InitMixer),
        }
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::OpenVideo => "Opening video capture",
            Self::OpenSystemAudio => "Opening system audio",
            Self::InitMixer => "Initializing audio mixer",
            Self::StartEncoder => "Starting encoder",
        }
    }
}

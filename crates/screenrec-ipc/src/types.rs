//! Common types used across IPC messages.

use serde::{Deserialize, Serialize};

/// Kind of a capture source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    /// A full screen/display.
    Screen,

    /// An application window.
    Window,
}

impl SourceKind {
    /// The id tag the platform prepends to source ids of this kind.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Screen => "screen:",
            Self::Window => "window:",
        }
    }

    /// Whether a tagged source id belongs to this kind.
    pub fn matches_id(self, id: &str) -> bool {
        id.starts_with(self.id_prefix())
    }
}

/// A capture source (screen or window).
///
/// Immutable once listed; selection copies the value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceInfo {
    /// Opaque identifier, tagged by kind (`screen:` / `window:`).
    pub id: String,

    /// Display name for the UI.
    pub name: String,

    /// Kind of this source.
    pub kind: SourceKind,

    /// PNG-encoded thumbnail, if the platform provided one.
    pub thumbnail_png: Option<Vec<u8>>,
}

/// An audio input device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    /// Unique identifier for this device.
    pub id: String,

    /// Display label for the UI.
    pub label: String,

    /// Whether this is the platform default input.
    pub is_default: bool,
}

/// Recording quality tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl QualityTier {
    /// Multiplier applied to the base size estimate.
    pub fn size_multiplier(self) -> f64 {
        match self {
            Self::High => 1.5,
            Self::Medium => 1.0,
            Self::Low => 0.6,
        }
    }

    /// Lowercase name, used in file names.
    pub fn name(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Video capture settings.
///
/// Resolution and fps are a consistent pair, consumed together when a
/// capture stream is requested.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoSettings {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Target frames per second.
    pub fps: u32,

    /// Quality tier.
    pub quality: QualityTier,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 60,
            quality: QualityTier::High,
        }
    }
}

impl VideoSettings {
    /// Estimated output size in MB per minute of recording.
    ///
    /// Monotonically non-decreasing in width·height·fps and strictly
    /// ordered High > Medium > Low for a fixed resolution/fps pair.
    pub fn estimated_size_mb_per_minute(&self) -> u32 {
        let base = (self.width as f64 * self.height as f64 * self.fps as f64) / 1_000_000.0;
        (base * self.quality.size_multiplier() * 0.5).round() as u32
    }

    /// "1920x1080"-style label.
    pub fn resolution_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Snapshot of the configuration a recording was started with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordConfig {
    /// The selected capture source.
    pub source: SourceInfo,

    /// Video settings at start time.
    pub settings: VideoSettings,

    /// Whether the microphone was enabled at start time.
    pub mic_enabled: bool,

    /// Selected microphone device id (None for the platform default).
    pub mic_device: Option<String>,
}

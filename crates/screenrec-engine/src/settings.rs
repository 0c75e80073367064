//! Persisted settings and the settings-store capability.
//!
//! Settings are an explicit context value loaded at engine construction
//! through an injected store; there is no ambient global state.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use screenrec_audio::{clamp_mic_gain, DEFAULT_MIC_GAIN};

/// Persisted user settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Microphone gain, 0.0 - 3.0.
    pub microphone_gain: f32,

    /// Selected microphone device id; None means the platform default.
    /// Resolved against the current enumeration at use time.
    pub microphone_device: Option<String>,

    /// Active UI language ("en", "tr", ...).
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            microphone_gain: DEFAULT_MIC_GAIN,
            microphone_device: None,
            language: "en".to_string(),
        }
    }
}

impl Settings {
    /// Clamp loaded values into their domains.
    pub fn clamped(mut self) -> Self {
        self.microphone_gain = clamp_mic_gain(self.microphone_gain);
        self
    }
}

/// Injected load/save capability for the persisted settings.
pub trait SettingsStore: Send + Sync {
    /// Load the stored settings; None when nothing (readable) is stored.
    fn load(&self) -> Option<Settings>;

    /// Persist the settings. Failures are logged, not propagated; settings
    /// persistence is best-effort.
    fn save(&self, settings: &Settings);
}

/// File-backed settings store (JSON).
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Create a store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The default per-user settings path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("screenrec").join("settings.json"))
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Option<Settings> {
        let data = fs::read(&self.path).ok()?;
        match serde_json::from_slice::<Settings>(&data) {
            Ok(settings) => {
                debug!(path = %self.path.display(), "settings loaded");
                Some(settings.clamped())
            }
            Err(e) => {
                warn!("settings file unreadable, using defaults: {e}");
                None
            }
        }
    }

    fn save(&self, settings: &Settings) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("settings directory could not be created: {e}");
                return;
            }
        }
        match serde_json::to_vec_pretty(settings) {
            Ok(data) => {
                if let Err(e) = fs::write(&self.path, data) {
                    warn!("settings could not be saved: {e}");
                }
            }
            Err(e) => warn!("settings could not be serialized: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_run() {
        let settings = Settings::default();
        assert_eq!(settings.microphone_gain, 1.0);
        assert_eq!(settings.microphone_device, None);
        assert_eq!(settings.language, "en");
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::new(dir.path().join("nested").join("settings.json"));

        assert!(store.load().is_none());

        let settings = Settings {
            microphone_gain: 2.5,
            microphone_device: Some("usb-mic".to_string()),
            language: "tr".to_string(),
        };
        store.save(&settings);
        assert_eq!(store.load(), Some(settings));
    }

    #[test]
    fn out_of_domain_gain_is_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"microphone_gain": 9.5, "microphone_device": null, "language": "en"}"#,
        )
        .unwrap();

        let store = JsonSettingsStore::new(path);
        let settings = store.load().unwrap();
        assert_eq!(settings.microphone_gain, 3.0);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, b"{not json").unwrap();

        assert!(JsonSettingsStore::new(path).load().is_none());
    }
}

//! The persistence bridge boundary and the disk write helper.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use screenrec_ipc::VideoSettings;

use crate::{StorageError, StorageResult};

/// Result of a save-location request. Cancellation is an explicit outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveLocation {
    /// The user chose a destination path.
    Path(PathBuf),

    /// The user dismissed the dialog.
    Cancelled,
}

/// Host platform persistence API: the native save dialog and the disk
/// write. The write must appear atomic to the caller: no partial files.
pub trait PersistenceBridge: Send + Sync {
    /// Ask the user where to save, seeded with a suggested file name.
    fn choose_save_location(&self, suggested_name: &str) -> StorageResult<SaveLocation>;

    /// Write the artifact bytes to the chosen path. Returns the final path
    /// (the platform may adjust the extension).
    fn write_bytes(&self, data: &[u8], path: &Path) -> StorageResult<PathBuf>;
}

/// Write bytes atomically: stage into a temp file next to the destination,
/// then rename over it.
#[instrument(name = "write_atomic", skip(data), fields(bytes = data.len()))]
pub fn write_atomic(data: &[u8], path: &Path) -> StorageResult<PathBuf> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut staged = match parent {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new()?,
    };

    staged.write_all(data)?;
    staged.flush()?;
    staged
        .persist(path)
        .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

    debug!(path = %path.display(), "artifact written");
    Ok(path.to_path_buf())
}

/// Build the suggested file name for the save dialog from the recording
/// settings, the active UI language and a pre-formatted timestamp.
pub fn suggested_file_name(settings: &VideoSettings, language: &str, timestamp: &str) -> String {
    let prefix = if language == "tr" {
        "ekran-kaydi"
    } else {
        "screen-recording"
    };
    format!(
        "{prefix}-{}_{}fps_{}-{timestamp}.webm",
        settings.resolution_label(),
        settings.fps,
        settings.quality.name(),
    )
}

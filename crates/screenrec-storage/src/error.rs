//! Error types for the storage module.

use thiserror::Error;

/// Errors that can occur during persistence operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The write could not be completed atomically.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Platform bridge failure (dialog plumbing, IPC).
    #[error("persistence bridge error: {0}")]
    Bridge(String),
}

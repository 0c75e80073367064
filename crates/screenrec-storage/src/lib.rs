//! Disk persistence for recorded artifacts.
//!
//! This crate is the output side of the recorder: the persistence bridge
//! boundary (save-location request + atomic byte write), artifact assembly
//! from ordered chunks, the suggested-file-name builder, and minimal
//! WebM/EBML container framing helpers used by platform encoder hosts and
//! by the save path's track probe.

pub mod container;

mod artifact;
mod bridge;
mod error;

pub use artifact::RecordingArtifact;
pub use bridge::{suggested_file_name, write_atomic, PersistenceBridge, SaveLocation};
pub use error::StorageError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

//! Storage Layer
//!
//! Persists the per-user calibration profile as a JSON document.

mod profile;
mod repository;

pub use profile::{BaselineStats, BlinkParams, CalibrationProfile, HeadPoseParams};
pub use repository::{JsonFileStore, MemoryStore, ProfileStore, PROFILE_FILENAME};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Profile is corrupt: {0}")]
    ProfileCorrupt(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

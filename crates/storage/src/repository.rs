//! Profile Store Implementations

use crate::{CalibrationProfile, StorageError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Default file name for the stored profile
pub const PROFILE_FILENAME: &str = "user_profile.json";

/// Read/write access to the persisted calibration profile
pub trait ProfileStore {
    /// Load the stored profile. `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> Result<Option<CalibrationProfile>, StorageError>;

    /// Persist a profile, replacing any previous one
    fn save(&self, profile: &CalibrationProfile) -> Result<(), StorageError>;
}

/// Profile stored as a JSON document on disk
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store `user_profile.json` inside a directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PROFILE_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for JsonFileStore {
    fn load(&self) -> Result<Option<CalibrationProfile>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No profile at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let profile = CalibrationProfile::from_json(&text)?;
        info!("Loaded calibration profile from {}", self.path.display());
        Ok(Some(profile))
    }

    fn save(&self, profile: &CalibrationProfile) -> Result<(), StorageError> {
        let json = profile.to_json()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write beside the target and rename so a crash never leaves half a profile
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        info!("Saved calibration profile to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store that still goes through the JSON encoding
#[derive(Default)]
pub struct MemoryStore {
    document: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a raw document, valid or not
    pub fn with_document(text: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(text.into())),
        }
    }

    /// Raw stored document, if any
    pub fn document(&self) -> Option<String> {
        self.document.lock().ok().and_then(|d| d.clone())
    }
}

impl ProfileStore for MemoryStore {
    fn load(&self) -> Result<Option<CalibrationProfile>, StorageError> {
        let document = self.document.lock().map_err(|e| {
            StorageError::SerializationError(format!("Lock error: {}", e))
        })?;

        document
            .as_deref()
            .map(CalibrationProfile::from_json)
            .transpose()
    }

    fn save(&self, profile: &CalibrationProfile) -> Result<(), StorageError> {
        let json = profile.to_json()?;
        let mut document = self.document.lock().map_err(|e| {
            StorageError::SerializationError(format!("Lock error: {}", e))
        })?;
        *document = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path().join("nested"));

        let mut profile = CalibrationProfile::default();
        profile.blink.threshold_delta = 0.017_3;
        profile.baseline.avg_ear = 0.291;

        store.save(&profile).unwrap();
        assert!(store.path().ends_with(PROFILE_FILENAME));
        assert_eq!(store.load().unwrap(), Some(profile));
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        // A non-empty directory where the profile should go makes the rename fail
        fs::create_dir(store.path()).unwrap();
        fs::write(store.path().join("keep"), "x").unwrap();

        let result = store.save(&CalibrationProfile::default());

        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(
            store.load(),
            Err(StorageError::ProfileCorrupt(_))
        ));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&CalibrationProfile::default()).unwrap();
        assert!(store.document().unwrap().contains("\"hysteresis_frames\": 3"));
        assert_eq!(store.load().unwrap(), Some(CalibrationProfile::default()));
    }

    #[test]
    fn test_memory_store_corrupt_document() {
        let store = MemoryStore::with_document("{\"blink\": null}");
        assert!(matches!(
            store.load(),
            Err(StorageError::ProfileCorrupt(_))
        ));
    }
}

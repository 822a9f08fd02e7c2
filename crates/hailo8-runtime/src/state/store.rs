//! Atomic persistence of the pipeline state.
//!
//! Format: pretty-printed JSON
//! ```text
//! {"components": {"system_check": {...}, ...}, "timestamp": "...", "install_dir": "..."}
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hailo8_core::{InstallError, InstallResult, InstallStateDocument, PipelineState};
use tracing::{debug, warn};

/// Reads and writes `install_state.json`.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the state atomically using temp file + rename.
    ///
    /// # Atomicity
    /// 1. Write to `install_state.json.tmp`
    /// 2. Rename to `install_state.json` (atomic on the same filesystem)
    pub fn save(&self, state: &PipelineState) -> InstallResult<()> {
        let json = serde_json::to_string_pretty(&state.to_document())?;
        self.write_atomic(json.as_bytes())
            .map_err(|source| InstallError::StatePersist {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), "Saved install state");
        Ok(())
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        fs::write(&temp, bytes)?;
        fs::rename(&temp, &self.path)
    }

    /// Load the persisted state.
    ///
    /// Returns `None` when the file is missing or unreadable; the caller
    /// starts from all-pending defaults. Never fails.
    pub fn load(&self, install_dir: &Path, max_retries: u32) -> Option<PipelineState> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No install state file yet");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read install state, using defaults");
                return None;
            }
        };

        match serde_json::from_str::<InstallStateDocument>(&text) {
            Ok(doc) => Some(PipelineState::from_document(doc, install_dir, max_retries)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt install state, using defaults");
                None
            }
        }
    }

    /// Load or fall back to a fresh all-pending state.
    pub fn load_or_default(&self, install_dir: &Path, max_retries: u32) -> PipelineState {
        self.load(install_dir, max_retries)
            .unwrap_or_else(|| PipelineState::new(install_dir, max_retries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hailo8_core::{ComponentType, InstallStatus};
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("install_state.json"));

        let mut state = PipelineState::new(dir.path(), 3);
        state.mark_success(ComponentType::SystemCheck);
        state.record_failure(ComponentType::Dependencies, "E: Could not get lock");
        state
            .component_mut(ComponentType::Dependencies)
            .record("package_manager", "apt");
        store.save(&state).unwrap();

        let loaded = store.load(dir.path(), 3).unwrap();
        assert_eq!(loaded, state);
        assert!(!dir.path().join("install_state.json.tmp").exists());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("install_state.json"));
        assert!(store.load(dir.path(), 3).is_none());
        let state = store.load_or_default(dir.path(), 3);
        assert!(
            state
                .components()
                .all(|c| c.status == InstallStatus::Pending)
        );
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("install_state.json");
        fs::write(&path, "{ not json").unwrap();
        let store = StateStore::new(&path);
        assert!(store.load(dir.path(), 3).is_none());
    }

    #[test]
    fn save_into_unwritable_location_is_an_error() {
        let dir = tempdir().unwrap();
        // A regular file where the parent directory should be.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = StateStore::new(blocker.join("install_state.json"));

        let result = store.save(&PipelineState::new(dir.path(), 3));
        assert!(matches!(result, Err(InstallError::StatePersist { .. })));
    }

    #[test]
    fn saved_file_uses_component_keys() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("install_state.json"));
        store.save(&PipelineState::new(dir.path(), 3)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let components = value["components"].as_object().unwrap();
        for c in ComponentType::ALL {
            assert_eq!(components[c.key()]["status"], "pending");
        }
        assert!(value.get("timestamp").is_some());
        assert!(value.get("install_dir").is_some());
    }
}

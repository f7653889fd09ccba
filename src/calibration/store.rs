//! Persistence for [`CalibrationState`].
//!
//! The file is a value-typed snapshot written atomically (temp file in the
//! target directory, then rename). There is no cross-process coordination:
//! two analyses running against the same repository can race and the later
//! writer wins. Absence or corruption of the file is never an error; the
//! caller gets a default state and the next save overwrites.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::warn;

use crate::calibration::{CalibrationError, CalibrationState};

/// Dot-directory under the analyzed repository root.
pub const CALIBRATION_DIR: &str = ".vibecheck";
const CALIBRATION_FILE: &str = "calibration.json";

/// Trait abstracting how calibration state is persisted between runs.
pub trait CalibrationStore {
    /// Load the persisted state, substituting the default when the backing
    /// data is absent or unparsable.
    fn load(&self) -> CalibrationState;
    fn save(&self, state: &CalibrationState) -> Result<(), CalibrationError>;
}

/// Filesystem-backed store using `.vibecheck/calibration.json`.
pub struct FileCalibrationStore {
    path: PathBuf,
}

impl FileCalibrationStore {
    /// Store for the repository rooted at `repo_root`.
    pub fn for_repo(repo_root: impl AsRef<Path>) -> Self {
        Self {
            path: repo_root.as_ref().join(CALIBRATION_DIR).join(CALIBRATION_FILE),
        }
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationStore for FileCalibrationStore {
    fn load(&self) -> CalibrationState {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return CalibrationState::default();
            }
            Err(e) => {
                warn!(
                    "failed to read calibration file {}: {}; using defaults",
                    self.path.display(),
                    e
                );
                return CalibrationState::default();
            }
        };

        match serde_json::from_str::<CalibrationState>(&json) {
            // Deserialized thresholds are untrusted; re-establish the
            // strictly-increasing invariant.
            Ok(mut state) => {
                state.model = state.model.with_repaired_thresholds();
                state
            }
            Err(e) => {
                warn!(
                    "corrupt calibration file {}: {}; resetting to defaults",
                    self.path.display(),
                    e
                );
                CalibrationState::default()
            }
        }
    }

    fn save(&self, state: &CalibrationState) -> Result<(), CalibrationError> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| CalibrationError::Json(e.to_string()))?;

        let dir = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;

        // Write-temp-then-rename so a crash mid-write never leaves a
        // truncated file behind.
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|e| CalibrationError::Io(e.error))?;
        Ok(())
    }
}

/// In-memory store for embedding and tests.
#[derive(Default)]
pub struct MemoryCalibrationStore {
    state: std::sync::Mutex<Option<CalibrationState>>,
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load(&self) -> CalibrationState {
        self.state
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn save(&self, state: &CalibrationState) -> Result<(), CalibrationError> {
        if let Ok(mut guard) = self.state.lock() {
            *guard = Some(state.clone());
        }
        Ok(())
    }
}

//! Persisted ruler positions.
//!
//! Rulers that carry a display name get their last frame restored at
//! startup.  Frames are stored as a JSON object keyed by name:
//!
//! ```json
//! {
//!   "horizontal": { "x": 660.0, "y": 250.0, "width": 600.0, "height": 40.0 },
//!   "vertical":   { "x": 660.0, "y": 290.0, "width": 40.0, "height": 600.0 }
//! }
//! ```

use crate::ruler::Rect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Ruler name → last known frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedPositions {
    frames: BTreeMap<String, Rect>,
}

impl SavedPositions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The saved frame for `name`, if it is usable.
    pub fn get(&self, name: &str) -> Option<Rect> {
        self.frames.get(name).copied().filter(Rect::is_valid)
    }

    pub fn record(&mut self, name: impl Into<String>, frame: Rect) {
        self.frames.insert(name.into(), frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Load positions from `path`.  A missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self, PositionsError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(PositionsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|source| PositionsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write positions to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), PositionsError> {
        let io_err = |source| PositionsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| PositionsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }
}

/// Error from reading or writing the positions file.
#[derive(Debug, thiserror::Error)]
pub enum PositionsError {
    #[error("failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("malformed positions file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_path(name: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir()
            .join(format!("screen-ruler-positions-{}-{}", std::process::id(), n))
            .join(name)
    }

    #[test]
    fn missing_file_is_empty() {
        let positions = SavedPositions::load(&temp_path("positions.json")).unwrap();
        assert!(positions.is_empty());
    }

    #[test]
    fn save_then_load_keeps_frames() {
        let path = temp_path("positions.json");
        let mut positions = SavedPositions::new();
        positions.record("top", Rect::new(10.0, 20.0, 300.0, 40.0));
        positions.save(&path).unwrap();

        let loaded = SavedPositions::load(&path).unwrap();
        assert_eq!(loaded.get("top"), Some(Rect::new(10.0, 20.0, 300.0, 40.0)));
        assert_eq!(loaded.get("side"), None);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_saved_frame_is_ignored() {
        let json = r#"{ "top": { "x": 0, "y": 0, "width": 0, "height": 40 } }"#;
        let positions: SavedPositions = serde_json::from_str(json).unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions.get("top"), None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = temp_path("positions.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        let err = SavedPositions::load(&path).unwrap_err();
        assert!(matches!(err, PositionsError::Parse { .. }));
        assert!(err.to_string().contains("malformed"));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}

//! Snapshot persistence.

use std::fs;
use std::path::{Path, PathBuf};

use bambu_camera::CaptureError;
use chrono::{DateTime, Utc};
use tracing::info;

/// Writes captured frames into a directory.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File name for a snapshot taken at `at`.
    pub fn file_name(prefix: &str, at: DateTime<Utc>) -> String {
        format!("{}_{}.jpg", sanitize(prefix), at.format("%Y%m%d-%H%M%S"))
    }

    /// Save `jpeg` and return the written path.
    pub fn save(&self, prefix: &str, jpeg: &[u8]) -> Result<PathBuf, CaptureError> {
        self.save_at(prefix, jpeg, Utc::now())
    }

    fn save_at(&self, prefix: &str, jpeg: &[u8], at: DateTime<Utc>) -> Result<PathBuf, CaptureError> {
        fs::create_dir_all(&self.dir).map_err(|e| persist_error(&self.dir, e))?;
        let path = self.dir.join(Self::file_name(prefix, at));
        fs::write(&path, jpeg).map_err(|e| persist_error(&path, e))?;
        info!(bytes = jpeg.len(), "saved snapshot to {}", path.display());
        Ok(path)
    }
}

fn persist_error(path: &Path, e: std::io::Error) -> CaptureError {
    CaptureError::PersistError(format!("{}: {}", path.display(), e))
}

/// Keep prefixes to a single path component.
fn sanitize(prefix: &str) -> String {
    let cleaned: String = prefix
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "snapshot".to_string()
    } else {
        cleaned
    }
}

//! File-based snapshot backend: one JSON object holding every remembered fact.
//!
//! The whole file is overwritten on each save, so it is always a complete,
//! human-inspectable view of memory.
//!
//! Storage location: `<data_dir>/memory.json`

use async_trait::async_trait;
use prospector_core::error::MemoryError;
use prospector_core::memory::{Snapshot, SnapshotBackend};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A JSON file holding the memory snapshot.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Create a backend at the given path. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> Result<Snapshot, MemoryError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::new()),
            Err(e) => {
                return Err(MemoryError::Storage(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(Snapshot::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            MemoryError::Serialization(format!("{} is not a JSON object: {e}", self.path.display()))
        })
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;

        std::fs::write(&self.path, content).map_err(|e| {
            MemoryError::Storage(format!("Failed to write memory file: {e}"))
        })?;

        debug!(path = %self.path.display(), keys = snapshot.len(), "Memory snapshot written");
        Ok(())
    }
}

//! Memory trait: the persisted snapshot behind the remembered-facts store.
//!
//! The store itself (cache + promotion on read) lives in `prospector-memory`.
//! A backend only knows how to load and overwrite the whole snapshot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;

/// All remembered facts, keyed by name.
pub type Snapshot = serde_json::Map<String, serde_json::Value>;

/// Where a recalled value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecallSource {
    /// The in-process cache
    Memory,
    /// The persisted snapshot (promoted into the cache on read)
    Disk,
    /// The caller-supplied fallback
    Default,
}

impl RecallSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Disk => "disk",
            Self::Default => "default",
        }
    }
}

/// A value returned by `recall`, tagged with its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recalled {
    pub value: serde_json::Value,
    pub source: RecallSource,
}

/// Storage for the snapshot of remembered facts.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Load the full snapshot. A snapshot that was never written is empty.
    async fn load(&self) -> std::result::Result<Snapshot, MemoryError>;

    /// Overwrite the full snapshot.
    async fn save(&self, snapshot: &Snapshot) -> std::result::Result<(), MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_source_serializes_lowercase() {
        assert_eq!(serde_json::to_value(RecallSource::Disk).unwrap(), "disk");
        assert_eq!(RecallSource::Memory.as_str(), "memory");
    }
}

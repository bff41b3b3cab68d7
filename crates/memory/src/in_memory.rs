//! In-memory snapshot backend: useful for testing and ephemeral runs.

use async_trait::async_trait;
use prospector_core::error::MemoryError;
use prospector_core::memory::{Snapshot, SnapshotBackend};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A snapshot that lives as long as the process.
///
/// Clones share the same storage, so a test can hand one clone to a
/// `MemoryStore` and inspect the other.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    snapshot: Arc<RwLock<Snapshot>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self) -> Result<Snapshot, MemoryError> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), MemoryError> {
        *self.snapshot.write().await = snapshot.clone();
        Ok(())
    }
}

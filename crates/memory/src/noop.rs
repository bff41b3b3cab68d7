//! No-op snapshot backend: remembered facts last only as long as the cache.

use async_trait::async_trait;
use prospector_core::error::MemoryError;
use prospector_core::memory::{Snapshot, SnapshotBackend};

/// A snapshot backend that stores nothing.
pub struct NoopMemory;

#[async_trait]
impl SnapshotBackend for NoopMemory {
    fn name(&self) -> &str {
        "none"
    }

    async fn load(&self) -> Result<Snapshot, MemoryError> {
        Ok(Snapshot::new())
    }

    async fn save(&self, _snapshot: &Snapshot) -> Result<(), MemoryError> {
        Ok(())
    }
}

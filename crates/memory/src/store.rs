//! The remembered-facts store: an in-process cache over a persisted snapshot.
//!
//! Writes go to both layers in the same call. Reads check the cache, then
//! the snapshot (promoting hits into the cache), then a caller default.
//! One store is built per run and shared by handle; there is no global.

use prospector_core::error::MemoryError;
use prospector_core::memory::{Recalled, RecallSource, Snapshot, SnapshotBackend};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::in_memory::InMemoryBackend;

pub struct MemoryStore {
    cache: RwLock<HashMap<String, Value>>,
    snapshot: Arc<dyn SnapshotBackend>,
}

impl MemoryStore {
    pub fn new(snapshot: Arc<dyn SnapshotBackend>) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            snapshot,
        }
    }

    /// A store whose snapshot lives only in this process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    pub fn backend_name(&self) -> &str {
        self.snapshot.name()
    }

    /// Store `value` under `key` in the cache and the snapshot.
    ///
    /// The cache keeps the value even when persisting fails, but the
    /// failure is still returned to the caller.
    pub async fn remember(&self, key: &str, value: Value) -> Result<(), MemoryError> {
        // Holding the cache lock across load+save keeps concurrent writers
        // from clobbering each other's snapshot.
        let mut cache = self.cache.write().await;
        cache.insert(key.to_string(), value.clone());

        let mut snapshot = match self.snapshot.load().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Memory snapshot unreadable, rewriting it");
                Snapshot::new()
            }
        };
        snapshot.insert(key.to_string(), value);

        self.snapshot.save(&snapshot).await.inspect_err(|e| {
            warn!(key, error = %e, "Failed to persist remembered value");
        })?;

        debug!(key, backend = self.snapshot.name(), "Remembered");
        Ok(())
    }

    /// Look up `key`, falling back to `default`.
    ///
    /// A key that is absent everywhere with no default is `MemoryError::NotFound`.
    pub async fn recall(&self, key: &str, default: Option<Value>) -> Result<Recalled, MemoryError> {
        if let Some(value) = self.cache.read().await.get(key) {
            return Ok(Recalled {
                value: value.clone(),
                source: RecallSource::Memory,
            });
        }

        let mut cache = self.cache.write().await;
        if let Some(value) = cache.get(key) {
            return Ok(Recalled {
                value: value.clone(),
                source: RecallSource::Memory,
            });
        }

        match self.snapshot.load().await {
            Ok(snapshot) => {
                if let Some(value) = snapshot.get(key) {
                    cache.insert(key.to_string(), value.clone());
                    debug!(key, "Promoted snapshot value into cache");
                    return Ok(Recalled {
                        value: value.clone(),
                        source: RecallSource::Disk,
                    });
                }
            }
            Err(e) => warn!(key, error = %e, "Memory snapshot unreadable during recall"),
        }
        drop(cache);

        default
            .map(|value| Recalled {
                value,
                source: RecallSource::Default,
            })
            .ok_or_else(|| MemoryError::NotFound(key.to_string()))
    }

    /// Drop the in-process cache; the snapshot is untouched.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Forget everything, in the cache and in the snapshot.
    pub async fn clear(&self) -> Result<(), MemoryError> {
        let mut cache = self.cache.write().await;
        cache.clear();
        self.snapshot.save(&Snapshot::new()).await
    }

    /// Every remembered fact: the snapshot overlaid with the cache.
    pub async fn entries(&self) -> Result<Snapshot, MemoryError> {
        let mut all = self.snapshot.load().await?;
        for (k, v) in self.cache.read().await.iter() {
            all.insert(k.clone(), v.clone());
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileBackend;
    use async_trait::async_trait;
    use serde_json::json;

    struct ReadOnlyDisk;

    #[async_trait]
    impl SnapshotBackend for ReadOnlyDisk {
        fn name(&self) -> &str {
            "read_only"
        }
        async fn load(&self) -> Result<Snapshot, MemoryError> {
            Ok(Snapshot::new())
        }
        async fn save(&self, _snapshot: &Snapshot) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("disk full".into()))
        }
    }

    #[tokio::test]
    async fn remember_then_recall_from_memory() {
        let store = MemoryStore::in_memory();
        store.remember("leads_count", json!(10)).await.unwrap();
        let got = store.recall("leads_count", None).await.unwrap();
        assert_eq!(got.value, json!(10));
        assert_eq!(got.source, RecallSource::Memory);
    }

    #[tokio::test]
    async fn fresh_process_recalls_from_disk_then_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let store = MemoryStore::new(Arc::new(FileBackend::new(&path)));
        store.remember("icp", json!({"industry": "SaaS"})).await.unwrap();

        store.clear_cache().await;
        let got = store.recall("icp", None).await.unwrap();
        assert_eq!(got.source, RecallSource::Disk);
        assert_eq!(got.value["industry"], "SaaS");

        let again = store.recall("icp", None).await.unwrap();
        assert_eq!(again.source, RecallSource::Memory);

        let other = MemoryStore::new(Arc::new(FileBackend::new(&path)));
        assert_eq!(other.recall("icp", None).await.unwrap().source, RecallSource::Disk);
    }

    #[tokio::test]
    async fn default_used_when_absent() {
        let store = MemoryStore::in_memory();
        let got = store.recall("tone", Some(json!("friendly"))).await.unwrap();
        assert_eq!(got.source, RecallSource::Default);
        assert_eq!(got.value, "friendly");
    }

    #[tokio::test]
    async fn absent_without_default_is_not_found() {
        let store = MemoryStore::in_memory();
        let err = store.recall("nope", None).await.unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(ref k) if k == "nope"));
    }

    #[tokio::test]
    async fn persistence_failure_is_reported_but_cached() {
        let store = MemoryStore::new(Arc::new(ReadOnlyDisk));
        let err = store.remember("k", json!("v")).await.unwrap_err();
        assert!(matches!(err, MemoryError::Storage(_)));

        let got = store.recall("k", None).await.unwrap();
        assert_eq!(got.source, RecallSource::Memory);
    }

    #[tokio::test]
    async fn rewrite_overwrites_value() {
        let store = MemoryStore::in_memory();
        store.remember("k", json!(1)).await.unwrap();
        store.remember("k", json!(2)).await.unwrap();
        store.clear_cache().await;
        assert_eq!(store.recall("k", None).await.unwrap().value, json!(2));
    }

    #[tokio::test]
    async fn remember_keeps_other_snapshot_keys() {
        let backend = InMemoryBackend::new();
        let store = MemoryStore::new(Arc::new(backend.clone()));
        store.remember("a", json!(1)).await.unwrap();
        store.clear_cache().await;
        store.remember("b", json!(2)).await.unwrap();

        let snap = backend.load().await.unwrap();
        assert_eq!(snap.len(), 2);
    }

    #[tokio::test]
    async fn clear_empties_both_layers() {
        let backend = InMemoryBackend::new();
        let store = MemoryStore::new(Arc::new(backend.clone()));
        store.remember("a", json!(1)).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.recall("a", None).await.is_err());
        assert!(backend.load().await.unwrap().is_empty());
        assert!(store.entries().await.unwrap().is_empty());
    }
}

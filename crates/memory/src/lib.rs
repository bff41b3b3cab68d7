//! Remembered facts for prospector: the `MemoryStore` and its snapshot backends.

pub mod noop;
pub mod in_memory;
pub mod file_backend;
pub mod store;
pub mod inputs;

use std::path::Path;
use std::sync::Arc;

pub use noop::NoopMemory;
pub use in_memory::InMemoryBackend;
pub use file_backend::FileBackend;
pub use store::MemoryStore;
pub use inputs::{InputKind, InputSpec, coerce, parse_required_inputs};

use prospector_core::memory::SnapshotBackend;

/// Build a snapshot backend by config name ("file", "in_memory", "none").
pub fn backend_from_name(name: &str, file: &Path) -> Arc<dyn SnapshotBackend> {
    match name {
        "in_memory" => Arc::new(InMemoryBackend::new()),
        "none" => Arc::new(NoopMemory),
        _ => Arc::new(FileBackend::new(file)),
    }
}

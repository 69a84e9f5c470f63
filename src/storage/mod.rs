//! Storage layer for fluxlist.
//!
//! Persists the committed part of each list's state (`ListRecord`) behind the
//! object-safe `ListStateStorage` trait:
//! - **MemoryStorage**: nothing survives the process (default)
//! - **JsonlStorage**: JSONL file with an in-memory cache

mod jsonl;
mod memory;
mod traits;

use std::sync::Arc;

pub use jsonl::JsonlStorage;
pub use memory::MemoryStorage;
pub use traits::{Filter, FilterOp, HasId, ListStateStorage};

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

/// Open the backend selected by `config`.
pub fn open(config: &StorageConfig) -> Result<Arc<dyn ListStateStorage>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::Jsonl => Ok(Arc::new(JsonlStorage::new(&config.data_dir)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ListDescriptor, ListRecord, ListState};
    use tempfile::TempDir;

    #[test]
    fn test_open_memory() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..Default::default()
        };
        let storage = open(&config).unwrap();
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn test_open_jsonl_creates_dir() {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("nested").join("lists");
        let config = StorageConfig {
            backend: StorageBackend::Jsonl,
            data_dir: data_dir.clone(),
        };
        let storage = open(&config).unwrap();
        assert!(data_dir.is_dir());

        let record = ListRecord::from_state(&ListDescriptor::posts(1), &ListState::default());
        storage.save(&record).unwrap();
        assert!(data_dir.join("lists.jsonl").exists());
    }
}

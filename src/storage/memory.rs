//! In-memory storage, the default when persistence is not configured.

use std::collections::HashMap;
use std::sync::RwLock;

use super::traits::{Filter, ListStateStorage};
use crate::domain::ListRecord;
use crate::error::{ListError, Result};

/// `HashMap`-backed storage; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<String, ListRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ListStateStorage for MemoryStorage {
    fn load(&self, id: &str) -> Result<Option<ListRecord>> {
        let records = self.records.read().map_err(|e| ListError::Storage(e.to_string()))?;
        Ok(records.get(id).cloned())
    }

    fn save(&self, record: &ListRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|e| ListError::Storage(e.to_string()))?;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.write().map_err(|e| ListError::Storage(e.to_string()))?;
        Ok(records.remove(id).is_some())
    }

    fn query(&self, filters: &[Filter]) -> Result<Vec<ListRecord>> {
        let records = self.records.read().map_err(|e| ListError::Storage(e.to_string()))?;
        let mut results = Vec::new();
        for record in records.values() {
            let value = serde_json::to_value(record)?;
            if filters.iter().all(|f| f.matches(&value)) {
                results.push(record.clone());
            }
        }
        results.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ListDescriptor, ListState};

    fn record(descriptor: ListDescriptor, ids: Vec<i64>) -> ListRecord {
        let state = ListState {
            item_ids: ids,
            ..Default::default()
        };
        ListRecord::from_state(&descriptor, &state)
    }

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        let rec = record(ListDescriptor::posts(1), vec![1, 2]);
        storage.save(&rec).unwrap();
        assert_eq!(storage.load(&rec.id).unwrap(), Some(rec));
    }

    #[test]
    fn test_save_replaces() {
        let storage = MemoryStorage::new();
        storage.save(&record(ListDescriptor::posts(1), vec![1])).unwrap();
        let newer = record(ListDescriptor::posts(1), vec![5, 6]);
        storage.save(&newer).unwrap();
        assert_eq!(storage.list().unwrap(), vec![newer]);
    }

    #[test]
    fn test_delete() {
        let storage = MemoryStorage::new();
        let rec = record(ListDescriptor::orders(1), vec![]);
        storage.save(&rec).unwrap();
        assert!(storage.delete(&rec.id).unwrap());
        assert!(!storage.delete(&rec.id).unwrap());
        assert!(storage.load(&rec.id).unwrap().is_none());
    }

    #[test]
    fn test_query_by_site() {
        let storage = MemoryStorage::new();
        storage.save(&record(ListDescriptor::posts(1), vec![1])).unwrap();
        storage.save(&record(ListDescriptor::orders(1), vec![2])).unwrap();
        storage.save(&record(ListDescriptor::posts(2), vec![3])).unwrap();

        let site_one = storage.query(&[Filter::site(1)]).unwrap();
        assert_eq!(site_one.len(), 2);
        assert!(site_one.iter().all(|r| r.site_id == 1));
    }
}

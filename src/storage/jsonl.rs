//! JSONL-based storage implementation with in-memory caching.
//!
//! All list records live in one `lists.jsonl` file, one record per line.
//! New records are appended; replacing or deleting a record rewrites the file
//! through a temporary file and a rename.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::traits::{Filter, ListStateStorage};
use crate::domain::ListRecord;
use crate::error::{ListError, Result};

/// File name of the record log
const LISTS_FILE: &str = "lists.jsonl";

/// JSONL-based storage with in-memory caching.
pub struct JsonlStorage {
    base_path: PathBuf,
    /// Loaded lazily on first access
    cache: RwLock<Option<Vec<ListRecord>>>,
}

impl std::fmt::Debug for JsonlStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlStorage")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl JsonlStorage {
    /// Create a new JsonlStorage at the given path.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            cache: RwLock::new(None),
        })
    }

    /// Path of the record log.
    pub fn file_path(&self) -> PathBuf {
        self.base_path.join(LISTS_FILE)
    }

    /// Load the file into cache if not already loaded.
    ///
    /// When a record id appears more than once the last line wins.
    fn ensure_loaded(&self) -> Result<()> {
        {
            let cache = self.cache.read().map_err(|e| ListError::Storage(e.to_string()))?;
            if cache.is_some() {
                return Ok(());
            }
        }

        let mut cache = self.cache.write().map_err(|e| ListError::Storage(e.to_string()))?;
        if cache.is_some() {
            return Ok(());
        }

        let path = self.file_path();
        let mut records: Vec<ListRecord> = Vec::new();
        if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: ListRecord = serde_json::from_str(&line)?;
                match records.iter().position(|r| r.id == record.id) {
                    Some(index) => records[index] = record,
                    None => records.push(record),
                }
            }
        }

        *cache = Some(records);
        Ok(())
    }

    /// Append a record to the JSONL file.
    fn append_to_file(&self, record: &ListRecord) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(self.file_path())?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    /// Rewrite the entire file from the given records.
    fn rewrite_file(&self, records: &[ListRecord]) -> Result<()> {
        let path = self.file_path();
        let tmp_path = self.base_path.join(format!("{}.tmp", LISTS_FILE));
        {
            let mut file = File::create(&tmp_path)?;
            for record in records {
                writeln!(file, "{}", serde_json::to_string(record)?)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

impl ListStateStorage for JsonlStorage {
    fn load(&self, id: &str) -> Result<Option<ListRecord>> {
        self.ensure_loaded()?;

        let cache = self.cache.read().map_err(|e| ListError::Storage(e.to_string()))?;
        let records = cache
            .as_ref()
            .ok_or_else(|| ListError::Storage("Records not loaded".to_string()))?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    fn save(&self, record: &ListRecord) -> Result<()> {
        self.ensure_loaded()?;

        let mut cache = self.cache.write().map_err(|e| ListError::Storage(e.to_string()))?;
        let records = cache
            .as_mut()
            .ok_or_else(|| ListError::Storage("Records not loaded".to_string()))?;

        match records.iter().position(|r| r.id == record.id) {
            Some(index) => {
                // Cache follows the file only once the rewrite landed
                let mut updated = records.clone();
                updated[index] = record.clone();
                self.rewrite_file(&updated)?;
                *records = updated;
            }
            None => {
                // Append to file first (source of truth), then cache
                self.append_to_file(record)?;
                records.push(record.clone());
            }
        }

        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.ensure_loaded()?;

        let mut cache = self.cache.write().map_err(|e| ListError::Storage(e.to_string()))?;
        let records = cache
            .as_mut()
            .ok_or_else(|| ListError::Storage("Records not loaded".to_string()))?;

        if !records.iter().any(|r| r.id == id) {
            return Ok(false);
        }

        let remaining: Vec<ListRecord> = records.iter().filter(|r| r.id != id).cloned().collect();
        self.rewrite_file(&remaining)?;
        *records = remaining;
        Ok(true)
    }

    fn query(&self, filters: &[Filter]) -> Result<Vec<ListRecord>> {
        self.ensure_loaded()?;

        let cache = self.cache.read().map_err(|e| ListError::Storage(e.to_string()))?;
        let records = cache
            .as_ref()
            .ok_or_else(|| ListError::Storage("Records not loaded".to_string()))?;

        let mut results = Vec::new();
        for record in records {
            let value = serde_json::to_value(record)?;
            if filters.iter().all(|f| f.matches(&value)) {
                results.push(record.clone());
            }
        }

        Ok(results)
    }
}

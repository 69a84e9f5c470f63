//! Storage trait definitions and filter types.

use serde::Serialize;

use crate::domain::ListRecord;
use crate::error::Result;

/// Filter operations for querying records.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Field equals value
    Eq,
    /// Array field contains value
    Contains,
}

/// A filter for querying records.
#[derive(Debug, Clone)]
pub struct Filter {
    /// Field name to filter on
    pub field: String,
    /// Filter operation
    pub op: FilterOp,
    /// Value to compare against
    pub value: serde_json::Value,
}

impl Filter {
    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Serialize) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Create an array-membership filter.
    pub fn contains(field: impl Into<String>, value: impl Serialize) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Contains,
            value: serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Records belonging to one site
    pub fn site(site_id: i64) -> Self {
        Self::eq("site_id", site_id)
    }

    /// Records whose known ids include `remote_id`
    pub fn with_item(remote_id: i64) -> Self {
        Self::contains("item_ids", remote_id)
    }

    /// Check if a record matches this filter.
    pub fn matches(&self, record: &serde_json::Value) -> bool {
        let field_value = record.get(&self.field);

        match &self.op {
            FilterOp::Eq => match field_value {
                Some(v) => *v == self.value,
                None => self.value.is_null(),
            },
            FilterOp::Contains => match field_value {
                Some(serde_json::Value::Array(arr)) => arr.contains(&self.value),
                _ => false,
            },
        }
    }
}

/// Trait for records that have an ID field.
pub trait HasId {
    /// Get the record's unique identifier.
    fn id(&self) -> &str;
}

/// Durable storage for list records, keyed by `ListRecord::id`.
pub trait ListStateStorage: Send + Sync {
    /// Get a record by ID.
    fn load(&self, id: &str) -> Result<Option<ListRecord>>;

    /// Insert or replace a record.
    fn save(&self, record: &ListRecord) -> Result<()>;

    /// Delete a record by ID. Returns false if it did not exist.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Query records with filters.
    fn query(&self, filters: &[Filter]) -> Result<Vec<ListRecord>>;

    /// List all records.
    fn list(&self) -> Result<Vec<ListRecord>> {
        self.query(&[])
    }
}

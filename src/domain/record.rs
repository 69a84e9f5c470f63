//! Persisted form of a list's paging state

use serde::{Deserialize, Serialize};

use crate::domain::descriptor::{ListDescriptor, RemoteId, SiteId};
use crate::domain::state::{ListState, ListStatus};
use crate::id::now_ms;
use crate::storage::HasId;

/// Durable record of a list.
///
/// Only committed paging data is stored. In-flight status, errors and the
/// request generation are runtime-only, so a restored list always starts idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRecord {
    /// `ListDescriptor::unique_key()`
    pub id: String,
    pub descriptor: ListDescriptor,
    /// Copied out of the descriptor so records can be filtered by site
    pub site_id: SiteId,
    pub item_ids: Vec<RemoteId>,
    pub total_count: Option<usize>,
    pub can_load_more: bool,
    pub last_fetched_at: Option<u64>,
    pub updated_at: u64,
}

impl ListRecord {
    /// Capture the committed parts of `state`
    pub fn from_state(descriptor: &ListDescriptor, state: &ListState) -> Self {
        Self {
            id: descriptor.unique_key(),
            descriptor: descriptor.clone(),
            site_id: descriptor.site_id(),
            item_ids: state.item_ids.clone(),
            total_count: state.total_count,
            can_load_more: state.can_load_more,
            last_fetched_at: state.last_fetched_at,
            updated_at: now_ms(),
        }
    }

    /// Rebuild an idle state from this record
    pub fn into_state(self) -> ListState {
        ListState {
            item_ids: self.item_ids,
            total_count: self.total_count,
            status: ListStatus::Idle,
            can_load_more: self.can_load_more,
            error: None,
            generation: 0,
            last_fetched_at: self.last_fetched_at,
        }
    }

    pub fn size(&self) -> usize {
        self.item_ids.len()
    }
}

impl HasId for ListRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

//! List Manager implementation
//!
//! A `ListManager` is an immutable snapshot of one list taken when it was
//! requested from the store. It answers size and status queries from that
//! snapshot, resolves item bodies through the data source, and starts fetches
//! through the store. It never changes after construction: get a new manager
//! from the store to observe the result of a fetch.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::domain::{FetchKind, ListDescriptor, ListState, ListStatus, RemoteId};
use crate::error::FetchError;
use crate::id::now_ms;
use crate::source::{ListFetchRequest, ListItemDataSource};
use crate::store::ListStore;

/// An entry of a list at some position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem<T> {
    /// The item body is available locally
    Ready(T),
    /// Only the remote id is known so far
    Pending(RemoteId),
}

impl<T> ListItem<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, ListItem::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            ListItem::Ready(item) => Some(item),
            ListItem::Pending(_) => None,
        }
    }
}

/// Snapshot view over one list
pub struct ListManager<T> {
    store: ListStore,
    descriptor: ListDescriptor,
    state: Arc<ListState>,
    data_source: Arc<dyn ListItemDataSource<T>>,
    load_more_offset: usize,
    /// Items this manager already asked the data source to fetch
    fetching_items: Mutex<HashSet<RemoteId>>,
}

impl<T> std::fmt::Debug for ListManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListManager")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state)
            .field("load_more_offset", &self.load_more_offset)
            .finish_non_exhaustive()
    }
}

impl<T> ListManager<T> {
    pub(crate) fn new(
        store: ListStore,
        descriptor: ListDescriptor,
        state: Arc<ListState>,
        data_source: Arc<dyn ListItemDataSource<T>>,
        load_more_offset: usize,
    ) -> Self {
        Self {
            store,
            descriptor,
            state,
            data_source,
            load_more_offset,
            fetching_items: Mutex::new(HashSet::new()),
        }
    }

    pub fn descriptor(&self) -> &ListDescriptor {
        &self.descriptor
    }

    /// The state this snapshot was taken from
    pub fn state(&self) -> &ListState {
        &self.state
    }

    /// Number of known items; 0 if nothing was fetched yet
    pub fn size(&self) -> usize {
        self.state.size()
    }

    pub fn is_empty(&self) -> bool {
        self.state.item_ids.is_empty()
    }

    pub fn status(&self) -> ListStatus {
        self.state.status
    }

    pub fn is_fetching_first_page(&self) -> bool {
        self.state.is_fetching_first_page()
    }

    pub fn is_loading_more(&self) -> bool {
        self.state.is_loading_more()
    }

    /// Returns true if a load-more could fetch anything
    pub fn can_load_more(&self) -> bool {
        self.state.has_more()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.state.error.as_ref()
    }

    pub fn total_count(&self) -> Option<usize> {
        self.state.total_count
    }

    pub fn load_more_offset(&self) -> usize {
        self.load_more_offset
    }

    pub fn remote_ids(&self) -> &[RemoteId] {
        &self.state.item_ids
    }

    pub fn remote_id_at(&self, position: usize) -> Option<RemoteId> {
        self.state.item_ids.get(position).copied()
    }

    pub fn index_of(&self, remote_id: RemoteId) -> Option<usize> {
        self.state.item_ids.iter().position(|id| *id == remote_id)
    }

    /// Returns true if the list was never fetched or its data is older than
    /// the configured expiry
    pub fn needs_refresh(&self) -> bool {
        self.state.is_expired(now_ms(), self.store.config().state_expiry_ms)
    }

    /// Returns true if `other` shows a different list or different contents
    pub fn has_changes_from(&self, other: &ListManager<T>) -> bool {
        self.descriptor != other.descriptor
            || self.state.item_ids != other.state.item_ids
            || self.state.status != other.state.status
            || self.state.can_load_more != other.state.can_load_more
            || self.state.total_count != other.state.total_count
            || self.state.error != other.state.error
    }

    /// Fetch the first page again, superseding any outstanding fetch.
    ///
    /// The store publishes the state change before the data source is called.
    pub async fn refresh(&self) -> bool {
        self.dispatch(FetchKind::FirstPage).await
    }

    /// Fetch the page after the known items.
    ///
    /// Does nothing, and publishes nothing, while a fetch is outstanding or
    /// once the end of the list was reached. Returns whether a fetch started.
    pub async fn load_more(&self) -> bool {
        self.dispatch(FetchKind::LoadMore).await
    }

    async fn dispatch(&self, kind: FetchKind) -> bool {
        let Some(fetch) = self.store.begin_fetch(&self.descriptor, kind) else {
            return false;
        };
        let request = ListFetchRequest {
            descriptor: self.descriptor.clone(),
            load_more: kind.is_load_more(),
            offset: fetch.offset,
            completer: fetch.completer,
        };
        self.data_source.fetch_list(request).await;
        true
    }

    /// Item at `position`, resolved through the data source.
    ///
    /// Returns `None` past the end, `Pending` when the body is not available
    /// locally.
    pub fn get_item(&self, position: usize) -> Option<ListItem<T>> {
        let remote_id = self.remote_id_at(position)?;
        let mut items = self.data_source.get_items(&self.descriptor, &[remote_id]);
        Some(match items.remove(&remote_id) {
            Some(item) => ListItem::Ready(item),
            None => ListItem::Pending(remote_id),
        })
    }

    /// Every known item, resolved with a single lookup
    pub fn items(&self) -> Vec<ListItem<T>> {
        let mut resolved = self.data_source.get_items(&self.descriptor, &self.state.item_ids);
        self.state
            .item_ids
            .iter()
            .map(|id| match resolved.remove(id) {
                Some(item) => ListItem::Ready(item),
                None => ListItem::Pending(*id),
            })
            .collect()
    }

    /// Like `get_item`, and also start the fetches that access implies: the
    /// item itself when it is pending (once per manager), and a load-more when
    /// `position` is within the load-more offset of the end.
    pub async fn get_item_or_fetch(&self, position: usize) -> Option<ListItem<T>> {
        let item = self.get_item(position)?;

        let missing = match &item {
            ListItem::Pending(remote_id) if self.mark_fetching(*remote_id) => Some(*remote_id),
            _ => None,
        };
        let near_end = position.saturating_add(self.load_more_offset) >= self.size().saturating_sub(1);

        let fetch_item = async {
            if let Some(remote_id) = missing {
                tracing::debug!(list = %self.descriptor, remote_id, "Fetching missing item");
                self.data_source.fetch_item(&self.descriptor, remote_id).await;
            }
        };
        let load_more = async {
            if near_end && self.can_load_more() {
                self.load_more().await;
            }
        };
        futures::join!(fetch_item, load_more);

        Some(item)
    }

    fn mark_fetching(&self, remote_id: RemoteId) -> bool {
        let mut fetching = self.fetching_items.lock().unwrap_or_else(|e| e.into_inner());
        fetching.insert(remote_id)
    }
}

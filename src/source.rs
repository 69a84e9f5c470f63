//! Data source contract
//!
//! A `ListItemDataSource` is supplied by the host for each list. The store
//! calls it to start fetches and to resolve item bodies; it never fetches or
//! stores items itself.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{FetchKind, ListDescriptor, RemoteId};
use crate::store::FetchCompleter;

/// A list fetch handed to the data source.
///
/// The data source reports the outcome through `completer`, from any task or
/// thread, whenever the fetch finishes. Returning from `fetch_list` does not
/// complete the request.
#[derive(Debug)]
pub struct ListFetchRequest {
    pub descriptor: ListDescriptor,
    /// False for a first page, true for a load-more
    pub load_more: bool,
    /// Number of items already known; 0 for a first page
    pub offset: usize,
    pub completer: FetchCompleter,
}

impl ListFetchRequest {
    pub fn kind(&self) -> FetchKind {
        if self.load_more {
            FetchKind::LoadMore
        } else {
            FetchKind::FirstPage
        }
    }
}

/// Supplies list pages and item bodies for one kind of item.
#[async_trait]
pub trait ListItemDataSource<T>: Send + Sync {
    /// Start fetching a page; report the result through `request.completer`.
    async fn fetch_list(&self, request: ListFetchRequest);

    /// Start fetching one item that is not available locally.
    async fn fetch_item(&self, descriptor: &ListDescriptor, remote_id: RemoteId);

    /// Look up items that are already available locally. Ids without a
    /// local item are left out of the map.
    fn get_items(&self, descriptor: &ListDescriptor, remote_ids: &[RemoteId]) -> HashMap<RemoteId, T>;
}

//! Persistence integration tests
//!
//! Lists committed by one store are restored by the next store opened on the
//! same data directory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fluxlist::config::{Config, StorageBackend};
use fluxlist::domain::{FetchedPage, ListDescriptor, ListStatus, PostStatus, RemoteId};
use fluxlist::error::{FetchError, Result};
use fluxlist::source::{ListFetchRequest, ListItemDataSource};
use fluxlist::storage::{Filter, JsonlStorage, ListStateStorage};
use fluxlist::store::ListStore;
use tempfile::TempDir;

/// Answers each page with ids counting up from the request offset
struct CountingSource {
    page_size: usize,
    total: usize,
    fail: bool,
}

#[async_trait]
impl ListItemDataSource<u64> for CountingSource {
    async fn fetch_list(&self, request: ListFetchRequest) {
        if self.fail {
            request.completer.fail(FetchError::api("server error"));
            return;
        }
        let end = (request.offset + self.page_size).min(self.total);
        let ids = (request.offset..end).map(|i| i as RemoteId + 1).collect();
        request
            .completer
            .complete(FetchedPage::new(ids).with_total_count(self.total));
    }

    async fn fetch_item(&self, _descriptor: &ListDescriptor, _remote_id: RemoteId) {}

    fn get_items(&self, _descriptor: &ListDescriptor, _remote_ids: &[RemoteId]) -> HashMap<RemoteId, u64> {
        HashMap::new()
    }
}

fn jsonl_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.lists.network_page_size = 10;
    config.storage.backend = StorageBackend::Jsonl;
    config.storage.data_dir = temp.path().to_path_buf();
    config
}

fn source(total: usize) -> Arc<dyn ListItemDataSource<u64>> {
    Arc::new(CountingSource {
        page_size: 10,
        total,
        fail: false,
    })
}

#[tokio::test]
async fn test_list_restored_by_new_store() -> Result<()> {
    let temp = TempDir::new()?;
    let descriptor = ListDescriptor::posts(3);

    {
        let store = ListStore::from_config(&jsonl_config(&temp))?;
        store.get_list_manager(&descriptor, None, source(15)).refresh().await;
        store.get_list_manager(&descriptor, None, source(15)).load_more().await;
        assert_eq!(store.state(&descriptor).unwrap().size(), 15);
    }

    let store = ListStore::from_config(&jsonl_config(&temp))?;
    let manager = store.get_list_manager(&descriptor, None, source(15));
    assert_eq!(manager.size(), 15);
    assert_eq!(manager.total_count(), Some(15));
    assert_eq!(manager.status(), ListStatus::Idle);
    assert!(!manager.can_load_more());
    assert!(!manager.needs_refresh());

    Ok(())
}

#[tokio::test]
async fn test_failed_fetch_is_not_persisted() -> Result<()> {
    let temp = TempDir::new()?;
    let descriptor = ListDescriptor::orders(3);

    {
        let store = ListStore::from_config(&jsonl_config(&temp))?;
        store.get_list_manager(&descriptor, None, source(4)).refresh().await;

        let failing: Arc<dyn ListItemDataSource<u64>> = Arc::new(CountingSource {
            page_size: 10,
            total: 4,
            fail: true,
        });
        store.get_list_manager(&descriptor, None, failing.clone()).refresh().await;
        assert_eq!(store.get_list_manager(&descriptor, None, failing).status(), ListStatus::Error);
    }

    let store = ListStore::from_config(&jsonl_config(&temp))?;
    let manager = store.get_list_manager(&descriptor, None, source(4));
    assert_eq!(manager.remote_ids(), &[1, 2, 3, 4]);
    assert_eq!(manager.status(), ListStatus::Idle);
    assert!(manager.error().is_none());

    Ok(())
}

#[tokio::test]
async fn test_remove_lists_for_site_clears_storage() -> Result<()> {
    let temp = TempDir::new()?;
    let store = ListStore::from_config(&jsonl_config(&temp))?;

    let drafts = ListDescriptor::from(
        fluxlist::domain::PostListDescriptor::new(1).with_statuses(vec![PostStatus::Draft]),
    );
    for descriptor in [ListDescriptor::posts(1), drafts, ListDescriptor::orders(1), ListDescriptor::posts(2)] {
        store.get_list_manager(&descriptor, None, source(3)).refresh().await;
    }

    assert_eq!(store.remove_lists_for_site(1)?, 3);

    let storage = JsonlStorage::new(temp.path())?;
    let remaining = storage.list()?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].descriptor, ListDescriptor::posts(2));
    assert!(storage.query(&[Filter::site(1)])?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_prune_removes_expired_records() -> Result<()> {
    let temp = TempDir::new()?;
    let descriptor = ListDescriptor::posts(9);

    {
        let store = ListStore::from_config(&jsonl_config(&temp))?;
        store.get_list_manager(&descriptor, None, source(2)).refresh().await;
    }

    let store = ListStore::from_config(&jsonl_config(&temp))?;
    // Nothing is older than an hour
    assert_eq!(store.remove_expired(3_600_000)?, 0);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert_eq!(store.remove_expired(1)?, 1);
    assert!(JsonlStorage::new(temp.path())?.load(&descriptor.unique_key())?.is_none());

    Ok(())
}

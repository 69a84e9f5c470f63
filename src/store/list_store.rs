//! ListStore implementation
//!
//! The store owns the canonical `ListState` of every list it has been asked
//! about. All mutations of the state map happen under one write lock, and
//! events are published while that lock is held, so subscribers see the
//! changes of any one list in the order they were committed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;

use crate::config::{Config, ListConfig};
use crate::domain::{FetchKind, FetchedPage, ListDescriptor, ListEvent, ListRecord, ListState, ListTypeId, SiteId};
use crate::error::{FetchError, Result};
use crate::id::now_ms;
use crate::manager::ListManager;
use crate::source::ListItemDataSource;
use crate::storage::{self, Filter, ListStateStorage, MemoryStorage};

use super::completion::{FetchCompleter, RequestToken};

/// Shared state behind every `ListStore` handle
pub(crate) struct StoreInner {
    config: ListConfig,
    storage: Arc<dyn ListStateStorage>,
    lists: RwLock<HashMap<ListDescriptor, ListState>>,
    /// Source of request generations, shared by all lists
    generations: AtomicU64,
    events: broadcast::Sender<ListEvent>,
}

/// Registry of list states.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct ListStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for ListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListStore")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// A fetch the store has marked in flight
#[derive(Debug)]
pub(crate) struct DispatchedFetch {
    pub offset: usize,
    pub completer: FetchCompleter,
}

impl ListStore {
    /// Create a store that keeps records in memory only
    pub fn new(config: ListConfig) -> Self {
        Self::with_storage(config, Arc::new(MemoryStorage::new()))
    }

    /// Create a store backed by the given storage
    pub fn with_storage(config: ListConfig, storage: Arc<dyn ListStateStorage>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(StoreInner {
                config,
                storage,
                lists: RwLock::new(HashMap::new()),
                generations: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// Create a store from configuration, opening the configured storage
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let storage = storage::open(&config.storage)?;
        Ok(Self::with_storage(config.lists.clone(), storage))
    }

    pub(crate) fn from_inner(inner: Arc<StoreInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &ListConfig {
        &self.inner.config
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.inner.events.subscribe()
    }

    /// Get a manager over the current state of `descriptor`.
    ///
    /// Creates the state, restoring it from storage when a record exists, if
    /// this is the first request for the list. Never starts a fetch.
    /// `load_more_offset` overrides the configured prefetch distance for this
    /// manager only.
    pub fn get_list_manager<T>(
        &self,
        descriptor: &ListDescriptor,
        load_more_offset: Option<usize>,
        data_source: Arc<dyn ListItemDataSource<T>>,
    ) -> ListManager<T> {
        let snapshot = self.snapshot(descriptor);
        let load_more_offset = load_more_offset.unwrap_or(self.inner.config.load_more_offset);
        ListManager::new(self.clone(), descriptor.clone(), snapshot, data_source, load_more_offset)
    }

    /// Current state of a list, if the store knows it
    pub fn state(&self, descriptor: &ListDescriptor) -> Option<ListState> {
        self.read_lists().get(descriptor).cloned()
    }

    /// Descriptors of every list currently held in memory
    pub fn descriptors(&self) -> Vec<ListDescriptor> {
        self.read_lists().keys().cloned().collect()
    }

    /// Atomic copy of the state, creating it if needed
    pub(crate) fn snapshot(&self, descriptor: &ListDescriptor) -> Arc<ListState> {
        if let Some(state) = self.read_lists().get(descriptor) {
            return Arc::new(state.clone());
        }

        let mut lists = self.write_lists();
        let state = lists
            .entry(descriptor.clone())
            .or_insert_with(|| self.restore(descriptor));
        Arc::new(state.clone())
    }

    /// Mark a fetch of `kind` in flight and publish the state change.
    ///
    /// Returns `None`, publishing nothing, when a load-more must not start.
    pub(crate) fn begin_fetch(&self, descriptor: &ListDescriptor, kind: FetchKind) -> Option<DispatchedFetch> {
        let mut lists = self.write_lists();
        let state = lists
            .entry(descriptor.clone())
            .or_insert_with(|| self.restore(descriptor));

        let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
        match kind {
            FetchKind::FirstPage => {
                if state.is_loading_more() {
                    tracing::debug!(list = %descriptor, superseded = state.generation, "Refresh preempts load-more");
                }
                state.begin_refresh(generation);
            }
            FetchKind::LoadMore => {
                if !state.begin_load_more(generation) {
                    tracing::trace!(list = %descriptor, status = state.status.as_str(), "Load-more skipped");
                    return None;
                }
            }
        }

        let offset = match kind {
            FetchKind::FirstPage => 0,
            FetchKind::LoadMore => state.size(),
        };
        tracing::debug!(list = %descriptor, generation, offset, kind = ?kind, "Fetch dispatched");
        self.publish(ListEvent::state_changed(descriptor.clone(), state.status));

        let token = RequestToken {
            descriptor: descriptor.clone(),
            generation,
            kind,
        };
        Some(DispatchedFetch {
            offset,
            completer: FetchCompleter::new(Arc::downgrade(&self.inner), token),
        })
    }

    /// Apply the outcome of a fetch.
    ///
    /// Completions for unknown lists or superseded generations are discarded
    /// without a notification. Otherwise the state is updated, persisted on
    /// success, and exactly one `Changed` event is published. Returns whether
    /// the completion was applied.
    pub fn handle_fetch_completion(&self, token: &RequestToken, outcome: std::result::Result<FetchedPage, FetchError>) -> bool {
        let mut lists = self.write_lists();
        let Some(state) = lists.get_mut(&token.descriptor) else {
            tracing::debug!(list = %token.descriptor, "Completion for unknown list ignored");
            return false;
        };

        if !state.accepts(token.generation, token.kind) {
            tracing::debug!(
                list = %token.descriptor,
                generation = token.generation,
                current = state.generation,
                "Stale completion discarded"
            );
            return false;
        }

        let error = match outcome {
            Ok(page) => {
                let fetched = page.remote_ids.len();
                state.apply_page(token.kind, page, self.inner.config.network_page_size, now_ms());
                tracing::debug!(
                    list = %token.descriptor,
                    fetched,
                    size = state.size(),
                    can_load_more = state.can_load_more,
                    "Fetch completed"
                );
                self.persist(&token.descriptor, state);
                None
            }
            Err(error) => {
                tracing::warn!(list = %token.descriptor, error = %error, "Fetch failed");
                state.apply_error(error.clone());
                Some(error)
            }
        };

        self.publish(ListEvent::fetch_completed(token.descriptor.clone(), token.kind, error));
        true
    }

    /// Drop a list from memory and storage.
    ///
    /// Outstanding fetches for it are ignored when they complete.
    pub fn evict(&self, descriptor: &ListDescriptor) -> Result<bool> {
        let mut lists = self.write_lists();
        let in_memory = lists.remove(descriptor).is_some();
        let in_storage = self.inner.storage.delete(&descriptor.unique_key())?;
        let removed = in_memory || in_storage;
        if removed {
            tracing::debug!(list = %descriptor, "List evicted");
            self.publish(ListEvent::Removed {
                descriptor: descriptor.clone(),
            });
        }
        Ok(removed)
    }

    /// Remove every idle list whose last fetch is older than `max_age_ms`.
    ///
    /// Lists with a fetch in flight are kept. Returns the number removed.
    pub fn remove_expired(&self, max_age_ms: u64) -> Result<usize> {
        let now = now_ms();
        let mut lists = self.write_lists();

        let mut expired: Vec<ListDescriptor> = lists
            .iter()
            .filter(|(_, state)| !state.status.is_in_flight() && state.is_expired(now, max_age_ms))
            .map(|(descriptor, _)| descriptor.clone())
            .collect();

        for record in self.inner.storage.list()? {
            let stale = match record.last_fetched_at {
                Some(at) => now.saturating_sub(at) > max_age_ms,
                None => true,
            };
            if stale && !lists.contains_key(&record.descriptor) && !expired.contains(&record.descriptor) {
                expired.push(record.descriptor);
            }
        }

        for descriptor in &expired {
            lists.remove(descriptor);
            self.inner.storage.delete(&descriptor.unique_key())?;
            self.publish(ListEvent::Removed {
                descriptor: descriptor.clone(),
            });
        }

        if !expired.is_empty() {
            tracing::info!(removed = expired.len(), max_age_ms, "Expired lists removed");
        }
        Ok(expired.len())
    }

    /// Remove every list belonging to a site. Returns the number removed.
    pub fn remove_lists_for_site(&self, site_id: SiteId) -> Result<usize> {
        let mut lists = self.write_lists();

        let mut removed: Vec<ListDescriptor> = lists.keys().filter(|d| d.site_id() == site_id).cloned().collect();
        for record in self.inner.storage.query(&[Filter::site(site_id)])? {
            if !removed.contains(&record.descriptor) {
                removed.push(record.descriptor);
            }
        }

        for descriptor in &removed {
            lists.remove(descriptor);
            self.inner.storage.delete(&descriptor.unique_key())?;
            self.publish(ListEvent::Removed {
                descriptor: descriptor.clone(),
            });
        }

        tracing::debug!(site_id, removed = removed.len(), "Lists removed for site");
        Ok(removed.len())
    }

    /// Tell subscribers that item bodies of a list type changed
    pub fn invalidate_list_data(&self, type_id: ListTypeId) {
        let _lists = self.read_lists();
        self.publish(ListEvent::DataInvalidated { type_id });
    }

    /// Tell subscribers that every list of a type should be refreshed
    pub fn mark_requires_refresh(&self, type_id: ListTypeId) {
        let _lists = self.read_lists();
        self.publish(ListEvent::RequiresRefresh { type_id });
    }

    fn restore(&self, descriptor: &ListDescriptor) -> ListState {
        match self.inner.storage.load(&descriptor.unique_key()) {
            Ok(Some(record)) => {
                tracing::debug!(list = %descriptor, size = record.size(), "List restored from storage");
                record.into_state()
            }
            Ok(None) => ListState::default(),
            Err(e) => {
                tracing::warn!(list = %descriptor, error = %e, "Failed to restore list, starting empty");
                ListState::default()
            }
        }
    }

    fn persist(&self, descriptor: &ListDescriptor, state: &ListState) {
        let record = ListRecord::from_state(descriptor, state);
        if let Err(e) = self.inner.storage.save(&record) {
            tracing::warn!(list = %descriptor, error = %e, "Failed to persist list state");
        }
    }

    fn publish(&self, event: ListEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    fn read_lists(&self) -> RwLockReadGuard<'_, HashMap<ListDescriptor, ListState>> {
        self.inner.lists.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lists(&self) -> RwLockWriteGuard<'_, HashMap<ListDescriptor, ListState>> {
        self.inner.lists.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeCause, ListStatus};
    use crate::error::FetchErrorKind;
    use tokio::sync::broadcast::error::TryRecvError;

    struct NoopSource;

    #[async_trait::async_trait]
    impl ListItemDataSource<String> for NoopSource {
        async fn fetch_list(&self, _request: crate::source::ListFetchRequest) {}

        async fn fetch_item(&self, _descriptor: &ListDescriptor, _remote_id: i64) {}

        fn get_items(&self, _descriptor: &ListDescriptor, _remote_ids: &[i64]) -> HashMap<i64, String> {
            HashMap::new()
        }
    }

    fn store() -> ListStore {
        ListStore::new(ListConfig::default())
    }

    fn drain(rx: &mut broadcast::Receiver<ListEvent>) -> Vec<ListEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
        events
    }

    /// Dispatch and complete a first page with `ids`
    fn fetch_first_page(store: &ListStore, descriptor: &ListDescriptor, ids: Vec<i64>) {
        let fetch = store.begin_fetch(descriptor, FetchKind::FirstPage).unwrap();
        assert!(fetch.completer.complete(FetchedPage::new(ids)));
    }

    #[test]
    fn test_get_list_manager_twice_returns_same_empty_snapshot() {
        let store = store();
        let descriptor = ListDescriptor::posts(1);
        let source: Arc<dyn ListItemDataSource<String>> = Arc::new(NoopSource);

        let first = store.get_list_manager(&descriptor, None, source.clone());
        let second = store.get_list_manager(&descriptor, None, source);

        assert_eq!(first.size(), 0);
        assert!(!first.is_fetching_first_page());
        assert!(!first.is_loading_more());
        assert_eq!(first.state(), second.state());
    }

    #[test]
    fn test_get_list_manager_does_not_publish() {
        let store = store();
        let mut rx = store.subscribe();
        let source: Arc<dyn ListItemDataSource<String>> = Arc::new(NoopSource);
        let _ = store.get_list_manager(&ListDescriptor::posts(1), None, source);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_begin_fetch_publishes_state_change() {
        let store = store();
        let descriptor = ListDescriptor::posts(1);
        let mut rx = store.subscribe();

        let fetch = store.begin_fetch(&descriptor, FetchKind::FirstPage).unwrap();
        assert_eq!(fetch.offset, 0);
        assert!(store.state(&descriptor).unwrap().is_fetching_first_page());

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![ListEvent::state_changed(descriptor.clone(), ListStatus::FetchingFirstPage)]
        );
        drop(fetch);
    }

    #[test]
    fn test_completion_applies_page_and_notifies_once() {
        let store = store();
        let descriptor = ListDescriptor::posts(1);
        let fetch = store.begin_fetch(&descriptor, FetchKind::FirstPage).unwrap();
        let mut rx = store.subscribe();

        assert!(fetch.completer.complete(FetchedPage::new((1..=20).collect())));

        let state = store.state(&descriptor).unwrap();
        assert_eq!(state.size(), 20);
        assert_eq!(state.status, ListStatus::Idle);
        assert!(state.can_load_more);

        let events = drain(&mut rx);
        assert_eq!(events, vec![ListEvent::fetch_completed(descriptor, FetchKind::FirstPage, None)]);
    }

    #[test]
    fn test_load_more_offset_is_current_size() {
        let store = store();
        let descriptor = ListDescriptor::posts(1);
        fetch_first_page(&store, &descriptor, (1..=20).collect());

        let fetch = store.begin_fetch(&descriptor, FetchKind::LoadMore).unwrap();
        assert_eq!(fetch.offset, 20);
        assert!(fetch.completer.complete(FetchedPage::new(vec![21, 22, 23, 24, 25])));

        let state = store.state(&descriptor).unwrap();
        assert_eq!(state.size(), 25);
        assert!(!state.can_load_more);
    }

    #[test]
    fn test_load_more_while_loading_more_is_noop() {
        let store = store();
        let descriptor = ListDescriptor::posts(1);
        fetch_first_page(&store, &descriptor, (1..=20).collect());

        let first = store.begin_fetch(&descriptor, FetchKind::LoadMore).unwrap();
        let mut rx = store.subscribe();
        assert!(store.begin_fetch(&descriptor, FetchKind::LoadMore).is_none());
        assert!(drain(&mut rx).is_empty());
        drop(first);
    }

    #[test]
    fn test_error_completion_keeps_items() {
        let store = store();
        let descriptor = ListDescriptor::orders(3);
        fetch_first_page(&store, &descriptor, (1..=20).collect());

        let fetch = store.begin_fetch(&descriptor, FetchKind::LoadMore).unwrap();
        let mut rx = store.subscribe();
        assert!(fetch.completer.fail(FetchError::network("timeout")));

        let state = store.state(&descriptor).unwrap();
        assert_eq!(state.size(), 20);
        assert_eq!(state.status, ListStatus::Error);
        assert!(!state.is_loading_more());

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].error().map(|e| e.kind), Some(FetchErrorKind::Network));
    }

    #[test]
    fn test_refresh_discards_late_load_more() {
        let store = store();
        let descriptor = ListDescriptor::posts(1);
        fetch_first_page(&store, &descriptor, (1..=20).collect());

        let load_more = store.begin_fetch(&descriptor, FetchKind::LoadMore).unwrap();
        let refresh = store.begin_fetch(&descriptor, FetchKind::FirstPage).unwrap();
        assert!(refresh.completer.complete(FetchedPage::new(vec![100, 101])));

        let mut rx = store.subscribe();
        assert!(!load_more.completer.complete(FetchedPage::new(vec![21, 22])));
        assert!(drain(&mut rx).is_empty());

        let state = store.state(&descriptor).unwrap();
        assert_eq!(state.item_ids, vec![100, 101]);
        assert_eq!(state.status, ListStatus::Idle);
    }

    #[test]
    fn test_superseded_refresh_is_discarded() {
        let store = store();
        let descriptor = ListDescriptor::posts(1);
        let older = store.begin_fetch(&descriptor, FetchKind::FirstPage).unwrap();
        let newer = store.begin_fetch(&descriptor, FetchKind::FirstPage).unwrap();

        assert!(!older.completer.complete(FetchedPage::new(vec![1])));
        assert!(store.state(&descriptor).unwrap().is_fetching_first_page());
        assert!(newer.completer.complete(FetchedPage::new(vec![2])));
        assert_eq!(store.state(&descriptor).unwrap().item_ids, vec![2]);
    }

    #[test]
    fn test_dropped_completer_reports_abandoned() {
        let store = store();
        let descriptor = ListDescriptor::posts(1);
        let mut rx = store.subscribe();
        {
            let _fetch = store.begin_fetch(&descriptor, FetchKind::FirstPage).unwrap();
        }

        let state = store.state(&descriptor).unwrap();
        assert_eq!(state.status, ListStatus::Error);
        assert_eq!(state.error.as_ref().map(|e| e.kind), Some(FetchErrorKind::Generic));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            ListEvent::Changed {
                cause: ChangeCause::FirstPageFetched,
                error: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_completion_after_evict_is_ignored() {
        let store = store();
        let descriptor = ListDescriptor::posts(1);
        let fetch = store.begin_fetch(&descriptor, FetchKind::FirstPage).unwrap();
        assert!(store.evict(&descriptor).unwrap());

        assert!(!fetch.completer.complete(FetchedPage::new(vec![1])));
        assert!(store.state(&descriptor).is_none());
    }

    #[test]
    fn test_completion_from_before_evict_does_not_match_new_fetch() {
        let store = store();
        let descriptor = ListDescriptor::posts(1);
        let old = store.begin_fetch(&descriptor, FetchKind::FirstPage).unwrap();
        store.evict(&descriptor).unwrap();
        let new = store.begin_fetch(&descriptor, FetchKind::FirstPage).unwrap();

        assert!(!old.completer.complete(FetchedPage::new(vec![1])));
        assert!(new.completer.complete(FetchedPage::new(vec![2])));
        assert_eq!(store.state(&descriptor).unwrap().item_ids, vec![2]);
    }

    #[test]
    fn test_completion_after_store_dropped() {
        let store = store();
        let fetch = store.begin_fetch(&ListDescriptor::posts(1), FetchKind::FirstPage).unwrap();
        drop(store);
        assert!(!fetch.completer.complete(FetchedPage::new(vec![1])));
    }

    #[test]
    fn test_state_restored_from_storage() {
        let storage: Arc<dyn ListStateStorage> = Arc::new(MemoryStorage::new());
        let descriptor = ListDescriptor::posts(9);

        {
            let store = ListStore::with_storage(ListConfig::default(), storage.clone());
            fetch_first_page(&store, &descriptor, vec![3, 2, 1]);
        }

        let store = ListStore::with_storage(ListConfig::default(), storage);
        let snapshot = store.snapshot(&descriptor);
        assert_eq!(snapshot.item_ids, vec![3, 2, 1]);
        assert_eq!(snapshot.status, ListStatus::Idle);
    }

    #[test]
    fn test_evict_unknown_list() {
        let store = store();
        let mut rx = store.subscribe();
        assert!(!store.evict(&ListDescriptor::posts(1)).unwrap());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_remove_expired_skips_fresh_and_in_flight() {
        let store = store();
        let fresh = ListDescriptor::posts(1);
        let never_fetched = ListDescriptor::posts(2);
        let in_flight = ListDescriptor::posts(3);

        fetch_first_page(&store, &fresh, vec![1]);
        store.snapshot(&never_fetched);
        let pending = store.begin_fetch(&in_flight, FetchKind::FirstPage).unwrap();

        let removed = store.remove_expired(60_000).unwrap();
        assert_eq!(removed, 1);
        assert!(store.state(&fresh).is_some());
        assert!(store.state(&never_fetched).is_none());
        assert!(store.state(&in_flight).is_some());
        drop(pending);
    }

    #[test]
    fn test_remove_lists_for_site() {
        let store = store();
        fetch_first_page(&store, &ListDescriptor::posts(1), vec![1]);
        fetch_first_page(&store, &ListDescriptor::orders(1), vec![2]);
        fetch_first_page(&store, &ListDescriptor::posts(2), vec![3]);

        assert_eq!(store.remove_lists_for_site(1).unwrap(), 2);
        assert_eq!(store.descriptors(), vec![ListDescriptor::posts(2)]);
    }

    #[test]
    fn test_invalidate_and_requires_refresh_events() {
        let store = store();
        let mut rx = store.subscribe();
        store.invalidate_list_data(ListTypeId::Posts);
        store.mark_requires_refresh(ListTypeId::Orders);

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                ListEvent::DataInvalidated {
                    type_id: ListTypeId::Posts
                },
                ListEvent::RequiresRefresh {
                    type_id: ListTypeId::Orders
                },
            ]
        );
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = Config::default();
        config.lists.network_page_size = 0;
        assert!(ListStore::from_config(&config).is_err());
    }
}

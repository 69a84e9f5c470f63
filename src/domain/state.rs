//! Per-list paging state
//!
//! `ListState` is owned by the store and only mutated through the transition
//! methods below. The in-flight flags are both derived from a single
//! `ListStatus`, so a list can never be fetching its first page and loading
//! more at the same time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::descriptor::RemoteId;
use crate::error::FetchError;

/// Which kind of fetch a request is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    FirstPage,
    LoadMore,
}

impl FetchKind {
    pub fn is_load_more(&self) -> bool {
        matches!(self, FetchKind::LoadMore)
    }

    /// Status a list is in while a fetch of this kind is outstanding
    pub fn in_flight_status(&self) -> ListStatus {
        match self {
            FetchKind::FirstPage => ListStatus::FetchingFirstPage,
            FetchKind::LoadMore => ListStatus::LoadingMore,
        }
    }
}

/// Fetch status of a list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    /// No fetch outstanding
    #[default]
    Idle,
    /// A refresh is outstanding
    FetchingFirstPage,
    /// A load-more is outstanding
    LoadingMore,
    /// The last fetch failed
    Error,
}

impl ListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListStatus::Idle => "idle",
            ListStatus::FetchingFirstPage => "fetching_first_page",
            ListStatus::LoadingMore => "loading_more",
            ListStatus::Error => "error",
        }
    }

    /// Returns true while a fetch is outstanding
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ListStatus::FetchingFirstPage | ListStatus::LoadingMore)
    }
}

/// One page of results reported by a data source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    /// Remote ids in list order
    pub remote_ids: Vec<RemoteId>,
    /// Explicit end-of-list signal; when absent a short page means the end
    pub can_load_more: Option<bool>,
    /// Total number of items on the remote, if the API reports it
    pub total_count: Option<usize>,
}

impl FetchedPage {
    pub fn new(remote_ids: Vec<RemoteId>) -> Self {
        Self {
            remote_ids,
            can_load_more: None,
            total_count: None,
        }
    }

    pub fn with_can_load_more(mut self, can_load_more: bool) -> Self {
        self.can_load_more = Some(can_load_more);
        self
    }

    pub fn with_total_count(mut self, total: usize) -> Self {
        self.total_count = Some(total);
        self
    }
}

/// Paging state of one list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListState {
    /// Known remote ids, in list order
    pub item_ids: Vec<RemoteId>,
    /// Total count estimate, if known
    pub total_count: Option<usize>,
    pub status: ListStatus,
    /// False until a first page arrives, and again once the end is reached
    pub can_load_more: bool,
    /// Error from the last fetch, cleared when a new fetch starts
    pub error: Option<FetchError>,
    /// Generation of the latest fetch started; completions for any other generation are stale
    pub generation: u64,
    /// When the last successful fetch completed (Unix ms)
    pub last_fetched_at: Option<u64>,
}

impl ListState {
    /// Number of known items
    pub fn size(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_fetching_first_page(&self) -> bool {
        self.status == ListStatus::FetchingFirstPage
    }

    pub fn is_loading_more(&self) -> bool {
        self.status == ListStatus::LoadingMore
    }

    /// Returns true if a load-more could fetch anything
    pub fn has_more(&self) -> bool {
        if !self.can_load_more {
            return false;
        }
        match self.total_count {
            Some(total) => self.size() < total,
            None => true,
        }
    }

    /// Returns true if the state was never fetched or is older than `expiry_ms`
    pub fn is_expired(&self, now: u64, expiry_ms: u64) -> bool {
        match self.last_fetched_at {
            Some(at) => now.saturating_sub(at) > expiry_ms,
            None => true,
        }
    }

    /// Start a first-page fetch under `generation`. Always succeeds; any
    /// outstanding fetch is superseded.
    ///
    /// `generation` must be greater than any generation this state has seen.
    pub fn begin_refresh(&mut self, generation: u64) {
        self.generation = generation;
        self.status = ListStatus::FetchingFirstPage;
        self.error = None;
    }

    /// Start a load-more fetch under `generation`. Returns false, leaving the
    /// state untouched, if a fetch is outstanding or the end was reached.
    pub fn begin_load_more(&mut self, generation: u64) -> bool {
        if self.status.is_in_flight() || !self.has_more() {
            return false;
        }
        self.generation = generation;
        self.status = ListStatus::LoadingMore;
        self.error = None;
        true
    }

    /// Returns true if a completion for `generation` of `kind` is the one outstanding
    pub fn accepts(&self, generation: u64, kind: FetchKind) -> bool {
        self.generation == generation && self.status == kind.in_flight_status()
    }

    /// Commit a fetched page.
    ///
    /// A first page replaces the known ids and total; a load-more appends the
    /// ids not already known. `page_size` decides end-of-list when the page
    /// does not say so itself. A load-more that adds no new id ends the list.
    pub fn apply_page(&mut self, kind: FetchKind, page: FetchedPage, page_size: usize, now: u64) {
        let fetched = page.remote_ids.len();
        let mut can_load_more = page.can_load_more.unwrap_or(fetched >= page_size);
        match kind {
            FetchKind::FirstPage => {
                let mut seen = HashSet::with_capacity(fetched);
                self.item_ids = page.remote_ids.into_iter().filter(|id| seen.insert(*id)).collect();
                self.total_count = page.total_count;
            }
            FetchKind::LoadMore => {
                let before = self.item_ids.len();
                let mut seen: HashSet<RemoteId> = self.item_ids.iter().copied().collect();
                self.item_ids
                    .extend(page.remote_ids.into_iter().filter(|id| seen.insert(*id)));
                if self.item_ids.len() == before {
                    can_load_more = false;
                }
                if page.total_count.is_some() {
                    self.total_count = page.total_count;
                }
            }
        }
        self.can_load_more = can_load_more;
        self.status = ListStatus::Idle;
        self.error = None;
        self.last_fetched_at = Some(now);
    }

    /// Record a failed fetch, keeping the known ids
    pub fn apply_error(&mut self, error: FetchError) {
        self.status = ListStatus::Error;
        self.error = Some(error);
    }
}

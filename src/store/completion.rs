//! Fetch completion handles
//!
//! Every dispatched fetch carries a `FetchCompleter`. It holds the request
//! token the store checks on completion, and it completes exactly once:
//! consuming methods report the outcome, and dropping an unfinished completer
//! reports the fetch as abandoned so the list never stays in flight forever.

use std::sync::Weak;

use crate::domain::{FetchKind, FetchedPage, ListDescriptor};
use crate::error::FetchError;

use super::list_store::{ListStore, StoreInner};

/// Identifies one dispatched fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub descriptor: ListDescriptor,
    pub generation: u64,
    pub kind: FetchKind,
}

/// One-shot handle a data source uses to report a fetch outcome.
pub struct FetchCompleter {
    store: Weak<StoreInner>,
    token: RequestToken,
    done: bool,
}

impl std::fmt::Debug for FetchCompleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCompleter")
            .field("token", &self.token)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl FetchCompleter {
    pub(crate) fn new(store: Weak<StoreInner>, token: RequestToken) -> Self {
        Self {
            store,
            token,
            done: false,
        }
    }

    pub fn token(&self) -> &RequestToken {
        &self.token
    }

    /// Report a fetched page. Returns false if the store discarded it.
    pub fn complete(self, page: FetchedPage) -> bool {
        self.finish(Ok(page))
    }

    /// Report a failed fetch. Returns false if the store discarded it.
    pub fn fail(self, error: FetchError) -> bool {
        self.finish(Err(error))
    }

    /// Report either outcome. Returns false if the store discarded it.
    pub fn finish(mut self, outcome: Result<FetchedPage, FetchError>) -> bool {
        self.done = true;
        self.deliver(outcome)
    }

    fn deliver(&self, outcome: Result<FetchedPage, FetchError>) -> bool {
        match self.store.upgrade() {
            Some(inner) => ListStore::from_inner(inner).handle_fetch_completion(&self.token, outcome),
            None => {
                tracing::debug!(list = %self.token.descriptor, "Store dropped before fetch completed");
                false
            }
        }
    }
}

impl Drop for FetchCompleter {
    fn drop(&mut self) {
        if !self.done {
            self.done = true;
            tracing::warn!(
                list = %self.token.descriptor,
                generation = self.token.generation,
                "Fetch dropped without completing"
            );
            self.deliver(Err(FetchError::generic("fetch abandoned")));
        }
    }
}

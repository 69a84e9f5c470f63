//! Change notifications published by the list store.

use serde::{Deserialize, Serialize};

use crate::domain::descriptor::{ListDescriptor, ListTypeId};
use crate::domain::state::{FetchKind, ListStatus};
use crate::error::FetchError;

/// Why a list changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    /// A fetch was dispatched and the status moved to the given in-flight status
    StateChanged(ListStatus),
    /// A refresh completed (successfully or not)
    FirstPageFetched,
    /// A load-more completed (successfully or not)
    LoadedMore,
}

impl ChangeCause {
    /// Cause reported when a fetch of `kind` completes
    pub fn completed(kind: FetchKind) -> Self {
        match kind {
            FetchKind::FirstPage => ChangeCause::FirstPageFetched,
            FetchKind::LoadMore => ChangeCause::LoadedMore,
        }
    }

    pub fn is_completion(&self) -> bool {
        !matches!(self, ChangeCause::StateChanged(_))
    }
}

/// Event delivered to store subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ListEvent {
    /// The state of one list changed
    Changed {
        descriptor: ListDescriptor,
        cause: ChangeCause,
        error: Option<FetchError>,
    },
    /// Item bodies for every list of a type changed; known ids are still valid
    DataInvalidated { type_id: ListTypeId },
    /// Every list of a type should be refreshed
    RequiresRefresh { type_id: ListTypeId },
    /// A list was dropped from the store
    Removed { descriptor: ListDescriptor },
}

impl ListEvent {
    pub fn state_changed(descriptor: ListDescriptor, status: ListStatus) -> Self {
        ListEvent::Changed {
            descriptor,
            cause: ChangeCause::StateChanged(status),
            error: None,
        }
    }

    pub fn fetch_completed(descriptor: ListDescriptor, kind: FetchKind, error: Option<FetchError>) -> Self {
        ListEvent::Changed {
            descriptor,
            cause: ChangeCause::completed(kind),
            error,
        }
    }

    /// Descriptor this event is about, if it targets a single list
    pub fn descriptor(&self) -> Option<&ListDescriptor> {
        match self {
            ListEvent::Changed { descriptor, .. } | ListEvent::Removed { descriptor } => Some(descriptor),
            ListEvent::DataInvalidated { .. } | ListEvent::RequiresRefresh { .. } => None,
        }
    }

    /// Returns true if this event concerns the given list, directly or by type
    pub fn affects(&self, descriptor: &ListDescriptor) -> bool {
        match self {
            ListEvent::Changed { descriptor: d, .. } | ListEvent::Removed { descriptor: d } => d == descriptor,
            ListEvent::DataInvalidated { type_id } | ListEvent::RequiresRefresh { type_id } => {
                *type_id == descriptor.type_id()
            }
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            ListEvent::Changed { error, .. } => error.as_ref(),
            _ => None,
        }
    }
}

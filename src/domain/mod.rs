//! Domain types for fluxlist
//!
//! This module contains all core domain types:
//! - ListDescriptor: identity of a logical list (site, filter, order)
//! - ListState: paging state of one list and its transitions
//! - ListEvent: change notifications published by the store
//! - ListRecord: persisted form of a list's state

pub mod descriptor;
pub mod event;
pub mod record;
pub mod state;

pub use descriptor::{
    ListDescriptor, ListOrder, ListTypeId, OrderListDescriptor, PostListDescriptor, PostOrderBy, PostStatus,
    RemoteId, SiteId,
};
pub use event::{ChangeCause, ListEvent};
pub use record::ListRecord;
pub use state::{FetchKind, FetchedPage, ListState, ListStatus};

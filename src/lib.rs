//! fluxlist - paginated remote lists with local item resolution
//!
//! A `ListStore` keeps the paging state of every list a host asked about,
//! keyed by `ListDescriptor`. Hosts read lists through immutable
//! `ListManager` snapshots, which resolve item bodies through a
//! `ListItemDataSource` and start refresh and load-more fetches.

pub mod config;
pub mod domain;
pub mod error;
pub mod id;
pub mod manager;
pub mod source;
pub mod storage;
pub mod store;

pub use domain::{FetchedPage, ListDescriptor, ListEvent, ListState, ListStatus};
pub use error::{FetchError, FetchErrorKind, ListError, Result};
pub use manager::{ListItem, ListManager};
pub use source::{ListFetchRequest, ListItemDataSource};
pub use store::{FetchCompleter, ListStore};

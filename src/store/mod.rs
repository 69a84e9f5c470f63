//! List store for fluxlist.
//!
//! `ListStore` is the registry of list states. It hands out `ListManager`
//! snapshots, marks fetches in flight, applies their completions, and
//! publishes `ListEvent`s.
//!
//! # Example
//!
//! ```ignore
//! use fluxlist::config::ListConfig;
//! use fluxlist::domain::ListDescriptor;
//! use fluxlist::store::ListStore;
//!
//! let store = ListStore::new(ListConfig::default());
//! let mut events = store.subscribe();
//!
//! let manager = store.get_list_manager(&ListDescriptor::posts(1), None, data_source);
//! manager.refresh().await;
//!
//! // After the data source completes the fetch
//! let event = events.recv().await?;
//! let manager = store.get_list_manager(&ListDescriptor::posts(1), None, data_source);
//! println!("{} posts", manager.size());
//! ```

mod completion;
mod list_store;

pub use completion::{FetchCompleter, RequestToken};
pub use list_store::ListStore;

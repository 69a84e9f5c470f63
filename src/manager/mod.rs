//! List Manager module
//!
//! Read-only snapshots of a list that drive refresh and load-more.

mod list_manager;

pub use list_manager::{ListItem, ListManager};

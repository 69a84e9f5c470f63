//! List descriptors
//!
//! A `ListDescriptor` is the identity of one logical list: which site it
//! belongs to, which items it filters to and how they are ordered. Two
//! descriptors with the same payload are the same list.

use serde::{Deserialize, Serialize};

use crate::id::escape_segment;

/// Local site identifier
pub type SiteId = i64;

/// Remote identifier of an item in a list
pub type RemoteId = i64;

/// Kind of list, shared by every descriptor of the same variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListTypeId {
    Posts,
    Orders,
}

impl ListTypeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListTypeId::Posts => "posts",
            ListTypeId::Orders => "orders",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    Asc,
    #[default]
    Desc,
}

impl ListOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListOrder::Asc => "asc",
            ListOrder::Desc => "desc",
        }
    }
}

/// Publication status a post list can be filtered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
    Draft,
    Pending,
    Private,
    Future,
    Trash,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Private => "private",
            PostStatus::Future => "future",
            PostStatus::Trash => "trash",
        }
    }
}

/// Field a post list is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostOrderBy {
    #[default]
    Date,
    LastModified,
    Title,
    Id,
}

impl PostOrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostOrderBy::Date => "date",
            PostOrderBy::LastModified => "last_modified",
            PostOrderBy::Title => "title",
            PostOrderBy::Id => "id",
        }
    }
}

/// Descriptor payload for a list of posts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostListDescriptor {
    pub site_id: SiteId,
    /// Statuses to include; kept sorted and deduplicated so equal filters compare equal
    pub statuses: Vec<PostStatus>,
    pub order: ListOrder,
    pub order_by: PostOrderBy,
    pub search_query: Option<String>,
}

impl PostListDescriptor {
    /// Published posts of a site, newest first
    pub fn new(site_id: SiteId) -> Self {
        Self {
            site_id,
            statuses: vec![PostStatus::Publish],
            order: ListOrder::Desc,
            order_by: PostOrderBy::Date,
            search_query: None,
        }
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = PostStatus>) -> Self {
        let mut statuses: Vec<PostStatus> = statuses.into_iter().collect();
        statuses.sort();
        statuses.dedup();
        self.statuses = statuses;
        self
    }

    pub fn with_order(mut self, order: ListOrder, order_by: PostOrderBy) -> Self {
        self.order = order;
        self.order_by = order_by;
        self
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }
}

/// Descriptor payload for a list of store orders
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderListDescriptor {
    pub site_id: SiteId,
    /// Comma separated status filter as understood by the remote API
    pub status_filter: Option<String>,
    pub search_query: Option<String>,
    pub exclude_future_orders: bool,
}

impl OrderListDescriptor {
    pub fn new(site_id: SiteId) -> Self {
        Self {
            site_id,
            status_filter: None,
            search_query: None,
            exclude_future_orders: false,
        }
    }

    pub fn with_status_filter(mut self, filter: impl Into<String>) -> Self {
        self.status_filter = Some(filter.into());
        self
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    pub fn excluding_future_orders(mut self) -> Self {
        self.exclude_future_orders = true;
        self
    }
}

/// Identity key for a logical list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListDescriptor {
    Posts(PostListDescriptor),
    Orders(OrderListDescriptor),
}

impl ListDescriptor {
    pub fn posts(site_id: SiteId) -> Self {
        ListDescriptor::Posts(PostListDescriptor::new(site_id))
    }

    pub fn orders(site_id: SiteId) -> Self {
        ListDescriptor::Orders(OrderListDescriptor::new(site_id))
    }

    pub fn type_id(&self) -> ListTypeId {
        match self {
            ListDescriptor::Posts(_) => ListTypeId::Posts,
            ListDescriptor::Orders(_) => ListTypeId::Orders,
        }
    }

    pub fn site_id(&self) -> SiteId {
        match self {
            ListDescriptor::Posts(d) => d.site_id,
            ListDescriptor::Orders(d) => d.site_id,
        }
    }

    /// Stable string key, used to persist and log the list.
    ///
    /// Format: `{type}:{site}:{payload segments...}`, with optional segments
    /// written as `-` when absent.
    pub fn unique_key(&self) -> String {
        match self {
            ListDescriptor::Posts(d) => {
                let statuses = d.statuses.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(",");
                format!(
                    "posts:{}:{}:{}:{}:{}",
                    d.site_id,
                    statuses,
                    d.order.as_str(),
                    d.order_by.as_str(),
                    optional_segment(d.search_query.as_deref())
                )
            }
            ListDescriptor::Orders(d) => format!(
                "orders:{}:{}:{}:{}",
                d.site_id,
                optional_segment(d.status_filter.as_deref()),
                optional_segment(d.search_query.as_deref()),
                d.exclude_future_orders
            ),
        }
    }
}

impl From<PostListDescriptor> for ListDescriptor {
    fn from(d: PostListDescriptor) -> Self {
        ListDescriptor::Posts(d)
    }
}

impl From<OrderListDescriptor> for ListDescriptor {
    fn from(d: OrderListDescriptor) -> Self {
        ListDescriptor::Orders(d)
    }
}

impl std::fmt::Display for ListDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.unique_key())
    }
}

fn optional_segment(value: Option<&str>) -> String {
    match value {
        // `-` alone marks absence, so a literal "-" is escaped
        Some("-") => "%2D".to_string(),
        Some(v) => escape_segment(v),
        None => "-".to_string(),
    }
}

//! Error types for fluxlist
//!
//! Centralized error handling using thiserror. `ListError` covers failures of
//! the crate itself; `FetchError` is the opaque value a data source reports
//! when a list fetch fails.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All error types that can occur in fluxlist
#[derive(Debug, Error)]
pub enum ListError {
    /// List record not found in storage
    #[error("List not found: {0}")]
    ListNotFound(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for fluxlist operations
pub type Result<T> = std::result::Result<T, ListError>;

/// Broad classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorKind {
    /// Transport-level failure (no connection, timeout, TLS)
    Network,
    /// The remote API answered with an error
    Api,
    /// The response could not be parsed
    Parse,
    /// Anything else
    Generic,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Network => "network",
            FetchErrorKind::Api => "api",
            FetchErrorKind::Parse => "parse",
            FetchErrorKind::Generic => "generic",
        }
    }
}

/// Error reported by a data source for a list fetch.
///
/// The store never inspects it beyond recording it on the list state and
/// attaching it to the change notification.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{} error: {message}", kind.as_str())]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Network, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Api, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Parse, message)
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Generic, message)
    }
}

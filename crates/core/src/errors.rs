//! Error types

use thiserror::Error;

use crate::Asset;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),
}

/// Feed read and normalization errors.
///
/// Any of these drops only the affected oracle from a poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("Feed {feed} unavailable: {reason}")]
    Unavailable { feed: String, reason: String },

    #[error("Feed {feed} timed out after {after_ms}ms")]
    Timeout { feed: String, after_ms: u64 },
}

impl FeedError {
    pub fn unavailable(feed: impl Into<String>, reason: impl ToString) -> Self {
        FeedError::Unavailable {
            feed: feed.into(),
            reason: reason.to_string(),
        }
    }

    /// Name of the feed that failed
    pub fn feed(&self) -> &str {
        match self {
            FeedError::Unavailable { feed, .. } | FeedError::Timeout { feed, .. } => feed,
        }
    }
}

/// Persistence errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No durable store is configured
    #[error("Persistence unavailable")]
    Unavailable,

    /// A store is configured but the operation failed
    #[error("Persistence failure: {0}")]
    Failure(String),
}

impl StoreError {
    pub fn failure(err: impl ToString) -> Self {
        StoreError::Failure(err.to_string())
    }
}

/// Poll cycle errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    #[error("All {failed} {asset} feeds failed")]
    AllFeedsFailed { asset: Asset, failed: usize },
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
pub type FeedResult<T> = Result<T, FeedError>;
pub type StoreResult<T> = Result<T, StoreError>;

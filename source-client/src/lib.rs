//! Content sources for opportunity discovery.
//!
//! Every source answers the same [`FetchQuery`] with a best-effort list of
//! [`RawPost`]s. Posts older than the query window are dropped here, so the
//! rest of the pipeline never sees them.

pub mod hackernews;
pub mod reddit;
pub mod scheduler;


use async_trait::async_trait;
use outreach_core::{CoreError, RawPost, TimeWindow};
use std::fmt;

pub use hackernews::HackerNewsClient;
pub use reddit::{RedditClient, RedditListing, RedditListingChild, RedditListingData, RedditPostData};
pub use scheduler::{FetchBatch, FetchScheduler, SchedulerConfig};

/// A single call against a source.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchQuery {
    /// Newest (or top, for long windows) posts of one origin.
    Listing {
        origin: String,
        limit: u32,
        window: TimeWindow,
    },
    /// Site-wide free-text search.
    Search {
        term: String,
        limit: u32,
        window: TimeWindow,
    },
}

impl FetchQuery {
    pub fn listing(origin: impl Into<String>, limit: u32, window: TimeWindow) -> Self {
        FetchQuery::Listing {
            origin: origin.into(),
            limit,
            window,
        }
    }

    pub fn search(term: impl Into<String>, limit: u32, window: TimeWindow) -> Self {
        FetchQuery::Search {
            term: term.into(),
            limit,
            window,
        }
    }

    pub fn window(&self) -> TimeWindow {
        match self {
            FetchQuery::Listing { window, .. } | FetchQuery::Search { window, .. } => *window,
        }
    }

    pub fn limit(&self) -> u32 {
        match self {
            FetchQuery::Listing { limit, .. } | FetchQuery::Search { limit, .. } => {
                (*limit).clamp(1, 100)
            }
        }
    }
}

impl fmt::Display for FetchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchQuery::Listing { origin, .. } => write!(f, "listing:{}", origin),
            FetchQuery::Search { term, .. } => write!(f, "search:{}", term),
        }
    }
}

#[async_trait]
pub trait PostSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<RawPost>, CoreError>;
}

pub(crate) fn require_non_empty(value: &str, what: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidInput {
            message: format!("{} must not be empty", what),
        });
    }
    Ok(())
}

//! Types for feed ingestion.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while fetching or parsing a feed.
///
/// These are internal to the feed module: `FeedFetcher::fetch` resolves
/// every failure to an empty candidate list.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Malformed feed document: {0}")]
    Parse(String),
}

impl FeedError {
    /// Transient failures are worth another attempt within the retry budget.
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::ConnectionFailed(_) | FeedError::Timeout)
    }
}

/// A release candidate produced from one feed item.
///
/// Ephemeral: lives for a single pipeline pass. The content-derived
/// info-hash travels on `ResolvedIdentity` once resolution has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Raw release title from the feed.
    pub name: String,
    /// Torrent URL or magnet URI.
    pub url: String,
    /// Item homepage or GUID, when present.
    pub homepage: Option<String>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            homepage: None,
        }
    }
}

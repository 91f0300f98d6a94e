//! Types for identity resolution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Internal failures on the resolution path. `IdentityResolver::resolve`
/// absorbs these; they never reach the dispatcher.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Failed to fetch torrent data: {0}")]
    Fetch(String),

    #[error("Invalid torrent data: {0}")]
    Decode(String),
}

/// URL-derived and content-derived info-hashes that disagree.
///
/// Some providers name torrent URLs after a hash that is not the true
/// info-hash of the served metainfo; the pair is recorded so the dispatcher
/// can log the discrepancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashMismatch {
    pub url_hash: String,
    pub content_hash: String,
}

/// Result of resolving one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    /// URL to hand to the download backend: the built magnet URI, or the
    /// original URL when it was already a magnet, the hashes disagree, or
    /// resolution failed.
    pub url: String,
    /// Content-derived info-hash (lowercase hex), when known.
    pub info_hash: Option<String>,
    /// Present only when the URL-derived hash disagrees with the content.
    pub mismatch: Option<HashMismatch>,
}

impl ResolvedIdentity {
    /// Identity for a URL that could not be improved upon.
    pub fn passthrough(url: impl Into<String>, info_hash: Option<String>) -> Self {
        Self {
            url: url.into(),
            info_hash,
            mismatch: None,
        }
    }
}

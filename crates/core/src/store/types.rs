//! Persisted records and storage errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type SeriesId = i64;
pub type FeedId = i64;

/// Errors from the repository seam.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Lifecycle status of a series subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Active,
    Retired,
}

/// A tracked series subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub id: SeriesId,
    /// Raw series title as it appears in release names.
    pub title_raw: String,
    /// Season number, when known.
    pub season: Option<u32>,
    /// Filters: a non-empty value constrains matching, empty means any.
    pub group_filter: Option<String>,
    pub subtitle_filter: Option<String>,
    pub source_filter: Option<String>,
    pub resolution_filter: Option<String>,
    /// Canonical search-provider URL; unique dedup key among active records.
    pub canonical_search_url: String,
    /// Save path override; generated from the naming scheme when absent.
    pub save_path: Option<String>,
    /// Offset applied to parsed episode numbers at rename time.
    pub episode_offset: i32,
    pub status: SeriesStatus,
}

impl SeriesRecord {
    pub fn new(title_raw: impl Into<String>, canonical_search_url: impl Into<String>) -> Self {
        Self {
            id: 0,
            title_raw: title_raw.into(),
            season: None,
            group_filter: None,
            subtitle_filter: None,
            source_filter: None,
            resolution_filter: None,
            canonical_search_url: canonical_search_url.into(),
            save_path: None,
            episode_offset: 0,
            status: SeriesStatus::Active,
        }
    }
}

/// A subscribed feed. Its lifecycle is independent of any series; the link
/// is a weak reference established once a match is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSubscription {
    pub id: FeedId,
    pub url: String,
    pub series_id: Option<SeriesId>,
    /// Aggregate feeds carry many series; per-series feeds carry one.
    pub aggregate: bool,
    /// Canonical keys already processed from this feed.
    pub last_seen_keys: Vec<String>,
}

impl FeedSubscription {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: 0,
            url: url.into(),
            series_id: None,
            aggregate: false,
            last_seen_keys: Vec::new(),
        }
    }
}

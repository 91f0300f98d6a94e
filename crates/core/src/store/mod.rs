//! Repository seams over external persistence.
//!
//! Persistence itself is owned by the host: this module defines the narrow
//! repository traits the pipeline consumes and the records that cross them.
//! The traits are separate on purpose; a storage backend composes them
//! rather than exposing one wide session object.

mod types;

pub use types::{
    FeedId, FeedSubscription, SeriesId, SeriesRecord, SeriesStatus, StoreError,
};

use std::sync::Arc;

use async_trait::async_trait;

/// Repository for series subscriptions.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Insert a new subscription.
    ///
    /// `canonical_search_url` must be unique among active records; a
    /// duplicate is rejected with [`StoreError::DuplicateKey`].
    async fn insert(&self, series: SeriesRecord) -> Result<SeriesId, StoreError>;

    /// All active (non-retired) subscriptions.
    async fn active(&self) -> Result<Vec<SeriesRecord>, StoreError>;

    /// Overwrite an existing record (season or save-path updates).
    async fn update(&self, series: SeriesRecord) -> Result<(), StoreError>;

    /// Retire a subscription. Records are never hard-deleted.
    async fn retire(&self, id: SeriesId) -> Result<(), StoreError>;
}

/// Repository for feed subscriptions.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn insert(&self, feed: FeedSubscription) -> Result<FeedId, StoreError>;

    /// All feeds that should be polled.
    async fn active(&self) -> Result<Vec<FeedSubscription>, StoreError>;

    /// Append dedup keys newly seen in one poll of a feed.
    async fn record_seen_keys(&self, id: FeedId, keys: &[String]) -> Result<(), StoreError>;

    /// Establish the weak link from a feed to a matched series.
    async fn link_series(&self, id: FeedId, series: SeriesId) -> Result<(), StoreError>;
}

/// Composition root for the repositories the pipeline needs.
///
/// Handed around explicitly; no component reaches for storage through a
/// global.
#[derive(Clone)]
pub struct Storage {
    pub series: Arc<dyn SeriesStore>,
    pub feeds: Arc<dyn FeedStore>,
}

impl Storage {
    pub fn new(series: Arc<dyn SeriesStore>, feeds: Arc<dyn FeedStore>) -> Self {
        Self { series, feeds }
    }
}

//! In-memory repositories for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{
    FeedId, FeedStore, FeedSubscription, SeriesId, SeriesRecord, SeriesStatus, SeriesStore,
    StoreError,
};

/// In-memory [`SeriesStore`] enforcing the canonical-URL uniqueness rule.
pub struct MemorySeriesStore {
    records: Arc<RwLock<Vec<SeriesRecord>>>,
}

impl Default for MemorySeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySeriesStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Every record including retired ones.
    pub async fn all(&self) -> Vec<SeriesRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl SeriesStore for MemorySeriesStore {
    async fn insert(&self, mut series: SeriesRecord) -> Result<SeriesId, StoreError> {
        let mut records = self.records.write().await;

        let duplicate = records.iter().any(|r| {
            r.status == SeriesStatus::Active
                && r.canonical_search_url == series.canonical_search_url
        });
        if duplicate {
            return Err(StoreError::DuplicateKey(series.canonical_search_url));
        }

        series.id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let id = series.id;
        records.push(series);
        Ok(id)
    }

    async fn active(&self) -> Result<Vec<SeriesRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.status == SeriesStatus::Active)
            .cloned()
            .collect())
    }

    async fn update(&self, series: SeriesRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == series.id) {
            Some(existing) => {
                *existing = series;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("series {}", series.id))),
        }
    }

    async fn retire(&self, id: SeriesId) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(existing) => {
                existing.status = SeriesStatus::Retired;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("series {}", id))),
        }
    }
}

/// In-memory [`FeedStore`].
pub struct MemoryFeedStore {
    records: Arc<RwLock<Vec<FeedSubscription>>>,
}

impl Default for MemoryFeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn get(&self, id: FeedId) -> Option<FeedSubscription> {
        self.records.read().await.iter().find(|f| f.id == id).cloned()
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn insert(&self, mut feed: FeedSubscription) -> Result<FeedId, StoreError> {
        let mut records = self.records.write().await;
        feed.id = records.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        let id = feed.id;
        records.push(feed);
        Ok(id)
    }

    async fn active(&self) -> Result<Vec<FeedSubscription>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn record_seen_keys(&self, id: FeedId, keys: &[String]) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|f| f.id == id) {
            Some(feed) => {
                for key in keys {
                    if !feed.last_seen_keys.contains(key) {
                        feed.last_seen_keys.push(key.clone());
                    }
                }
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("feed {}", id))),
        }
    }

    async fn link_series(&self, id: FeedId, series: SeriesId) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|f| f.id == id) {
            Some(feed) => {
                feed.series_id = Some(series);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("feed {}", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_rejects_duplicate_canonical_url() {
        let store = MemorySeriesStore::new();
        store
            .insert(SeriesRecord::new("Show", "https://example.com/a"))
            .await
            .unwrap();

        let duplicate = store
            .insert(SeriesRecord::new("Show again", "https://example.com/a"))
            .await;
        assert!(matches!(duplicate, Err(StoreError::DuplicateKey(_))));
    }

    #[tokio::test]
    async fn test_retired_series_frees_its_canonical_url() {
        let store = MemorySeriesStore::new();
        let id = store
            .insert(SeriesRecord::new("Show", "https://example.com/a"))
            .await
            .unwrap();
        store.retire(id).await.unwrap();

        // Retired records don't count against uniqueness and aren't active.
        store
            .insert(SeriesRecord::new("Show", "https://example.com/a"))
            .await
            .unwrap();
        assert_eq!(store.active().await.unwrap().len(), 1);
        assert_eq!(store.all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_record_seen_keys_appends_without_duplicates() {
        let store = MemoryFeedStore::new();
        let id = store
            .insert(FeedSubscription::new("https://example.com/rss"))
            .await
            .unwrap();

        store
            .record_seen_keys(id, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        store
            .record_seen_keys(id, &["b".to_string(), "c".to_string()])
            .await
            .unwrap();

        let feed = store.get(id).await.unwrap();
        assert_eq!(feed.last_seen_keys, vec!["a", "b", "c"]);
    }
}

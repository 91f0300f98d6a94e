//! Mock download backend for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::downloader::{
    AddRequest, AddSource, BackendError, DownloadBackend, StatusFilter, TorrentListFilter,
    TorrentRecord,
};
use crate::identity::extract_url_hash;

/// Mock implementation of the DownloadBackend trait.
///
/// Records every add for assertions, tracks accepted torrents so listings
/// work, and can be scripted to fail the next N adds, slow adds down, or
/// reject auth.
pub struct MockDownloadBackend {
    adds: Arc<RwLock<Vec<AddRequest>>>,
    renames: Arc<RwLock<Vec<(String, String, String)>>>,
    deletes: Arc<RwLock<Vec<String>>>,
    torrents: Arc<RwLock<Vec<TorrentRecord>>>,
    files: Arc<RwLock<HashMap<String, Vec<String>>>>,
    fail_adds: Arc<RwLock<u32>>,
    add_delay: Arc<RwLock<Option<Duration>>>,
    fail_auth: Arc<RwLock<bool>>,
    hash_counter: Arc<RwLock<u32>>,
}

impl Default for MockDownloadBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDownloadBackend {
    pub fn new() -> Self {
        Self {
            adds: Arc::new(RwLock::new(Vec::new())),
            renames: Arc::new(RwLock::new(Vec::new())),
            deletes: Arc::new(RwLock::new(Vec::new())),
            torrents: Arc::new(RwLock::new(Vec::new())),
            files: Arc::new(RwLock::new(HashMap::new())),
            fail_adds: Arc::new(RwLock::new(0)),
            add_delay: Arc::new(RwLock::new(None)),
            fail_auth: Arc::new(RwLock::new(false)),
            hash_counter: Arc::new(RwLock::new(0)),
        }
    }

    /// All recorded add requests, in call order.
    pub async fn recorded_adds(&self) -> Vec<AddRequest> {
        self.adds.read().await.clone()
    }

    /// Recorded rename calls as (hash, old_path, new_path).
    pub async fn recorded_renames(&self) -> Vec<(String, String, String)> {
        self.renames.read().await.clone()
    }

    /// Hashes passed to delete.
    pub async fn recorded_deletes(&self) -> Vec<String> {
        self.deletes.read().await.clone()
    }

    /// Make the next `n` add calls fail.
    pub async fn fail_next_adds(&self, n: u32) {
        *self.fail_adds.write().await = n;
    }

    /// Make every add call sleep before completing, so concurrent
    /// submissions actually overlap.
    pub async fn delay_adds(&self, delay: Duration) {
        *self.add_delay.write().await = Some(delay);
    }

    /// Make auth fail.
    pub async fn set_auth_failure(&self, fail: bool) {
        *self.fail_auth.write().await = fail;
    }

    /// Pre-populate a torrent (for testing listings).
    pub async fn push_torrent(&self, record: TorrentRecord) {
        self.torrents.write().await.push(record);
    }

    /// Set the file list a hash reports.
    pub async fn set_files(&self, hash: &str, files: Vec<String>) {
        self.files.write().await.insert(hash.to_string(), files);
    }

    async fn next_hash(&self) -> String {
        let mut counter = self.hash_counter.write().await;
        *counter += 1;
        format!("{:0>40x}", *counter)
    }
}

#[async_trait]
impl DownloadBackend for MockDownloadBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn auth(&self) -> Result<(), BackendError> {
        if *self.fail_auth.read().await {
            return Err(BackendError::AuthenticationFailed(
                "scripted failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn check_host(&self) -> bool {
        true
    }

    async fn logout(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn list_torrents(
        &self,
        filter: &TorrentListFilter,
    ) -> Result<Vec<TorrentRecord>, BackendError> {
        let torrents = self.torrents.read().await;
        let mut result: Vec<TorrentRecord> = torrents
            .iter()
            .filter(|t| match filter.status {
                StatusFilter::All => true,
                StatusFilter::Completed => t.progress >= 1.0,
                StatusFilter::Downloading | StatusFilter::Paused => t.progress < 1.0,
            })
            .filter(|t| match &filter.category {
                Some(category) => t.category.as_ref() == Some(category),
                None => true,
            })
            .cloned()
            .collect();

        if filter.limit > 0 {
            result.truncate(filter.limit);
        }
        Ok(result)
    }

    async fn files(&self, hash: &str) -> Result<Vec<String>, BackendError> {
        self.files
            .read()
            .await
            .get(hash)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(hash.to_string()))
    }

    async fn rename(
        &self,
        hash: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), BackendError> {
        self.renames.write().await.push((
            hash.to_string(),
            old_path.to_string(),
            new_path.to_string(),
        ));
        Ok(())
    }

    async fn relocate(&self, hashes: &[String], location: &str) -> Result<(), BackendError> {
        let mut torrents = self.torrents.write().await;
        for torrent in torrents.iter_mut() {
            if hashes.contains(&torrent.hash) {
                torrent.save_path = location.to_string();
            }
        }
        Ok(())
    }

    async fn add(&self, request: AddRequest) -> Result<(), BackendError> {
        if let Some(delay) = *self.add_delay.read().await {
            tokio::time::sleep(delay).await;
        }

        {
            let mut fail_adds = self.fail_adds.write().await;
            if *fail_adds > 0 {
                *fail_adds -= 1;
                return Err(BackendError::Rejected("scripted failure".to_string()));
            }
        }

        let (hash, name) = match &request.source {
            AddSource::Url(url) => (
                match extract_url_hash(url) {
                    Some(hash) => hash,
                    None => self.next_hash().await,
                },
                url.clone(),
            ),
            AddSource::Metainfo { filename, .. } => (
                self.next_hash().await,
                filename.clone().unwrap_or_else(|| "metainfo".to_string()),
            ),
        };

        self.torrents.write().await.push(TorrentRecord {
            hash,
            name,
            save_path: request.save_path.clone(),
            progress: 0.0,
            category: Some(request.category.clone()),
        });
        self.adds.write().await.push(request);
        Ok(())
    }

    async fn delete(&self, hashes: &[String]) -> Result<(), BackendError> {
        self.torrents
            .write()
            .await
            .retain(|t| !hashes.contains(&t.hash));
        self.deletes.write().await.extend(hashes.iter().cloned());
        Ok(())
    }
}

//! Dispatch of resolved candidates to the download backend.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::feed::Candidate;
use crate::identity::IdentityResolver;
use crate::store::SeriesRecord;

use super::path::gen_save_path;
use super::types::{
    AddRequest, BackendError, DispatchOutcome, DownloadBackend, TorrentListFilter, TorrentRecord,
};

/// Hands resolved candidates to the backend, one save path per series.
///
/// The dispatcher never branches on backend identity. An in-flight set
/// keyed by resolved identity guarantees the same torrent is not submitted
/// twice concurrently.
pub struct DownloadDispatcher {
    backend: Arc<dyn DownloadBackend>,
    resolver: Arc<IdentityResolver>,
    save_root: String,
    category: String,
    in_flight: Mutex<HashSet<String>>,
}

impl DownloadDispatcher {
    pub fn new(
        backend: Arc<dyn DownloadBackend>,
        resolver: Arc<IdentityResolver>,
        save_root: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            resolver,
            save_root: save_root.into(),
            category: category.into(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Resolve one candidate and submit it for the given series.
    async fn dispatch(&self, candidate: &Candidate, series: &SeriesRecord) -> DispatchOutcome {
        let resolved = self.resolver.resolve(candidate).await;

        if let Some(mismatch) = &resolved.mismatch {
            warn!(
                url = candidate.url,
                url_hash = mismatch.url_hash,
                content_hash = mismatch.content_hash,
                "URL hash disagrees with metainfo, submitting original URL"
            );
        }

        // Identity key: the content hash when known, the URL otherwise.
        let key = resolved
            .info_hash
            .clone()
            .unwrap_or_else(|| resolved.url.clone());

        let save_path = series
            .save_path
            .clone()
            .unwrap_or_else(|| gen_save_path(&self.save_root, series));

        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(key.clone()) {
                debug!(key = key, "Skipping torrent already being dispatched");
                return DispatchOutcome {
                    hash: key,
                    series_id: series.id,
                    save_path,
                    succeeded: false,
                    error: Some("already in flight".to_string()),
                };
            }
        }

        let request = AddRequest::url(&resolved.url, &save_path, &self.category);
        let result = self.backend.add(request).await;

        {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.remove(&key);
        }

        match result {
            Ok(()) => {
                info!(
                    series = series.title_raw,
                    save_path = save_path,
                    "Submitted torrent"
                );
                DispatchOutcome {
                    hash: key,
                    series_id: series.id,
                    save_path,
                    succeeded: true,
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    series = series.title_raw,
                    error = %e,
                    "Torrent submission failed"
                );
                DispatchOutcome {
                    hash: key,
                    series_id: series.id,
                    save_path,
                    succeeded: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Submit one candidate. Returns whether the backend accepted it.
    pub async fn submit_one(&self, candidate: &Candidate, series: &SeriesRecord) -> bool {
        self.dispatch(candidate, series).await.succeeded
    }

    /// Submit a batch of candidates for one series concurrently.
    ///
    /// Outcomes come back in input order; one failed item never aborts the
    /// rest of the batch.
    pub async fn submit_many(
        &self,
        candidates: &[Candidate],
        series: &SeriesRecord,
    ) -> Vec<DispatchOutcome> {
        join_all(candidates.iter().map(|c| self.dispatch(c, series))).await
    }

    /// Completed torrents in the dispatcher's category.
    pub async fn completed_torrents(&self) -> Result<Vec<TorrentRecord>, BackendError> {
        self.backend
            .list_torrents(&TorrentListFilter::completed(&self.category))
            .await
    }

    /// Rename one file inside a completed torrent. Returns whether the
    /// backend accepted the rename.
    pub async fn rename_file(&self, hash: &str, old_path: &str, new_path: &str) -> bool {
        match self.backend.rename(hash, old_path, new_path).await {
            Ok(()) => true,
            Err(e) => {
                warn!(hash = hash, error = %e, "Rename failed");
                false
            }
        }
    }

    /// Move torrents to a new location.
    pub async fn relocate(&self, hashes: &[String], location: &str) -> Result<(), BackendError> {
        self.backend.relocate(hashes, location).await
    }

    /// Remove torrents from the backend, keeping downloaded data.
    pub async fn delete(&self, hashes: &[String]) -> Result<(), BackendError> {
        self.backend.delete(hashes).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::MockDownloadBackend;

    fn dispatcher(backend: Arc<MockDownloadBackend>) -> DownloadDispatcher {
        DownloadDispatcher::new(
            backend,
            Arc::new(IdentityResolver::new(1, 1)),
            "/downloads",
            "Bangumi",
        )
    }

    fn series(title: &str) -> SeriesRecord {
        SeriesRecord::new(title, "https://example.com/search")
    }

    fn magnet(tag: &str) -> Candidate {
        Candidate::new(
            tag,
            format!("magnet:?xt=urn:btih:{:0>40}", tag.len()),
        )
    }

    #[tokio::test]
    async fn test_submit_one_records_add() {
        let backend = Arc::new(MockDownloadBackend::new());
        let dispatcher = dispatcher(backend.clone());

        let accepted = dispatcher.submit_one(&magnet("a"), &series("Show")).await;
        assert!(accepted);

        let adds = backend.recorded_adds().await;
        assert_eq!(adds.len(), 1);
        assert_eq!(adds[0].save_path, "/downloads/Show/Season 1");
        assert_eq!(adds[0].category, "Bangumi");
    }

    #[tokio::test]
    async fn test_submit_one_uses_save_path_override() {
        let backend = Arc::new(MockDownloadBackend::new());
        let dispatcher = dispatcher(backend.clone());

        let mut record = series("Show");
        record.save_path = Some("/media/custom".to_string());
        dispatcher.submit_one(&magnet("a"), &record).await;

        let adds = backend.recorded_adds().await;
        assert_eq!(adds[0].save_path, "/media/custom");
    }

    #[tokio::test]
    async fn test_submit_many_preserves_order_and_isolates_failures() {
        let backend = Arc::new(MockDownloadBackend::new());
        backend.fail_next_adds(1).await;
        let dispatcher = dispatcher(backend.clone());

        let candidates = vec![magnet("a"), magnet("bb"), magnet("ccc")];
        let outcomes = dispatcher.submit_many(&candidates, &series("Show")).await;

        assert_eq!(outcomes.len(), 3);
        let failed: usize = outcomes.iter().filter(|o| !o.succeeded).count();
        assert_eq!(failed, 1);
        // Every outcome keeps its input's identity.
        for (candidate, outcome) in candidates.iter().zip(&outcomes) {
            assert!(candidate.url.contains(&outcome.hash));
        }
    }

    #[tokio::test]
    async fn test_in_flight_guard_rejects_concurrent_duplicate() {
        let backend = Arc::new(MockDownloadBackend::new());
        backend.delay_adds(Duration::from_millis(50)).await;
        let dispatcher = dispatcher(backend.clone());

        // Two candidates behind the same resolved hash, in one batch.
        let candidates = vec![magnet("a"), magnet("b")];
        let outcomes = dispatcher.submit_many(&candidates, &series("Show")).await;

        assert_eq!(outcomes.iter().filter(|o| o.succeeded).count(), 1);
        let failed: Vec<_> = outcomes.iter().filter(|o| !o.succeeded).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error.as_deref(), Some("already in flight"));
        assert_eq!(backend.recorded_adds().await.len(), 1);

        // The key is released once the batch settles.
        assert!(dispatcher.submit_one(&magnet("c"), &series("Show")).await);
    }

    #[tokio::test]
    async fn test_backend_failure_is_a_false_not_a_panic() {
        let backend = Arc::new(MockDownloadBackend::new());
        backend.fail_next_adds(1).await;
        let dispatcher = dispatcher(backend);

        let accepted = dispatcher.submit_one(&magnet("a"), &series("Show")).await;
        assert!(!accepted);
    }

    #[tokio::test]
    async fn test_rename_file_reports_backend_result() {
        let backend = Arc::new(MockDownloadBackend::new());
        let dispatcher = dispatcher(backend);
        assert!(dispatcher.rename_file("abc", "old.mkv", "new.mkv").await);
    }
}

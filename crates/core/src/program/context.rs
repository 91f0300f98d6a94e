//! Composition root wiring configuration into running components.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{Config, ConfigError, DownloaderBackend};
use crate::downloader::{
    DownloadBackend, DownloadDispatcher, QBittorrentBackend, TransmissionBackend,
};
use crate::feed::FeedFetcher;
use crate::identity::IdentityResolver;
use crate::search::TorrentSearcher;
use crate::store::Storage;

use super::orchestrator::LifecycleOrchestrator;
use super::types::{Maintenance, StatusProbe};

/// Everything the program runs on, built once from a [`Config`].
pub struct Context {
    pub storage: Storage,
    pub fetcher: Arc<FeedFetcher>,
    pub searcher: Arc<TorrentSearcher>,
    pub dispatcher: Arc<DownloadDispatcher>,
    pub orchestrator: Arc<LifecycleOrchestrator>,
}

impl Context {
    pub fn new(
        config: &Config,
        storage: Storage,
        probe: Arc<dyn StatusProbe>,
        maintenance: Arc<dyn Maintenance>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let backend = build_backend(config)?;
        info!(backend = backend.name(), "Download backend configured");

        let fetcher = Arc::new(FeedFetcher::new(
            config.feeds.timeout_secs,
            config.feeds.retry_budget,
        ));
        let searcher = Arc::new(TorrentSearcher::new(Arc::clone(&fetcher)));
        let resolver = Arc::new(IdentityResolver::new(
            config.feeds.timeout_secs,
            config.feeds.retry_budget,
        ));
        let dispatcher = Arc::new(DownloadDispatcher::new(
            backend,
            resolver,
            config.downloader.save_path_root.clone(),
            config.downloader.category.clone(),
        ));
        let orchestrator = Arc::new(LifecycleOrchestrator::new(
            storage.clone(),
            Arc::clone(&fetcher),
            Arc::clone(&dispatcher),
            probe,
            maintenance,
            Duration::from_secs(config.feeds.poll_interval_secs),
            config.feeds.item_limit,
        ));

        Ok(Self {
            storage,
            fetcher,
            searcher,
            dispatcher,
            orchestrator,
        })
    }
}

fn build_backend(config: &Config) -> Result<Arc<dyn DownloadBackend>, ConfigError> {
    match config.downloader.backend {
        DownloaderBackend::Qbittorrent => {
            let qb = config.downloader.qbittorrent.clone().ok_or_else(|| {
                ConfigError::ValidationError("missing [downloader.qbittorrent]".to_string())
            })?;
            Ok(Arc::new(QBittorrentBackend::new(qb)))
        }
        DownloaderBackend::Transmission => {
            let tr = config.downloader.transmission.clone().ok_or_else(|| {
                ConfigError::ValidationError("missing [downloader.transmission]".to_string())
            })?;
            Ok(Arc::new(TransmissionBackend::new(tr)))
        }
    }
}

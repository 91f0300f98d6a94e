//! Startup sequencing and the feed poll loop.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::downloader::DownloadDispatcher;
use crate::feed::{Candidate, FeedFetcher};
use crate::parser::{match_series, parse_title};
use crate::store::{FeedSubscription, SeriesId, SeriesRecord, Storage};

use super::types::{
    LifecycleError, LifecycleState, Maintenance, OrchestratorStatus, StatusProbe,
};

/// Drives the program through startup and runs the poll loop.
pub struct LifecycleOrchestrator {
    storage: Storage,
    fetcher: Arc<FeedFetcher>,
    dispatcher: Arc<DownloadDispatcher>,
    probe: Arc<dyn StatusProbe>,
    maintenance: Arc<dyn Maintenance>,
    poll_interval: Duration,
    item_limit: usize,

    // Runtime state
    running: Arc<AtomicBool>,
    state: Arc<RwLock<LifecycleState>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl LifecycleOrchestrator {
    pub fn new(
        storage: Storage,
        fetcher: Arc<FeedFetcher>,
        dispatcher: Arc<DownloadDispatcher>,
        probe: Arc<dyn StatusProbe>,
        maintenance: Arc<dyn Maintenance>,
        poll_interval: Duration,
        item_limit: usize,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            storage,
            fetcher,
            dispatcher,
            probe,
            maintenance,
            poll_interval,
            item_limit,
            running: Arc::new(AtomicBool::new(false)),
            state: Arc::new(RwLock::new(LifecycleState::Stopped)),
            shutdown_tx,
        }
    }

    /// Run the startup sequence, then begin polling.
    ///
    /// Steps run in a fixed priority order: a fresh install stops after
    /// initial setup without polling; legacy migration takes precedence
    /// over a version upgrade; image cache backfill runs independently of
    /// either. A failed step leaves the program stopped.
    pub async fn startup(&self) -> Result<LifecycleState, LifecycleError> {
        let probed = match self.probe.probe().await {
            Ok(probed) => probed,
            Err(e) => {
                self.set_state(LifecycleState::Stopped).await;
                return Err(e.into());
            }
        };

        if probed.first_run {
            info!("First run detected, initial setup only");
            self.set_state(LifecycleState::FirstRun).await;
            if let Err(e) = self.maintenance.initialize_store().await {
                self.set_state(LifecycleState::Stopped).await;
                return Err(e);
            }
            return Ok(LifecycleState::FirstRun);
        }

        if probed.legacy_data {
            info!("Legacy data found, migrating");
            self.set_state(LifecycleState::Migrating).await;
            if let Err(e) = self.maintenance.migrate_legacy().await {
                self.set_state(LifecycleState::Stopped).await;
                return Err(e);
            }
        } else if probed.outdated_version {
            info!("Outdated data version, upgrading");
            self.set_state(LifecycleState::Upgrading).await;
            if let Err(e) = self.maintenance.upgrade_version().await {
                self.set_state(LifecycleState::Stopped).await;
                return Err(e);
            }
        }

        if probed.missing_image_cache {
            info!("Backfilling image cache");
            self.set_state(LifecycleState::Caching).await;
            if let Err(e) = self.maintenance.backfill_image_cache().await {
                self.set_state(LifecycleState::Stopped).await;
                return Err(e);
            }
        }

        self.set_state(LifecycleState::Ready).await;
        self.start().await;
        Ok(LifecycleState::Running)
    }

    /// Start the poll loop (spawns a background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!("Starting poll loop");
        self.set_state(LifecycleState::Running).await;
        self.spawn_poll_loop();
    }

    /// Stop the poll loop gracefully.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping poll loop");
        let _ = self.shutdown_tx.send(());
        self.set_state(LifecycleState::Stopped).await;
    }

    /// Stop and start again.
    pub async fn restart(&self) {
        self.stop().await;
        self.start().await;
    }

    /// Current lifecycle snapshot.
    pub async fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            state: *self.state.read().await,
            running: self.running.load(Ordering::Relaxed),
        }
    }

    /// Run one poll cycle over all active feeds.
    pub async fn poll_once(&self) -> Result<(), LifecycleError> {
        Self::poll_cycle(
            &self.storage,
            &self.fetcher,
            &self.dispatcher,
            self.item_limit,
        )
        .await
    }

    async fn set_state(&self, state: LifecycleState) {
        let mut current = self.state.write().await;
        *current = state;
    }

    fn spawn_poll_loop(&self) {
        let running = Arc::clone(&self.running);
        let storage = self.storage.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let dispatcher = Arc::clone(&self.dispatcher);
        let poll_interval = self.poll_interval;
        let item_limit = self.item_limit;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Poll loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Poll loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) =
                            Self::poll_cycle(&storage, &fetcher, &dispatcher, item_limit).await
                        {
                            warn!("Poll cycle error: {}", e);
                        }
                    }
                }
            }
            info!("Poll loop stopped");
        });
    }

    /// Poll every active feed concurrently; each feed is handled on its own
    /// and one broken feed never affects the others.
    async fn poll_cycle(
        storage: &Storage,
        fetcher: &Arc<FeedFetcher>,
        dispatcher: &Arc<DownloadDispatcher>,
        item_limit: usize,
    ) -> Result<(), LifecycleError> {
        let feeds = storage.feeds.active().await?;
        let series = storage.series.active().await?;

        if feeds.is_empty() {
            debug!("No active feeds");
            return Ok(());
        }

        join_all(
            feeds
                .iter()
                .map(|feed| Self::poll_feed(storage, fetcher, dispatcher, feed, &series, item_limit)),
        )
        .await;

        Ok(())
    }

    /// Fetch one feed, match its items against subscribed series, and hand
    /// the new ones to the dispatcher.
    async fn poll_feed(
        storage: &Storage,
        fetcher: &Arc<FeedFetcher>,
        dispatcher: &Arc<DownloadDispatcher>,
        feed: &FeedSubscription,
        series: &[SeriesRecord],
        item_limit: usize,
    ) {
        let candidates = fetcher.fetch(&feed.url, item_limit).await;
        if candidates.is_empty() {
            return;
        }

        let seen: HashSet<&str> = feed.last_seen_keys.iter().map(String::as_str).collect();

        // Group new, matched candidates by series for batch submission.
        let mut grouped: HashMap<SeriesId, (&SeriesRecord, Vec<Candidate>)> = HashMap::new();
        for candidate in candidates {
            if seen.contains(candidate.url.as_str()) {
                continue;
            }
            let parsed = parse_title(&candidate.name);
            if parsed.title_raw.is_empty() {
                continue;
            }
            let Some(matched) = match_series(&parsed, series) else {
                debug!(name = candidate.name, "No subscribed series matches");
                continue;
            };
            grouped
                .entry(matched.id)
                .or_insert_with(|| (matched, Vec::new()))
                .1
                .push(candidate);
        }

        for (record, batch) in grouped.into_values() {
            let outcomes = dispatcher.submit_many(&batch, record).await;

            // Keys for accepted items only; failed ones get retried on the
            // next cycle.
            let new_keys: Vec<String> = batch
                .iter()
                .zip(&outcomes)
                .filter(|(_, outcome)| outcome.succeeded)
                .map(|(candidate, _)| candidate.url.clone())
                .collect();

            if !new_keys.is_empty() {
                if let Err(e) = storage.feeds.record_seen_keys(feed.id, &new_keys).await {
                    warn!(feed = feed.url, error = %e, "Failed to record seen keys");
                }
            }

            if feed.series_id.is_none() && !feed.aggregate {
                if let Err(e) = storage.feeds.link_series(feed.id, record.id).await {
                    warn!(feed = feed.url, error = %e, "Failed to link feed to series");
                }
            }
        }
    }
}

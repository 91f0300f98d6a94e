//! End-to-end poll cycle: feed -> parse -> match -> dispatch.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use mikazuki_core::downloader::DownloadDispatcher;
use mikazuki_core::feed::FeedFetcher;
use mikazuki_core::identity::IdentityResolver;
use mikazuki_core::program::{LifecycleOrchestrator, ProgramState};
use mikazuki_core::store::{FeedStore, FeedSubscription, SeriesStore, Storage};
use mikazuki_core::testing::{
    fixtures, MemoryFeedStore, MemorySeriesStore, MockDownloadBackend, RecordingMaintenance,
    StaticProbe,
};

/// Serve a fixed body over HTTP on an ephemeral local port.
async fn serve(body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/xml\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });

    format!("http://{}/feed.xml", addr)
}

struct Harness {
    backend: Arc<MockDownloadBackend>,
    feeds: Arc<MemoryFeedStore>,
    orchestrator: LifecycleOrchestrator,
    feed_id: i64,
}

async fn harness(feed_body: String) -> Harness {
    let series_store = Arc::new(MemorySeriesStore::new());
    let feeds = Arc::new(MemoryFeedStore::new());
    let storage = Storage::new(series_store.clone(), feeds.clone());

    series_store
        .insert(fixtures::series("Mushoku Tensei"))
        .await
        .unwrap();

    let feed_url = serve(feed_body).await;
    let feed_id = feeds.insert(FeedSubscription::new(&feed_url)).await.unwrap();

    let backend = Arc::new(MockDownloadBackend::new());
    let fetcher = Arc::new(FeedFetcher::new(5, 2));
    let dispatcher = Arc::new(DownloadDispatcher::new(
        backend.clone(),
        Arc::new(IdentityResolver::new(5, 2)),
        "/downloads",
        "Bangumi",
    ));
    let orchestrator = LifecycleOrchestrator::new(
        storage,
        fetcher,
        dispatcher,
        Arc::new(StaticProbe::new(ProgramState::default())),
        Arc::new(RecordingMaintenance::new()),
        Duration::from_secs(3600),
        0,
    );

    Harness {
        backend,
        feeds,
        orchestrator,
        feed_id,
    }
}

#[tokio::test]
async fn poll_cycle_dispatches_matched_candidates() {
    let magnet = fixtures::magnet(0xabc);
    let other = fixtures::magnet(0xdef);
    let body = fixtures::rss_feed(&[
        (
            "[Lilith-Raws] Mushoku Tensei - 11 [WEB-DL][1080p][CHT][MP4]",
            magnet.as_str(),
        ),
        (
            "[Other-Group] Unrelated Show - 03 [720p]",
            other.as_str(),
        ),
    ]);
    let h = harness(body).await;

    h.orchestrator.poll_once().await.unwrap();

    // Only the subscribed series is dispatched, into its generated path.
    let adds = h.backend.recorded_adds().await;
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].save_path, "/downloads/Mushoku Tensei/Season 1");
    assert_eq!(adds[0].category, "Bangumi");

    // The accepted item's key is persisted on the feed.
    let feed = h.feeds.get(h.feed_id).await.unwrap();
    assert_eq!(feed.last_seen_keys, vec![magnet]);
}

#[tokio::test]
async fn second_poll_skips_already_seen_items() {
    let magnet = fixtures::magnet(0x123);
    let body = fixtures::rss_feed(&[(
        "[Lilith-Raws] Mushoku Tensei - 12 [WEB-DL][1080p][CHT][MP4]",
        magnet.as_str(),
    )]);
    let h = harness(body).await;

    h.orchestrator.poll_once().await.unwrap();
    h.orchestrator.poll_once().await.unwrap();

    let adds = h.backend.recorded_adds().await;
    assert_eq!(adds.len(), 1);
}

#[tokio::test]
async fn failed_dispatch_leaves_item_unseen_for_retry() {
    let magnet = fixtures::magnet(0x777);
    let body = fixtures::rss_feed(&[(
        "[Lilith-Raws] Mushoku Tensei - 13 [WEB-DL][1080p][CHT][MP4]",
        magnet.as_str(),
    )]);
    let h = harness(body).await;
    h.backend.fail_next_adds(1).await;

    h.orchestrator.poll_once().await.unwrap();
    let feed = h.feeds.get(h.feed_id).await.unwrap();
    assert!(feed.last_seen_keys.is_empty());

    // Next cycle retries and succeeds.
    h.orchestrator.poll_once().await.unwrap();
    let feed = h.feeds.get(h.feed_id).await.unwrap();
    assert_eq!(feed.last_seen_keys, vec![magnet]);
}

#[tokio::test]
async fn unreachable_feed_is_not_an_error() {
    let series_store = Arc::new(MemorySeriesStore::new());
    let feeds = Arc::new(MemoryFeedStore::new());
    let storage = Storage::new(series_store, feeds.clone());
    feeds
        .insert(FeedSubscription::new("http://127.0.0.1:9/feed.xml"))
        .await
        .unwrap();

    let orchestrator = LifecycleOrchestrator::new(
        storage,
        Arc::new(FeedFetcher::new(1, 1)),
        Arc::new(DownloadDispatcher::new(
            Arc::new(MockDownloadBackend::new()),
            Arc::new(IdentityResolver::new(1, 1)),
            "/downloads",
            "Bangumi",
        )),
        Arc::new(StaticProbe::new(ProgramState::default())),
        Arc::new(RecordingMaintenance::new()),
        Duration::from_secs(3600),
        0,
    );

    orchestrator.poll_once().await.unwrap();
}

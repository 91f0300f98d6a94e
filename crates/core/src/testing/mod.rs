//! Testing utilities and mock implementations.
//!
//! Mock implementations of the external seams (download backend,
//! repositories, lifecycle probe and maintenance), allowing end-to-end
//! pipeline tests without real infrastructure.

mod memory_store;
mod mock_backend;
mod mock_lifecycle;

pub use memory_store::{MemoryFeedStore, MemorySeriesStore};
pub use mock_backend::MockDownloadBackend;
pub use mock_lifecycle::{RecordingMaintenance, StaticProbe};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::store::SeriesRecord;

    /// Render an RSS document from (title, url) item pairs.
    pub fn rss_feed(items: &[(&str, &str)]) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <rss version=\"2.0\"><channel><title>test feed</title>",
        );
        for (title, url) in items {
            xml.push_str(&format!(
                "<item><title>{}</title><link>{}</link></item>",
                title, url
            ));
        }
        xml.push_str("</channel></rss>");
        xml
    }

    /// An active subscription with the usual filters unset.
    pub fn series(title: &str) -> SeriesRecord {
        SeriesRecord::new(
            title,
            format!(
                "https://mikanani.me/RSS/Search?searchstr={}",
                urlencoding::encode(title)
            ),
        )
    }

    /// A magnet URI with a synthetic 40-hex hash derived from the seed.
    pub fn magnet(seed: u32) -> String {
        format!("magnet:?xt=urn:btih:{:0>40x}", seed)
    }
}

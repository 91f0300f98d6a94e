//! Keyword search over a provider feed.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::feed::{Candidate, FeedFetcher};
use crate::parser::{parse_title, ParsedTitle};
use crate::store::SeriesRecord;

use super::provider::{search_url, SearchProvider};

/// One emitted search match: the feed item plus its parsed attributes and
/// canonical key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesCandidate {
    pub torrent: Candidate,
    pub parsed: ParsedTitle,
    pub canonical_url: String,
}

/// Turn fetched feed items into emitted matches.
///
/// Successive emissions are de-duplicated by canonical key on providers
/// that require unique URLs; `limit == 0` means unbounded.
fn emit_candidates(
    torrents: Vec<Candidate>,
    provider: SearchProvider,
    limit: usize,
) -> Vec<SeriesCandidate> {
    let mut emitted = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for torrent in torrents {
        if limit > 0 && emitted.len() >= limit {
            break;
        }
        let parsed = parse_title(&torrent.name);
        if parsed.title_raw.is_empty() {
            continue;
        }
        let canonical_url = search_url(provider, &parsed.search_fields());
        if provider.requires_unique_urls() && !seen.insert(canonical_url.clone()) {
            continue;
        }
        emitted.push(SeriesCandidate {
            torrent,
            parsed,
            canonical_url,
        });
    }

    emitted
}

/// Searches providers and emits de-duplicated series candidates.
pub struct TorrentSearcher {
    fetcher: Arc<FeedFetcher>,
}

impl TorrentSearcher {
    pub fn new(fetcher: Arc<FeedFetcher>) -> Self {
        Self { fetcher }
    }

    /// Search a provider for the keyword list and emit at most `limit`
    /// matches.
    ///
    /// Each call re-queries the provider; results are finite and not
    /// restartable across calls.
    pub async fn search(
        &self,
        keywords: &[String],
        provider: SearchProvider,
        limit: usize,
    ) -> Vec<SeriesCandidate> {
        let url = search_url(provider, keywords);
        let torrents = self.fetcher.fetch(&url, 0).await;
        let emitted = emit_candidates(torrents, provider, limit);

        debug!(
            provider = provider.as_str(),
            emitted = emitted.len(),
            "Search complete"
        );
        emitted
    }

    /// Re-query a subscribed series' canonical URL and keep candidates whose
    /// release name contains the series title.
    pub async fn search_season(&self, series: &SeriesRecord) -> Vec<Candidate> {
        let torrents = self.fetcher.fetch(&series.canonical_search_url, 0).await;
        torrents
            .into_iter()
            .filter(|t| t.name.contains(&series.title_raw))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, url: &str) -> Candidate {
        Candidate::new(name, url)
    }

    #[test]
    fn test_in_call_dedup_by_canonical_key() {
        let torrents = vec![
            candidate("[G] Show - 01 [1080p]", "https://example.com/1"),
            candidate("[G] Show - 02 [1080p]", "https://example.com/2"),
            candidate("[G] Other - 01 [1080p]", "https://example.com/3"),
        ];
        let emitted = emit_candidates(torrents, SearchProvider::Mikan, 0);
        // Episodes 1 and 2 of the same series share one canonical key.
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].parsed.title_raw, "Show");
        assert_eq!(emitted[1].parsed.title_raw, "Other");
    }

    #[test]
    fn test_kisssub_skips_dedup() {
        let torrents = vec![
            candidate("[G] Show - 01 [1080p]", "https://example.com/1"),
            candidate("[G] Show - 02 [1080p]", "https://example.com/2"),
        ];
        let emitted = emit_candidates(torrents, SearchProvider::Kisssub, 0);
        assert_eq!(emitted.len(), 2);
    }

    #[test]
    fn test_limit_bounds_emissions() {
        let torrents = vec![
            candidate("[G] A - 01 [1080p]", "https://example.com/1"),
            candidate("[G] B - 01 [1080p]", "https://example.com/2"),
            candidate("[G] C - 01 [1080p]", "https://example.com/3"),
        ];
        let emitted = emit_candidates(torrents, SearchProvider::Mikan, 2);
        assert_eq!(emitted.len(), 2);
    }

    #[test]
    fn test_unparseable_titles_are_dropped() {
        let torrents = vec![candidate("[OnlyGroup]", "https://example.com/1")];
        let emitted = emit_candidates(torrents, SearchProvider::Mikan, 0);
        assert!(emitted.is_empty());
    }
}

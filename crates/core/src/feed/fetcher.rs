//! Feed fetching with a bounded retry budget.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::parser::parse_feed;
use super::types::{Candidate, FeedError};

/// Default number of attempts on transient network failure.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Fetches syndication feeds and turns them into release candidates.
pub struct FeedFetcher {
    client: Client,
    retry_budget: u32,
}

impl FeedFetcher {
    pub fn new(timeout_secs: u64, retry_budget: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            retry_budget: retry_budget.max(1),
        }
    }

    /// Fetch a feed and parse it into candidates.
    ///
    /// Up to the retry budget of attempts on transient failure. On final
    /// failure, or a malformed document, the failure is logged and an empty
    /// list is returned; this never errors out to the poll cycle.
    /// `limit == 0` returns every item.
    pub async fn fetch(&self, url: &str, limit: usize) -> Vec<Candidate> {
        let body = match self.get_with_retry(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = url, error = %e, "Feed fetch failed, returning no candidates");
                return Vec::new();
            }
        };

        match parse_feed(&body, limit) {
            Ok(candidates) => {
                debug!(url = url, count = candidates.len(), "Parsed feed");
                candidates
            }
            Err(e) => {
                warn!(url = url, error = %e, "Feed parse failed, returning no candidates");
                Vec::new()
            }
        }
    }

    async fn get_with_retry(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let mut last_error = FeedError::ConnectionFailed("no attempt made".to_string());

        for attempt in 1..=self.retry_budget {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.retry_budget => {
                    debug!(url = url, attempt = attempt, error = %e, "Transient feed failure, retrying");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout
            } else if e.is_connect() {
                FeedError::ConnectionFailed(e.to_string())
            } else {
                FeedError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Http(format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_unreachable_host_returns_empty() {
        // Port 9 on localhost refuses connections; the budget is exhausted
        // and the failure resolves to an empty list.
        let fetcher = FeedFetcher::new(1, 2);
        let candidates = fetcher.fetch("http://127.0.0.1:9/feed.xml", 0).await;
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_retry_budget_floor() {
        let fetcher = FeedFetcher::new(1, 0);
        assert_eq!(fetcher.retry_budget, 1);
    }
}

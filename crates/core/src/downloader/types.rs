//! Types for download backends and dispatch outcomes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::SeriesId;

/// Errors that can occur during backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Rejected by backend: {0}")]
    Rejected(String),
}

/// Status filter for torrent listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    All,
    Downloading,
    Completed,
    Paused,
}

/// Filters for listing torrents.
#[derive(Debug, Clone)]
pub struct TorrentListFilter {
    pub status: StatusFilter,
    pub category: Option<String>,
    pub tag: Option<String>,
    /// `0` means no limit.
    pub limit: usize,
}

impl Default for TorrentListFilter {
    fn default() -> Self {
        Self {
            status: StatusFilter::All,
            category: None,
            tag: None,
            limit: 0,
        }
    }
}

impl TorrentListFilter {
    /// Listing used to find finished downloads awaiting rename: completed
    /// torrents in the given category.
    pub fn completed(category: impl Into<String>) -> Self {
        Self {
            status: StatusFilter::Completed,
            category: Some(category.into()),
            tag: None,
            limit: 0,
        }
    }
}

/// A torrent as reported by a backend listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Info hash (lowercase hex).
    pub hash: String,
    pub name: String,
    pub save_path: String,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
    pub category: Option<String>,
}

/// What to add: a URL (magnet or torrent file) or raw metainfo bytes.
#[derive(Debug, Clone)]
pub enum AddSource {
    Url(String),
    Metainfo {
        data: Vec<u8>,
        filename: Option<String>,
    },
}

/// Request to add a new download.
#[derive(Debug, Clone)]
pub struct AddRequest {
    pub source: AddSource,
    pub save_path: String,
    pub category: String,
}

impl AddRequest {
    pub fn url(url: impl Into<String>, save_path: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            source: AddSource::Url(url.into()),
            save_path: save_path.into(),
            category: category.into(),
        }
    }
}

/// Per-candidate result of one dispatch batch. Ephemeral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Resolved hash when known, otherwise the candidate URL.
    pub hash: String,
    pub series_id: SeriesId,
    pub save_path: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Capability set of a download client backend.
///
/// Every concrete backend implements the full set. Sessions are
/// authenticated lazily: a backend re-authenticates when a call fails with
/// an auth error, never proactively.
#[async_trait]
pub trait DownloadBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Establish an authenticated session.
    async fn auth(&self) -> Result<(), BackendError>;

    /// Whether the backend host is reachable.
    async fn check_host(&self) -> bool;

    /// Tear down the session.
    async fn logout(&self) -> Result<(), BackendError>;

    /// List torrents matching the filter.
    async fn list_torrents(
        &self,
        filter: &TorrentListFilter,
    ) -> Result<Vec<TorrentRecord>, BackendError>;

    /// File paths inside a torrent.
    async fn files(&self, hash: &str) -> Result<Vec<String>, BackendError>;

    /// Rename one file within a torrent.
    async fn rename(&self, hash: &str, old_path: &str, new_path: &str)
        -> Result<(), BackendError>;

    /// Move torrents to a new location.
    async fn relocate(&self, hashes: &[String], location: &str) -> Result<(), BackendError>;

    /// Add a new download.
    async fn add(&self, request: AddRequest) -> Result<(), BackendError>;

    /// Remove torrents (downloaded data is kept).
    async fn delete(&self, hashes: &[String]) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_filter() {
        let filter = TorrentListFilter::completed("Bangumi");
        assert_eq!(filter.status, StatusFilter::Completed);
        assert_eq!(filter.category.as_deref(), Some("Bangumi"));
        assert_eq!(filter.limit, 0);
    }

    #[test]
    fn test_add_request_url_builder() {
        let req = AddRequest::url("magnet:?xt=urn:btih:abc", "/downloads/Show", "Bangumi");
        match req.source {
            AddSource::Url(u) => assert_eq!(u, "magnet:?xt=urn:btih:abc"),
            _ => panic!("Expected Url source"),
        }
        assert_eq!(req.save_path, "/downloads/Show");
        assert_eq!(req.category, "Bangumi");
    }

    #[test]
    fn test_error_display() {
        let err = BackendError::AuthenticationFailed("Invalid credentials".to_string());
        assert_eq!(err.to_string(), "Authentication failed: Invalid credentials");
    }
}

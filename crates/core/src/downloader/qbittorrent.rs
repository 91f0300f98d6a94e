//! qBittorrent download backend implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::QBittorrentConfig;

use super::types::{
    AddRequest, AddSource, BackendError, DownloadBackend, StatusFilter, TorrentListFilter,
    TorrentRecord,
};

/// qBittorrent WebUI client.
pub struct QBittorrentBackend {
    client: Client,
    config: QBittorrentConfig,
    /// Session marker (refreshed on auth failure).
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentBackend {
    /// Create a new qBittorrent backend.
    pub fn new(config: QBittorrentConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Login and store session cookie.
    async fn login(&self) -> Result<(), BackendError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else if e.is_connect() {
                    BackendError::ConnectionFailed(e.to_string())
                } else {
                    BackendError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            // Session cookie is stored by the cookie jar
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(BackendError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(BackendError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), BackendError> {
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.login().await
    }

    /// Make an authenticated GET request.
    async fn get(&self, endpoint: &str) -> Result<String, BackendError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout
            } else {
                BackendError::ApiError(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 403 {
            // Session expired, retry after login
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;

            // Retry the request
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| BackendError::ApiError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(BackendError::ApiError(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            return response
                .text()
                .await
                .map_err(|e| BackendError::ApiError(e.to_string()));
        }

        if !status.is_success() {
            return Err(BackendError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| BackendError::ApiError(e.to_string()))
    }

    /// Make an authenticated POST request with form data.
    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, BackendError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self
            .client
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 403 {
            // Session expired, retry after login
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;

            // Retry the request
            let response = self
                .client
                .post(&url)
                .form(params)
                .send()
                .await
                .map_err(|e| BackendError::ApiError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(BackendError::ApiError(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            return response
                .text()
                .await
                .map_err(|e| BackendError::ApiError(e.to_string()));
        }

        if !status.is_success() {
            return Err(BackendError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| BackendError::ApiError(e.to_string()))
    }

    /// Make an authenticated POST request with multipart data.
    async fn post_multipart(
        &self,
        endpoint: &str,
        form: multipart::Form,
    ) -> Result<String, BackendError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| BackendError::ApiError(e.to_string()))
    }
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    progress: f64,
    save_path: String,
    category: String,
}

impl QBTorrentInfo {
    fn into_record(self) -> TorrentRecord {
        TorrentRecord {
            hash: self.hash.to_lowercase(),
            name: self.name,
            save_path: self.save_path,
            progress: self.progress,
            category: if self.category.is_empty() {
                None
            } else {
                Some(self.category)
            },
        }
    }
}

/// qBittorrent file entry response.
#[derive(Debug, Deserialize)]
struct QBFileEntry {
    name: String,
}

/// Map a status filter to the qBittorrent `filter` query value.
fn status_query(status: StatusFilter) -> Option<&'static str> {
    match status {
        StatusFilter::All => None,
        StatusFilter::Downloading => Some("downloading"),
        StatusFilter::Completed => Some("completed"),
        StatusFilter::Paused => Some("paused"),
    }
}

#[async_trait]
impl DownloadBackend for QBittorrentBackend {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn auth(&self) -> Result<(), BackendError> {
        self.login().await
    }

    async fn check_host(&self) -> bool {
        let url = format!("{}/api/v2/app/version", self.base_url());
        match self.client.get(&url).send().await {
            Ok(response) => {
                // 403 still proves the WebUI is listening
                response.status().is_success() || response.status().as_u16() == 403
            }
            Err(e) => {
                debug!(error = %e, "qBittorrent host check failed");
                false
            }
        }
    }

    async fn logout(&self) -> Result<(), BackendError> {
        self.post_form("/api/v2/auth/logout", &[]).await?;
        let mut session = self.session.write().await;
        *session = None;
        Ok(())
    }

    async fn list_torrents(
        &self,
        filter: &TorrentListFilter,
    ) -> Result<Vec<TorrentRecord>, BackendError> {
        let mut endpoint = "/api/v2/torrents/info".to_string();
        let mut query_parts = Vec::new();

        if let Some(status) = status_query(filter.status) {
            query_parts.push(format!("filter={}", status));
        }
        if let Some(category) = &filter.category {
            query_parts.push(format!("category={}", urlencoding::encode(category)));
        }
        if let Some(tag) = &filter.tag {
            query_parts.push(format!("tag={}", urlencoding::encode(tag)));
        }
        if filter.limit > 0 {
            query_parts.push(format!("limit={}", filter.limit));
        }

        if !query_parts.is_empty() {
            endpoint.push('?');
            endpoint.push_str(&query_parts.join("&"));
        }

        let response = self.get(&endpoint).await?;
        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&response)
            .map_err(|e| BackendError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(torrents.into_iter().map(|t| t.into_record()).collect())
    }

    async fn files(&self, hash: &str) -> Result<Vec<String>, BackendError> {
        let endpoint = format!("/api/v2/torrents/files?hash={}", hash.to_lowercase());
        let response = self.get(&endpoint).await?;

        if response.trim().is_empty() {
            return Err(BackendError::NotFound(hash.to_string()));
        }

        let files: Vec<QBFileEntry> = serde_json::from_str(&response)
            .map_err(|e| BackendError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(files.into_iter().map(|f| f.name).collect())
    }

    async fn rename(
        &self,
        hash: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), BackendError> {
        let hash_lower = hash.to_lowercase();
        self.post_form(
            "/api/v2/torrents/renameFile",
            &[
                ("hash", &hash_lower),
                ("oldPath", old_path),
                ("newPath", new_path),
            ],
        )
        .await?;
        Ok(())
    }

    async fn relocate(&self, hashes: &[String], location: &str) -> Result<(), BackendError> {
        let joined = hashes.join("|").to_lowercase();
        self.post_form(
            "/api/v2/torrents/setLocation",
            &[("hashes", &joined), ("location", location)],
        )
        .await?;
        Ok(())
    }

    async fn add(&self, request: AddRequest) -> Result<(), BackendError> {
        let mut form = match request.source {
            AddSource::Url(url) => multipart::Form::new().text("urls", url),
            AddSource::Metainfo { data, filename } => {
                let part = multipart::Part::bytes(data)
                    .file_name(filename.unwrap_or_else(|| "torrent.torrent".to_string()))
                    .mime_str("application/x-bittorrent")
                    .map_err(|e| BackendError::Rejected(e.to_string()))?;
                multipart::Form::new().part("torrents", part)
            }
        };

        form = form
            .text("savepath", request.save_path)
            .text("category", request.category);

        let body = self.post_multipart("/api/v2/torrents/add", form).await?;
        if body.contains("Fails.") {
            return Err(BackendError::Rejected(body));
        }
        Ok(())
    }

    async fn delete(&self, hashes: &[String]) -> Result<(), BackendError> {
        let joined = hashes.join("|").to_lowercase();
        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", &joined), ("deleteFiles", "false")],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> QBittorrentBackend {
        QBittorrentBackend::new(QBittorrentConfig {
            url: "http://127.0.0.1:9/".to_string(),
            username: "admin".to_string(),
            password: "adminadmin".to_string(),
            timeout_secs: 1,
        })
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        assert_eq!(backend().base_url(), "http://127.0.0.1:9");
    }

    #[test]
    fn test_status_query_mapping() {
        assert_eq!(status_query(StatusFilter::All), None);
        assert_eq!(status_query(StatusFilter::Downloading), Some("downloading"));
        assert_eq!(status_query(StatusFilter::Completed), Some("completed"));
        assert_eq!(status_query(StatusFilter::Paused), Some("paused"));
    }

    #[test]
    fn test_torrent_info_conversion() {
        let info = QBTorrentInfo {
            hash: "ABC123".to_string(),
            name: "Test Torrent".to_string(),
            progress: 0.5,
            save_path: "/downloads/Show/Season 1".to_string(),
            category: String::new(),
        };
        let record = info.into_record();
        assert_eq!(record.hash, "abc123"); // lowercase
        assert_eq!(record.save_path, "/downloads/Show/Season 1");
        assert!(record.category.is_none());
    }

    #[tokio::test]
    async fn test_check_host_unreachable() {
        assert!(!backend().check_host().await);
    }

    #[tokio::test]
    async fn test_auth_unreachable_host_is_connection_error() {
        let result = backend().auth().await;
        assert!(matches!(
            result,
            Err(BackendError::ConnectionFailed(_)) | Err(BackendError::Timeout)
        ));
    }
}

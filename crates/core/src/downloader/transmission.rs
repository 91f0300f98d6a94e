//! Transmission download backend implementation (JSON-RPC).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::TransmissionConfig;

use super::types::{
    AddRequest, AddSource, BackendError, DownloadBackend, StatusFilter, TorrentListFilter,
    TorrentRecord,
};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Transmission RPC client.
///
/// Transmission hands out a session id via a 409 response instead of a
/// login endpoint; the id is cached and refreshed whenever a call gets
/// another 409.
pub struct TransmissionBackend {
    client: Client,
    config: TransmissionConfig,
    session_id: Arc<RwLock<Option<String>>>,
}

/// Transmission RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

/// Torrent entry in a `torrent-get` response.
#[derive(Debug, Deserialize)]
struct TrTorrent {
    #[serde(rename = "hashString")]
    hash_string: String,
    name: String,
    #[serde(rename = "percentDone")]
    percent_done: f64,
    #[serde(rename = "downloadDir")]
    download_dir: String,
    /// 0 = stopped, 4 = downloading, 6 = seeding.
    status: i64,
    #[serde(default)]
    labels: Vec<String>,
}

impl TrTorrent {
    fn into_record(self) -> TorrentRecord {
        TorrentRecord {
            hash: self.hash_string.to_lowercase(),
            name: self.name,
            save_path: self.download_dir,
            progress: self.percent_done,
            category: self.labels.into_iter().next(),
        }
    }

    fn matches(&self, status: StatusFilter) -> bool {
        match status {
            StatusFilter::All => true,
            StatusFilter::Downloading => self.status == 4,
            StatusFilter::Completed => self.percent_done >= 1.0,
            StatusFilter::Paused => self.status == 0,
        }
    }
}

impl TransmissionBackend {
    /// Create a new Transmission backend.
    pub fn new(config: TransmissionConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            session_id: Arc::new(RwLock::new(None)),
        }
    }

    fn request(&self, body: &Value, session_id: Option<&str>) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(&self.config.url).json(body);
        if let Some(id) = session_id {
            builder = builder.header(SESSION_HEADER, id);
        }
        if let Some(username) = &self.config.username {
            builder = builder.basic_auth(username, self.config.password.as_deref());
        }
        builder
    }

    /// Issue one RPC call, renegotiating the session id on 409.
    async fn call(&self, method: &str, arguments: Value) -> Result<Value, BackendError> {
        let body = json!({ "method": method, "arguments": arguments });

        let session_id = self.session_id.read().await.clone();
        let response = self
            .request(&body, session_id.as_deref())
            .send()
            .await
            .map_err(map_send_error)?;

        let response = if response.status().as_u16() == 409 {
            let new_id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    BackendError::ApiError("409 without a session id header".to_string())
                })?;
            debug!("Transmission session id renegotiated");
            {
                let mut session = self.session_id.write().await;
                *session = Some(new_id.clone());
            }
            self.request(&body, Some(&new_id))
                .send()
                .await
                .map_err(map_send_error)?
        } else {
            response
        };

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(BackendError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(BackendError::ApiError(format!("HTTP {}", status)));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| BackendError::ApiError(e.to_string()))?;

        if rpc.result != "success" {
            return Err(BackendError::ApiError(rpc.result));
        }
        Ok(rpc.arguments)
    }

    async fn torrents(&self, ids: Option<&[String]>, fields: &[&str]) -> Result<Vec<Value>, BackendError> {
        let mut arguments = json!({ "fields": fields });
        if let Some(ids) = ids {
            arguments["ids"] = json!(ids);
        }
        let result = self.call("torrent-get", arguments).await?;
        match result.get("torrents") {
            Some(Value::Array(torrents)) => Ok(torrents.clone()),
            _ => Err(BackendError::ApiError(
                "torrent-get response missing torrents".to_string(),
            )),
        }
    }
}

fn map_send_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_connect() {
        BackendError::ConnectionFailed(e.to_string())
    } else {
        BackendError::ApiError(e.to_string())
    }
}

#[async_trait]
impl DownloadBackend for TransmissionBackend {
    fn name(&self) -> &str {
        "transmission"
    }

    async fn auth(&self) -> Result<(), BackendError> {
        self.call("session-get", json!({})).await?;
        Ok(())
    }

    async fn check_host(&self) -> bool {
        // Any HTTP response proves the daemon is listening, 409 and 401
        // included.
        match self.client.post(&self.config.url).json(&json!({ "method": "session-get" })).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Transmission host check failed");
                false
            }
        }
    }

    async fn logout(&self) -> Result<(), BackendError> {
        // No logout RPC; dropping the session id is all there is to do.
        let mut session = self.session_id.write().await;
        *session = None;
        Ok(())
    }

    async fn list_torrents(
        &self,
        filter: &TorrentListFilter,
    ) -> Result<Vec<TorrentRecord>, BackendError> {
        let torrents = self
            .torrents(
                None,
                &[
                    "hashString",
                    "name",
                    "percentDone",
                    "downloadDir",
                    "status",
                    "labels",
                ],
            )
            .await?;

        // Transmission has no server-side filters; apply them here.
        let mut records = Vec::new();
        for value in torrents {
            let torrent: TrTorrent = serde_json::from_value(value)
                .map_err(|e| BackendError::ApiError(format!("Failed to parse response: {}", e)))?;

            if !torrent.matches(filter.status) {
                continue;
            }
            if let Some(category) = &filter.category {
                if !torrent.labels.iter().any(|l| l == category) {
                    continue;
                }
            }
            if let Some(tag) = &filter.tag {
                if !torrent.labels.iter().any(|l| l == tag) {
                    continue;
                }
            }

            records.push(torrent.into_record());
            if filter.limit > 0 && records.len() >= filter.limit {
                break;
            }
        }
        Ok(records)
    }

    async fn files(&self, hash: &str) -> Result<Vec<String>, BackendError> {
        let ids = [hash.to_lowercase()];
        let torrents = self.torrents(Some(&ids), &["hashString", "files"]).await?;

        let torrent = torrents
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(hash.to_string()))?;

        let files = torrent
            .get("files")
            .and_then(Value::as_array)
            .ok_or_else(|| BackendError::ApiError("torrent has no file list".to_string()))?;

        Ok(files
            .iter()
            .filter_map(|f| f.get("name").and_then(Value::as_str))
            .map(|s| s.to_string())
            .collect())
    }

    async fn rename(
        &self,
        hash: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), BackendError> {
        // torrent-rename-path renames the last component only.
        let new_name = new_path.rsplit('/').next().unwrap_or(new_path);
        self.call(
            "torrent-rename-path",
            json!({
                "ids": [hash.to_lowercase()],
                "path": old_path,
                "name": new_name,
            }),
        )
        .await?;
        Ok(())
    }

    async fn relocate(&self, hashes: &[String], location: &str) -> Result<(), BackendError> {
        let ids: Vec<String> = hashes.iter().map(|h| h.to_lowercase()).collect();
        self.call(
            "torrent-set-location",
            json!({ "ids": ids, "location": location, "move": true }),
        )
        .await?;
        Ok(())
    }

    async fn add(&self, request: AddRequest) -> Result<(), BackendError> {
        let mut arguments = json!({
            "download-dir": request.save_path,
            "labels": [request.category],
        });

        match request.source {
            AddSource::Url(url) => arguments["filename"] = json!(url),
            AddSource::Metainfo { data, .. } => {
                arguments["metainfo"] = json!(BASE64.encode(&data))
            }
        }

        let result = self.call("torrent-add", arguments).await?;
        if result.get("torrent-duplicate").is_some() {
            warn!("Transmission already has this torrent");
        }
        Ok(())
    }

    async fn delete(&self, hashes: &[String]) -> Result<(), BackendError> {
        let ids: Vec<String> = hashes.iter().map(|h| h.to_lowercase()).collect();
        self.call(
            "torrent-remove",
            json!({ "ids": ids, "delete-local-data": false }),
        )
        .await?;
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::search::SearchProvider;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub feeds: FeedConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub downloader: DownloaderConfig,
}

impl Config {
    /// Cross-field validation: the selected backend must come with its
    /// own configuration section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.downloader.backend {
            DownloaderBackend::Qbittorrent if self.downloader.qbittorrent.is_none() => {
                Err(ConfigError::ValidationError(
                    "backend = \"qbittorrent\" requires a [downloader.qbittorrent] section"
                        .to_string(),
                ))
            }
            DownloaderBackend::Transmission if self.downloader.transmission.is_none() => {
                Err(ConfigError::ValidationError(
                    "backend = \"transmission\" requires a [downloader.transmission] section"
                        .to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Feed polling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Seconds between poll cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Attempts per fetch on transient network failure
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    /// Per-feed item cap; 0 means no cap
    #[serde(default)]
    pub item_limit: usize,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            retry_budget: default_retry_budget(),
            item_limit: 0,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_poll_interval() -> u64 {
    900
}

fn default_retry_budget() -> u32 {
    3
}

fn default_timeout() -> u64 {
    30
}

/// Provider search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Search provider the canonical URLs are built for
    #[serde(default = "default_provider")]
    pub provider: SearchProvider,
    /// Emission cap per search call
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            limit: default_search_limit(),
        }
    }
}

fn default_provider() -> SearchProvider {
    SearchProvider::Mikan
}

fn default_search_limit() -> usize {
    5
}

/// Downloader configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    /// Download backend type
    pub backend: DownloaderBackend,
    /// Root directory the per-series save paths are generated under
    pub save_path_root: String,
    /// Category new downloads are tagged with
    #[serde(default = "default_category")]
    pub category: String,
    /// qBittorrent-specific configuration (required when backend = "qbittorrent")
    #[serde(default)]
    pub qbittorrent: Option<QBittorrentConfig>,
    /// Transmission-specific configuration (required when backend = "transmission")
    #[serde(default)]
    pub transmission: Option<TransmissionConfig>,
}

/// Available download backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownloaderBackend {
    Qbittorrent,
    Transmission,
}

fn default_category() -> String {
    "Bangumi".to_string()
}

/// qBittorrent download backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// WebUI URL (e.g., "http://localhost:8080")
    pub url: String,
    pub username: String,
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Transmission download backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransmissionConfig {
    /// RPC URL (e.g., "http://localhost:9091/transmission/rpc")
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Sanitized config for external exposure (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub feeds: FeedConfig,
    pub search: SearchConfig,
    pub downloader: SanitizedDownloaderConfig,
}

/// Sanitized downloader config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDownloaderConfig {
    pub backend: String,
    pub save_path_root: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub credentials_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let (backend, url, credentials_configured) = match config.downloader.backend {
            DownloaderBackend::Qbittorrent => {
                let qb = config.downloader.qbittorrent.as_ref();
                (
                    "qbittorrent".to_string(),
                    qb.map(|c| c.url.clone()),
                    qb.map(|c| !c.password.is_empty()).unwrap_or(false),
                )
            }
            DownloaderBackend::Transmission => {
                let tr = config.downloader.transmission.as_ref();
                (
                    "transmission".to_string(),
                    tr.map(|c| c.url.clone()),
                    tr.map(|c| c.password.is_some()).unwrap_or(false),
                )
            }
        };

        Self {
            feeds: config.feeds.clone(),
            search: config.search.clone(),
            downloader: SanitizedDownloaderConfig {
                backend,
                save_path_root: config.downloader.save_path_root.clone(),
                category: config.downloader.category.clone(),
                url,
                credentials_configured,
            },
        }
    }
}

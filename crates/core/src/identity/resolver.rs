//! Metainfo decoding and magnet construction.

use std::time::Duration;

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use tracing::{debug, warn};

use crate::feed::Candidate;

use super::types::{HashMismatch, IdentityError, ResolvedIdentity};

/// 40-hex info-hash token embedded in a URL.
static URL_HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9a-fA-F]{40}").unwrap());

/// Extract the hash a URL claims to reference: the first 40-hex token in
/// the URL string, lowercased.
pub fn extract_url_hash(url: &str) -> Option<String> {
    URL_HASH_RE.find(url).map(|m| m.as_str().to_lowercase())
}

/// Decode bencoded metainfo and build the canonical magnet identity.
///
/// Returns the lowercase-hex info-hash of the `info` dictionary and a
/// `magnet:?xt=urn:btih:<hash>` URI carrying the display name and one `tr`
/// parameter per announce entry, in document order.
pub fn magnet_from_bytes(bytes: &[u8]) -> Result<(String, String), IdentityError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| IdentityError::Decode(e.to_string()))?;

    let hash = torrent.info_hash.as_string();
    let mut magnet = format!("magnet:?xt=urn:btih:{}", hash);

    if let Some(name) = torrent.info.name.as_ref() {
        let name = String::from_utf8_lossy(name.as_ref());
        if !name.is_empty() {
            magnet.push_str("&dn=");
            magnet.push_str(&urlencoding::encode(&name));
        }
    }

    for tracker in torrent
        .announce
        .iter()
        .chain(torrent.announce_list.iter().flatten())
    {
        let tracker = String::from_utf8_lossy(tracker.as_ref());
        magnet.push_str("&tr=");
        magnet.push_str(&urlencoding::encode(&tracker));
    }

    Ok((hash, magnet))
}

/// Resolves candidates to canonical magnet identities.
pub struct IdentityResolver {
    client: Client,
    retry_budget: u32,
}

impl IdentityResolver {
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

    /// Resolve a candidate's URL to its canonical identity.
    ///
    /// Magnet URLs are already canonical and pass through unchanged. For
    /// torrent-file URLs the metainfo is fetched and decoded; when the
    /// content-derived hash disagrees with the one embedded in the URL the
    /// original URL is kept and the pair is attached. Failures degrade to
    /// the original URL; this never errors.
    pub async fn resolve(&self, candidate: &Candidate) -> ResolvedIdentity {
        let url = candidate.url.as_str();

        if url.starts_with("magnet:") {
            return ResolvedIdentity::passthrough(url, extract_url_hash(url));
        }

        let bytes = match self.fetch_bytes(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = url, error = %e, "Torrent fetch failed, keeping original URL");
                return ResolvedIdentity::passthrough(url, None);
            }
        };

        let (content_hash, magnet) = match magnet_from_bytes(&bytes) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(url = url, error = %e, "Torrent decode failed, keeping original URL");
                return ResolvedIdentity::passthrough(url, None);
            }
        };

        match extract_url_hash(url) {
            Some(url_hash) if url_hash != content_hash => {
                debug!(
                    url = url,
                    url_hash = url_hash,
                    content_hash = content_hash,
                    "URL hash disagrees with metainfo"
                );
                ResolvedIdentity {
                    url: url.to_string(),
                    info_hash: Some(content_hash.clone()),
                    mismatch: Some(HashMismatch {
                        url_hash,
                        content_hash,
                    }),
                }
            }
            _ => ResolvedIdentity {
                url: magnet,
                info_hash: Some(content_hash),
                mismatch: None,
            },
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, IdentityError> {
        let mut last_error = IdentityError::Fetch("no attempt made".to_string());

        for attempt in 1..=self.retry_budget {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(IdentityError::Fetch(format!("HTTP {}", status)));
                    }
                    return response
                        .bytes()
                        .await
                        .map(|b| b.to_vec())
                        .map_err(|e| IdentityError::Fetch(e.to_string()));
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.retry_budget => {
                    debug!(url = url, attempt = attempt, "Transient torrent fetch failure, retrying");
                    last_error = IdentityError::Fetch(e.to_string());
                }
                Err(e) => return Err(IdentityError::Fetch(e.to_string())),
            }
        }

        Err(last_error)
    }
}

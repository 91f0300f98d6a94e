//! Search providers and their URL templates.

use serde::{Deserialize, Serialize};

/// Known search providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchProvider {
    Mikan,
    Dmhy,
    Kisssub,
}

impl SearchProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchProvider::Mikan => "mikan",
            SearchProvider::Dmhy => "dmhy",
            SearchProvider::Kisssub => "kisssub",
        }
    }

    /// Kisssub result URLs are not unique per series, so in-call dedup by
    /// canonical key is skipped for it.
    pub fn requires_unique_urls(&self) -> bool {
        !matches!(self, SearchProvider::Kisssub)
    }
}

/// Build the provider search URL for an ordered keyword list.
///
/// Keywords are individually URL-encoded and joined with `+` in the given
/// order, so equal keyword lists always produce equal URLs.
pub fn search_url(provider: SearchProvider, keywords: &[String]) -> String {
    let query = keywords
        .iter()
        .map(|k| urlencoding::encode(k).into_owned())
        .collect::<Vec<_>>()
        .join("+");

    match provider {
        SearchProvider::Mikan => {
            format!("https://mikanani.me/RSS/Search?searchstr={}", query)
        }
        SearchProvider::Dmhy => {
            format!("https://www.dmhy.org/topics/rss/rss.xml?keyword={}", query)
        }
        SearchProvider::Kisssub => {
            format!("https://www.kisssub.org/rss.xml?keyword={}", query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_keywords() {
        let url = search_url(
            SearchProvider::Mikan,
            &["Lilith-Raws".to_string(), "无职转生".to_string()],
        );
        assert!(url.starts_with("https://mikanani.me/RSS/Search?searchstr="));
        assert!(url.contains("Lilith-Raws+%E6%97%A0%E8%81%8C%E8%BD%AC%E7%94%9F"));
    }

    #[test]
    fn test_kisssub_exempt_from_unique_urls() {
        assert!(SearchProvider::Mikan.requires_unique_urls());
        assert!(SearchProvider::Dmhy.requires_unique_urls());
        assert!(!SearchProvider::Kisssub.requires_unique_urls());
    }
}

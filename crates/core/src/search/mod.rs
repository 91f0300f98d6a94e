//! Provider search and canonical dedup keys.
//!
//! A canonical key is the search-provider URL deterministically composed
//! from a parsed title's matched fields; identical parses always yield the
//! identical key, which is what feed-level and in-call deduplication hang
//! off of.

mod provider;
mod searcher;

pub use provider::{search_url, SearchProvider};
pub use searcher::{SeriesCandidate, TorrentSearcher};

use crate::parser::ParsedTitle;

/// Canonical dedup key for a parsed title on a provider.
pub fn canonical_key(parsed: &ParsedTitle, provider: SearchProvider) -> String {
    search_url(provider, &parsed.search_fields())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_title;

    #[test]
    fn test_canonical_key_is_deterministic() {
        let a = parse_title("[Lilith-Raws] Show - 11 [WEB-DL][1080p][CHT][MP4]");
        let b = parse_title("[Lilith-Raws] Show - 12 [WEB-DL][1080p][CHT][MP4]");
        // Episode number is not part of the key: both parses carry the same
        // field values everywhere else.
        assert_eq!(
            canonical_key(&a, SearchProvider::Mikan),
            canonical_key(&b, SearchProvider::Mikan)
        );
    }

    #[test]
    fn test_canonical_key_reflects_unmatched_markers() {
        let with_tags = parse_title("[Lilith-Raws] Show - 11 [1080p]");
        let without_tags = parse_title("[Lilith-Raws] Show - 11");
        assert_ne!(
            canonical_key(&with_tags, SearchProvider::Mikan),
            canonical_key(&without_tags, SearchProvider::Mikan)
        );
    }
}

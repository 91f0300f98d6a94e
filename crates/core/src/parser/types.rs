//! Types for title parsing.

use serde::{Deserialize, Serialize};

/// Structured attributes extracted from one release title.
///
/// Every optional field is either a value some rule actually matched or
/// `None`, the explicit unmatched marker. Nothing here is inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    /// Release group from the leading bracketed tag.
    pub group: Option<String>,
    /// Series title with group, tags, season and episode tokens stripped.
    pub title_raw: String,
    /// Season number, when a season keyword matched.
    pub season: Option<u32>,
    /// Episode number, when an episode pattern matched.
    pub episode: Option<u32>,
    /// Subtitle-language tag (CHT, CHS, ...).
    pub subtitle: Option<String>,
    /// Source tag (WEB-DL, BDRip, ...).
    pub source: Option<String>,
    /// Resolution tag (1080p, 720p, ...).
    pub resolution: Option<String>,
}

impl ParsedTitle {
    /// Ordered non-empty fields used for canonical search keys.
    ///
    /// Order is fixed: group, title, season, subtitle, source, resolution.
    pub fn search_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if let Some(group) = &self.group {
            fields.push(group.clone());
        }
        if !self.title_raw.is_empty() {
            fields.push(self.title_raw.clone());
        }
        if let Some(season) = self.season {
            fields.push(format!("S{}", season));
        }
        if let Some(subtitle) = &self.subtitle {
            fields.push(subtitle.clone());
        }
        if let Some(source) = &self.source {
            fields.push(source.clone());
        }
        if let Some(resolution) = &self.resolution {
            fields.push(resolution.clone());
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_fields_order_and_skipping() {
        let parsed = ParsedTitle {
            group: Some("Lilith-Raws".to_string()),
            title_raw: "Show".to_string(),
            season: None,
            episode: Some(11),
            subtitle: Some("CHT".to_string()),
            source: None,
            resolution: Some("1080p".to_string()),
        };
        assert_eq!(parsed.search_fields(), vec!["Lilith-Raws", "Show", "CHT", "1080p"]);
    }
}

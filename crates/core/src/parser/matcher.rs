//! Matching parsed titles against subscribed series.

use crate::store::{SeriesRecord, SeriesStatus};

use super::types::ParsedTitle;

fn filter_accepts(filter: &Option<String>, value: &Option<String>) -> bool {
    match filter {
        Some(wanted) if !wanted.is_empty() => value.as_deref() == Some(wanted.as_str()),
        _ => true,
    }
}

/// Find the subscribed series a parsed title belongs to.
///
/// A candidate matches a series only if the raw titles are equal and every
/// non-empty filter field on the series (group, subtitle, source,
/// resolution) equals the candidate's corresponding field. Empty filters
/// impose no constraint. Retired series never match.
pub fn match_series<'a>(
    parsed: &ParsedTitle,
    series: &'a [SeriesRecord],
) -> Option<&'a SeriesRecord> {
    series.iter().find(|s| {
        s.status == SeriesStatus::Active
            && s.title_raw == parsed.title_raw
            && filter_accepts(&s.group_filter, &parsed.group)
            && filter_accepts(&s.subtitle_filter, &parsed.subtitle)
            && filter_accepts(&s.source_filter, &parsed.source)
            && filter_accepts(&s.resolution_filter, &parsed.resolution)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_title;
    use crate::store::SeriesRecord;

    fn series(title: &str) -> SeriesRecord {
        SeriesRecord::new(title, format!("https://mikanani.me/RSS/Search?searchstr={}", title))
    }

    #[test]
    fn test_matches_on_title_with_no_filters() {
        let parsed = parse_title("[Lilith-Raws] Show - 11 [WEB-DL][1080p][CHT][MP4]");
        let subscribed = vec![series("Other"), series("Show")];
        let matched = match_series(&parsed, &subscribed).unwrap();
        assert_eq!(matched.title_raw, "Show");
    }

    #[test]
    fn test_title_mismatch_rejects() {
        let parsed = parse_title("[Lilith-Raws] Show - 11 [1080p]");
        let subscribed = vec![series("Different Show")];
        assert!(match_series(&parsed, &subscribed).is_none());
    }

    #[test]
    fn test_non_empty_filter_must_match() {
        let parsed = parse_title("[Lilith-Raws] Show - 11 [WEB-DL][1080p][CHT]");

        let mut wrong_group = series("Show");
        wrong_group.group_filter = Some("OtherGroup".to_string());
        assert!(match_series(&parsed, &[wrong_group]).is_none());

        let mut right_group = series("Show");
        right_group.group_filter = Some("Lilith-Raws".to_string());
        right_group.resolution_filter = Some("1080p".to_string());
        assert!(match_series(&parsed, &[right_group]).is_some());
    }

    #[test]
    fn test_empty_string_filter_imposes_no_constraint() {
        let parsed = parse_title("[Lilith-Raws] Show - 11 [1080p]");
        let mut s = series("Show");
        s.subtitle_filter = Some(String::new());
        assert!(match_series(&parsed, &[s]).is_some());
    }

    #[test]
    fn test_filter_against_unmatched_field_rejects() {
        // The candidate has no subtitle tag; a subtitle filter cannot match.
        let parsed = parse_title("[Lilith-Raws] Show - 11 [1080p]");
        let mut s = series("Show");
        s.subtitle_filter = Some("CHT".to_string());
        assert!(match_series(&parsed, &[s]).is_none());
    }

    #[test]
    fn test_retired_series_never_matches() {
        let parsed = parse_title("[Lilith-Raws] Show - 11 [1080p]");
        let mut s = series("Show");
        s.status = crate::store::SeriesStatus::Retired;
        assert!(match_series(&parsed, &[s]).is_none());
    }
}

//! Ordered pattern rules for release titles.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::ParsedTitle;

/// Leading bracketed release group: `[Lilith-Raws] ...`.
static GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\[([^\[\]]+)\]").unwrap());

/// Any remaining bracketed tag.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]").unwrap());

/// Resolution tags: 720p, 1080P, 2160p, 4K.
static RESOLUTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(\d{3,4}[pi]|[24]k)$").unwrap());

/// Source tags.
static SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(web-?dl|web-?rip|bd-?rip|blu-?ray|hdtv|dvd-?rip|tv-?rip|bd|baha|b-global|cr)$")
        .unwrap()
});

/// Subtitle-language tags.
static SUBTITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(cht|chs|big5|gb|jptc|jpsc|简体|繁體|简中|繁中|简繁|简日|繁日)$").unwrap()
});

/// Bare episode number in a bracket tag: `[11]`.
static TAG_EPISODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,4}$").unwrap());

/// Trailing episode after a dash separator: `Show - 11`, `Show - EP11v2`.
static EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?)\s*-\s*(?:e|ep)?(\d{1,4})(?:v\d+)?\s*$").unwrap());

/// CJK episode marker: `第11话`.
static CJK_EPISODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"第(\d{1,4})[话話集]").unwrap());

/// Season keywords: `S2`, `Season 2`.
static SEASON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:s|season\s*)(\d{1,2})\b").unwrap());

/// CJK season keyword: `第二季`, `第3季`.
static CJK_SEASON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"第([0-9一二三四五六七八九十]{1,3})季").unwrap());

fn cjk_numeral(text: &str) -> Option<u32> {
    if let Ok(n) = text.parse::<u32>() {
        return Some(n);
    }
    let digits = ["一", "二", "三", "四", "五", "六", "七", "八", "九", "十"];
    digits
        .iter()
        .position(|d| *d == text)
        .map(|idx| idx as u32 + 1)
}

/// Parse a free-text release title into structured attributes.
///
/// Rules run in a fixed order: group extraction, tag classification,
/// season keyword, episode pattern. Idempotent over the same input.
pub fn parse_title(raw: &str) -> ParsedTitle {
    let mut rest = raw.trim().to_string();

    // Rule 1: leading bracketed group.
    let group = GROUP_RE.captures(&rest).map(|c| c[1].trim().to_string());
    let group_range = GROUP_RE.find(&rest).map(|m| m.range());
    if let Some(range) = group_range {
        rest.replace_range(range, "");
    }

    // Rule 2: classify the remaining bracketed tags, then strip them.
    let mut subtitle = None;
    let mut source = None;
    let mut resolution = None;
    let mut tag_episode = None;
    for caps in TAG_RE.captures_iter(&rest) {
        let tag = caps[1].trim();
        if resolution.is_none() && RESOLUTION_RE.is_match(tag) {
            resolution = Some(tag.to_string());
        } else if source.is_none() && SOURCE_RE.is_match(tag) {
            source = Some(tag.to_string());
        } else if subtitle.is_none() && SUBTITLE_RE.is_match(tag) {
            subtitle = Some(tag.to_string());
        } else if tag_episode.is_none() && TAG_EPISODE_RE.is_match(tag) {
            tag_episode = tag.parse::<u32>().ok();
        }
        // Container and codec tags (MP4, AVC AAC, ...) fall through untouched.
    }
    let mut main = TAG_RE.replace_all(&rest, " ").to_string();

    // Rule 3: season keyword, removed from the title remainder.
    let mut season = None;
    if let Some(caps) = SEASON_RE.captures(&main) {
        season = caps[1].parse::<u32>().ok();
        let range = caps.get(0).map(|m| m.range());
        if let Some(range) = range {
            main.replace_range(range, " ");
        }
    } else if let Some(caps) = CJK_SEASON_RE.captures(&main) {
        season = cjk_numeral(&caps[1]);
        let range = caps.get(0).map(|m| m.range());
        if let Some(range) = range {
            main.replace_range(range, " ");
        }
    }

    // Rule 4: episode number, preferring the dash-separated trailing form.
    let mut episode = None;
    let main_trimmed = main.trim().to_string();
    if let Some(caps) = EPISODE_RE.captures(&main_trimmed) {
        episode = caps[2].parse::<u32>().ok();
        main = caps[1].to_string();
    } else if let Some(caps) = CJK_EPISODE_RE.captures(&main_trimmed) {
        episode = caps[1].parse::<u32>().ok();
        main = CJK_EPISODE_RE.replace(&main_trimmed, " ").to_string();
    } else {
        episode = episode.or(tag_episode);
        main = main_trimmed;
    }

    let title_raw = main
        .trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == '/')
        .trim()
        .to_string();

    ParsedTitle {
        group,
        title_raw,
        season,
        episode,
        subtitle,
        source,
        resolution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptance_vector() {
        let parsed = parse_title("[Lilith-Raws] Show - 11 [WEB-DL][1080p][CHT][MP4]");
        assert_eq!(parsed.group.as_deref(), Some("Lilith-Raws"));
        assert_eq!(parsed.title_raw, "Show");
        assert_eq!(parsed.episode, Some(11));
        assert_eq!(parsed.resolution.as_deref(), Some("1080p"));
        assert_eq!(parsed.subtitle.as_deref(), Some("CHT"));
        assert_eq!(parsed.source.as_deref(), Some("WEB-DL"));
        assert_eq!(parsed.season, None);
    }

    #[test]
    fn test_parse_is_idempotent_field_for_field() {
        let raw = "[Lilith-Raws] Show - 11 [Baha][WEB-DL][1080p][AVC AAC][CHT][MP4]";
        assert_eq!(parse_title(raw), parse_title(raw));
    }

    #[test]
    fn test_unmatched_fields_are_none() {
        let parsed = parse_title("Some Plain Title");
        assert_eq!(parsed.group, None);
        assert_eq!(parsed.season, None);
        assert_eq!(parsed.episode, None);
        assert_eq!(parsed.subtitle, None);
        assert_eq!(parsed.source, None);
        assert_eq!(parsed.resolution, None);
        assert_eq!(parsed.title_raw, "Some Plain Title");
    }

    #[test]
    fn test_season_keyword() {
        let parsed = parse_title("[Group] Show S2 - 03 [1080p]");
        assert_eq!(parsed.season, Some(2));
        assert_eq!(parsed.episode, Some(3));
        assert_eq!(parsed.title_raw, "Show");
    }

    #[test]
    fn test_cjk_season_numeral() {
        let parsed = parse_title("[字幕组] 某动画 第二季 - 05 [简体][1080p]");
        assert_eq!(parsed.season, Some(2));
        assert_eq!(parsed.episode, Some(5));
        assert_eq!(parsed.subtitle.as_deref(), Some("简体"));
    }

    #[test]
    fn test_cjk_episode_marker() {
        let parsed = parse_title("[字幕组] 某动画 第11话 [CHS]");
        assert_eq!(parsed.episode, Some(11));
    }

    #[test]
    fn test_bracketed_episode_tag() {
        let parsed = parse_title("[Group] Show [03][1080p]");
        assert_eq!(parsed.episode, Some(3));
        assert_eq!(parsed.title_raw, "Show");
    }

    #[test]
    fn test_first_matching_tag_wins() {
        let parsed = parse_title("[G] Show - 01 [720p][1080p]");
        assert_eq!(parsed.resolution.as_deref(), Some("720p"));
    }

    #[test]
    fn test_episode_version_suffix() {
        let parsed = parse_title("[G] Show - 07v2 [1080p]");
        assert_eq!(parsed.episode, Some(7));
        assert_eq!(parsed.title_raw, "Show");
    }

    #[test]
    fn test_episode_is_non_negative_integer() {
        let parsed = parse_title("[G] Show - 0 [1080p]");
        assert_eq!(parsed.episode, Some(0));
    }
}

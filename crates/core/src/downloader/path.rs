//! Save path generation.

use crate::store::SeriesRecord;

/// Build the save path for a series: `<root>/<title>/Season <n>`.
///
/// A series with no recorded season lands in Season 1. That default is
/// applied only here; the stored record keeps its `None`.
pub fn gen_save_path(root: &str, series: &SeriesRecord) -> String {
    let title = sanitize_component(&series.title_raw);
    let season = series.season.unwrap_or(1);
    format!("{}/{}/Season {}", root.trim_end_matches('/'), title, season)
}

/// Strip characters that would break a path component.
fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => ' ',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

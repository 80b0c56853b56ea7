//! Text normalization helpers shared by the mergers and derivation passes.

use std::sync::OnceLock;

use regex::Regex;

use crate::constants::endpoints::FILE_PATH_URL_MARKERS;
use crate::constants::merge::{
    LEADING_ARTICLES, LINE_BREAK_PATTERN, PARAGRAPH_BREAK_PATTERN, UNTITLED_SUFFIX_PATTERN,
};
use crate::data::GeoPoint;
use crate::types::Filename;

fn cached_regex(cell: &'static OnceLock<Regex>, pattern: &'static str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("constant regex pattern"))
}

fn paragraph_break() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached_regex(&CELL, PARAGRAPH_BREAK_PATTERN)
}

fn line_break() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached_regex(&CELL, LINE_BREAK_PATTERN)
}

fn untitled_suffix() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    cached_regex(&CELL, UNTITLED_SUFFIX_PATTERN)
}

/// Take the trailing path segment of an entity URI.
///
/// `http://www.wikidata.org/entity/Q123` → `Q123`. Values without a `/` are
/// returned unchanged so pre-extracted ids pass through.
pub fn entity_id_from_uri(value: &str) -> Option<&str> {
    let trimmed = value.trim().trim_end_matches('/');
    let id = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if id.is_empty() { None } else { Some(id) }
}

/// Strip the media repository file-path URL prefix and percent-decode the rest.
pub fn image_filename_from_url(value: &str) -> Filename {
    let raw = FILE_PATH_URL_MARKERS
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))
        .unwrap_or(value);
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Parse a `Point(lon lat)` literal into a point.
pub fn parse_point_literal(value: &str) -> Option<GeoPoint> {
    let inner = value
        .trim()
        .strip_prefix("Point(")
        .and_then(|rest| rest.strip_suffix(')'))?;
    let mut parts = inner.split_whitespace();
    let lon = parts.next()?.parse::<f64>().ok()?;
    let lat = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() || !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some(GeoPoint { lat, lon })
}

/// Wrap inscription text into paragraphs split on double line breaks.
pub fn format_inscription(text: &str) -> String {
    format!("<p>{}</p>", paragraph_break().replace_all(text, "</p><p>"))
}

/// Bracketed index title for an untitled entity, built from its primary label.
///
/// `Rizal Park historical marker` → `[Rizal Park]`.
pub fn untitled_substitute(label: &str) -> String {
    format!("[{}]", untitled_suffix().replace(label, ""))
}

/// Replace inline line breaks with spaces for single-line display.
pub fn flatten_line_breaks(text: &str) -> String {
    line_break().replace_all(text, " ").into_owned()
}

/// Alphabetic sort key: drop one leading non-alphanumeric character, then one
/// leading article.
pub fn alpha_sort_key(title: &str) -> String {
    let mut chars = title.chars();
    let trimmed = match chars.next() {
        Some(first) if !first.is_ascii_alphanumeric() => chars.as_str(),
        _ => title,
    };
    LEADING_ARTICLES
        .iter()
        .find_map(|article| trimmed.strip_prefix(article))
        .unwrap_or(trimmed)
        .to_string()
}

/// Digits of an entity id (`Q1234` → 1234).
pub fn numeric_id_key(id: &str) -> Option<u64> {
    let mut chars = id.chars();
    chars.next()?;
    chars.as_str().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ids_come_from_trailing_segment() {
        assert_eq!(
            entity_id_from_uri("http://www.wikidata.org/entity/Q17221213"),
            Some("Q17221213")
        );
        assert_eq!(entity_id_from_uri("Q5"), Some("Q5"));
        assert_eq!(entity_id_from_uri("  "), None);
    }

    #[test]
    fn image_filenames_are_decoded() {
        assert_eq!(
            image_filename_from_url(
                "http://commons.wikimedia.org/wiki/Special:FilePath/Rizal%20Park%20marker.jpg"
            ),
            "Rizal Park marker.jpg"
        );
        assert_eq!(image_filename_from_url("Plain.jpg"), "Plain.jpg");
    }

    #[test]
    fn point_literals_parse_lon_then_lat() {
        let point = parse_point_literal("Point(121.0 14.5)").unwrap();
        assert_eq!(point.lat, 14.5);
        assert_eq!(point.lon, 121.0);
        assert_eq!(parse_point_literal("Point(121.0)"), None);
        assert_eq!(parse_point_literal("POLYGON((1 2))"), None);
        assert_eq!(parse_point_literal("Point(1 2 3)"), None);
    }

    #[test]
    fn inscriptions_split_on_double_breaks() {
        assert_eq!(
            format_inscription("First.<br /><br>Second. <BR/> <br/> Third."),
            "<p>First.</p><p>Second.</p><p>Third.</p>"
        );
        assert_eq!(format_inscription("Line<br>break"), "<p>Line<br>break</p>");
    }

    #[test]
    fn untitled_substitute_strips_suffix_case_insensitively() {
        assert_eq!(untitled_substitute("Rizal Park historical marker"), "[Rizal Park]");
        assert_eq!(untitled_substitute("Fort Santiago Historical Marker"), "[Fort Santiago]");
        assert_eq!(untitled_substitute("Plain label"), "[Plain label]");
    }

    #[test]
    fn alpha_sort_key_drops_symbol_and_article() {
        assert_eq!(alpha_sort_key("\"The Battle of Manila\""), "Battle of Manila\"");
        assert_eq!(alpha_sort_key("Ang Simbahan"), "Simbahan");
        assert_eq!(alpha_sort_key("[Rizal Park]"), "Rizal Park]");
        assert_eq!(alpha_sort_key("Theater"), "Theater");
    }

    #[test]
    fn numeric_keys_use_id_digits() {
        assert_eq!(numeric_id_key("Q1234"), Some(1234));
        assert_eq!(numeric_id_key("Qx"), None);
        assert_eq!(numeric_id_key(""), None);
    }

    #[test]
    fn line_breaks_flatten_to_spaces() {
        assert_eq!(flatten_line_breaks("Old<br/>Town"), "Old Town");
    }
}

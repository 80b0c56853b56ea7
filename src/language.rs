//! Language table lookups and translation selection.
//!
//! The table order is the global language preference order: derived record
//! language lists and translation fallbacks both follow it.

use indexmap::IndexMap;

use crate::constants::languages::LANGUAGE_TABLE;
use crate::types::LangCode;

/// One entry of the fixed language table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LanguageInfo {
    /// Short language code used as a map key.
    pub code: &'static str,
    /// Human-readable name shown by the presenter.
    pub name: &'static str,
    /// Knowledge-graph item id of the language.
    pub item_id: &'static str,
}

/// Iterate the language table in preference order.
pub fn preference_order() -> impl Iterator<Item = LanguageInfo> {
    LANGUAGE_TABLE
        .iter()
        .map(|&(code, name, item_id)| LanguageInfo {
            code,
            name,
            item_id,
        })
}

/// Look up a language by its code.
pub fn by_code(code: &str) -> Option<LanguageInfo> {
    preference_order().find(|info| info.code == code)
}

/// Map a language item id (e.g. `Q1860`) to its code; `None` when not in the table.
pub fn code_for_item(item_id: &str) -> Option<LangCode> {
    preference_order()
        .find(|info| info.item_id == item_id)
        .map(|info| info.code.to_string())
}

/// Pick a value from a per-language map.
///
/// Returns the entry for `preferred` when present, otherwise the first
/// populated entry in table order. Entries for codes outside the table are
/// never chosen by the fallback.
pub fn translation<'a, T>(
    map: &'a IndexMap<LangCode, Option<T>>,
    preferred: Option<&str>,
) -> Option<&'a T> {
    if let Some(code) = preferred
        && let Some(Some(value)) = map.get(code)
    {
        return Some(value);
    }
    preference_order().find_map(|info| map.get(info.code).and_then(Option::as_ref))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_ids_map_to_codes() {
        assert_eq!(code_for_item("Q1860").as_deref(), Some("en"));
        assert_eq!(code_for_item("Q36121").as_deref(), Some("pam"));
        assert_eq!(code_for_item("Q9999999"), None);
        assert_eq!(by_code("ilo").map(|info| info.name), Some("Ilocano"));
    }

    #[test]
    fn preference_order_starts_with_english_then_tagalog() {
        let codes: Vec<&str> = preference_order().map(|info| info.code).collect();
        assert_eq!(&codes[..3], &["en", "tl", "ceb"]);
        assert_eq!(codes.iter().position(|code| *code == "fr"), Some(7));
    }

    #[test]
    fn translation_prefers_requested_then_table_order() {
        let mut map: IndexMap<LangCode, Option<&str>> = IndexMap::new();
        map.insert("es".into(), Some("Marcador"));
        map.insert("en".into(), None);
        map.insert("tl".into(), Some("Panandang"));

        assert_eq!(translation(&map, Some("es")), Some(&"Marcador"));
        assert_eq!(translation(&map, None), Some(&"Panandang"));
        assert_eq!(translation(&map, Some("en")), Some(&"Panandang"));

        let empty: IndexMap<LangCode, Option<&str>> = IndexMap::new();
        assert_eq!(translation(&empty, None), None);
    }
}

//! Post-merge derivation: display fields computed once every batch has settled.

use crate::data::{DateValue, ImageValue, Localized, Record, TitleText};
use crate::language::{preference_order, translation};
use crate::store::EntityStore;
use crate::utils::{alpha_sort_key, flatten_line_breaks};

/// Run every derivation step on every record.
pub fn finalize_store(store: &mut EntityStore) {
    for record in store.all_mut() {
        finalize_record(record);
    }
}

/// Run every derivation step on one record.
pub fn finalize_record(record: &mut Record) {
    derive_index_title(record);
    derive_languages(record);
    nullify_empty_vicinity(record);
}

/// Index title text for a title translation: `main`, then the subtitle joined
/// by a space when it opens with `(` and by `": "` otherwise.
pub fn index_title_text(title: &TitleText) -> String {
    let mut text = title.main.clone();
    if let Some(subtitle) = title.subtitle.as_deref().filter(|sub| !sub.is_empty()) {
        text.push_str(if subtitle.starts_with('(') { " " } else { ": " });
        text.push_str(subtitle);
    }
    flatten_line_breaks(&text)
}

/// Set the index title from the preferred title translation and refresh the
/// alphabetic sort key.
///
/// Records without any populated title keep their untitled substitute.
pub fn derive_index_title(record: &mut Record) {
    if let Localized::ByLanguage(map) = &record.title
        && let Some(title) =
            translation(map, None).or_else(|| map.values().flatten().next())
    {
        record.index_title = Some(index_title_text(title));
    }
    let key_source = record.index_title.as_deref().unwrap_or(&record.id);
    record.sort_keys.alpha = Some(alpha_sort_key(key_source));
}

fn has_language(record: &Record, code: &str) -> bool {
    record.title.has_language(code)
        || record.inscription.has_language(code)
        || record.date.has_language(code)
        || record.image.has_language(code)
}

/// Compute `languages` in preference order and give every per-language field
/// an entry for each of them.
///
/// Titles and inscriptions that are unset become per-language maps of nulls;
/// explicit no-value fields and non-localized date or image shapes are left
/// alone.
pub fn derive_languages(record: &mut Record) {
    let languages: Vec<String> = preference_order()
        .filter(|info| has_language(record, info.code))
        .map(|info| info.code.to_string())
        .collect();

    for code in &languages {
        record.title.set_null(code);
        record.inscription.set_null(code);
        if let DateValue::ByLanguage(map) = &mut record.date {
            map.entry(code.clone()).or_insert(None);
        }
        if let ImageValue::ByLanguage(map) = &mut record.image {
            map.entry(code.clone()).or_insert(None);
        }
    }
    record.languages = languages;
}

/// Drop vicinity data that carries neither a photo nor a description.
pub fn nullify_empty_vicinity(record: &mut Record) {
    if record.vicinity.as_ref().is_some_and(|vicinity| vicinity.is_empty()) {
        record.vicinity = None;
    }
}

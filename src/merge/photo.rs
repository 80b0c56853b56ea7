use crate::constants::merge::MAX_PHOTO_ORDINAL;
use crate::data::{ImageValue, LanguageMap, Record};
use crate::errors::AtlasError;
use crate::merge::{ENTITY_VAR, FacetMerger, entity_id, target_language};
use crate::query::{BatchKind, ResultRow};
use crate::types::{EntityId, Filename, LangCode};
use crate::utils::image_filename_from_url;

const IMAGE_VAR: &str = "image";
const ORDINAL_VAR: &str = "ordinal";
const VICINITY_IMAGE_VAR: &str = "vicinityImage";
const VICINITY_DESCRIPTION_VAR: &str = "vicinityDescription";

/// Decoded photo row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhotoRow {
    /// Marker photo for one language.
    Localized { lang: LangCode, filename: Filename },
    /// Marker photo at a zero-based position.
    Positional { slot: usize, filename: Filename },
    /// The single marker photo.
    Single { filename: Filename },
    /// Photo of the marker's surroundings.
    Vicinity {
        filename: Filename,
        description: Option<String>,
    },
}

/// Merges marker and vicinity photos. The first marker-photo shape to arrive
/// for a record wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhotoMerger;

impl FacetMerger for PhotoMerger {
    type Row = PhotoRow;

    fn batch(&self) -> BatchKind {
        BatchKind::Photo
    }

    fn decode(&self, row: &ResultRow) -> Result<(EntityId, PhotoRow), AtlasError> {
        let batch = self.batch();
        let id = entity_id(batch, row, ENTITY_VAR)?;

        if let Some(url) = row.text(VICINITY_IMAGE_VAR) {
            let decoded = PhotoRow::Vicinity {
                filename: image_filename_from_url(url),
                description: row.text(VICINITY_DESCRIPTION_VAR).map(str::to_string),
            };
            return Ok((id, decoded));
        }

        let Some(url) = row.text(IMAGE_VAR) else {
            return Err(AtlasError::malformed_row(
                batch.name(),
                format!("photo row for {id} carries no image"),
            ));
        };
        let filename = image_filename_from_url(url);

        if let Some(lang) = target_language(batch, row)? {
            return Ok((id, PhotoRow::Localized { lang, filename }));
        }
        if let Some(ordinal) = row.text(ORDINAL_VAR) {
            let slot = ordinal
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|ordinal| (1..=MAX_PHOTO_ORDINAL).contains(ordinal))
                .map(|ordinal| ordinal - 1)
                .ok_or_else(|| {
                    AtlasError::malformed_row(
                        batch.name(),
                        format!(
                            "photo ordinal '{ordinal}' for {id} is not between 1 and {MAX_PHOTO_ORDINAL}"
                        ),
                    )
                })?;
            return Ok((id, PhotoRow::Positional { slot, filename }));
        }
        Ok((id, PhotoRow::Single { filename }))
    }

    fn merge(&self, record: &mut Record, row: PhotoRow) -> bool {
        match row {
            PhotoRow::Vicinity {
                filename,
                description,
            } => {
                let vicinity = record.vicinity_mut();
                let mut changed = false;
                if vicinity.image_filename.is_none() {
                    vicinity.image_filename = Some(filename);
                    changed = true;
                }
                if vicinity.description.is_none()
                    && let Some(description) = description
                {
                    vicinity.description = Some(description);
                    changed = true;
                }
                changed
            }
            PhotoRow::Single { filename } => {
                if !matches!(record.image, ImageValue::Unset) {
                    return false;
                }
                record.image = ImageValue::Single(filename);
                true
            }
            PhotoRow::Positional { slot, filename } => {
                if matches!(record.image, ImageValue::Unset) {
                    record.image = ImageValue::Positional(Vec::new());
                }
                let ImageValue::Positional(list) = &mut record.image else {
                    return false;
                };
                if list.len() <= slot {
                    list.resize(slot + 1, None);
                }
                if list[slot].is_some() {
                    return false;
                }
                list[slot] = Some(filename);
                true
            }
            PhotoRow::Localized { lang, filename } => {
                if matches!(record.image, ImageValue::Unset) {
                    record.image = ImageValue::ByLanguage(LanguageMap::new());
                }
                let ImageValue::ByLanguage(map) = &mut record.image else {
                    return false;
                };
                match map.get_mut(&lang) {
                    Some(Some(_)) => false,
                    Some(slot) => {
                        *slot = Some(filename);
                        true
                    }
                    None => {
                        map.insert(lang, Some(filename));
                        true
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{TARGET_LANG_VAR, merge_rows};
    use crate::store::EntityStore;

    const FILE_PATH: &str = "http://commons.wikimedia.org/wiki/Special:FilePath/";

    fn photo(id: &str, file: &str) -> ResultRow {
        ResultRow::new()
            .entity(ENTITY_VAR, format!("http://www.wikidata.org/entity/{id}"))
            .entity(IMAGE_VAR, format!("{FILE_PATH}{file}"))
    }

    fn store_with(ids: &[&str]) -> EntityStore {
        let mut store = EntityStore::new();
        for id in ids {
            store.get_or_create(id);
        }
        store
    }

    #[test]
    fn ordinals_fill_positional_slots() {
        let mut store = store_with(&["Q1"]);
        let rows = vec![
            photo("Q1", "Second.jpg").literal(ORDINAL_VAR, "2"),
            photo("Q1", "First.jpg").literal(ORDINAL_VAR, "1"),
            photo("Q1", "Ignored.jpg"),
            photo("Q1", "Zero.jpg").literal(ORDINAL_VAR, "0"),
        ];
        let stats = merge_rows(&PhotoMerger, &mut store, &rows);

        assert_eq!(stats.malformed, 1);
        assert_eq!(
            store.get("Q1").unwrap().image,
            ImageValue::Positional(vec![Some("First.jpg".into()), Some("Second.jpg".into())])
        );
    }

    #[test]
    fn oversized_ordinals_are_malformed() {
        let mut store = store_with(&["Q1"]);
        let rows = vec![
            photo("Q1", "Huge.jpg").literal(ORDINAL_VAR, "18446744073709551615"),
            photo("Q1", "Far.jpg").literal(ORDINAL_VAR, "1000000000"),
            photo("Q1", "Past.jpg").literal(ORDINAL_VAR, (MAX_PHOTO_ORDINAL + 1).to_string()),
            photo("Q1", "Last.jpg").literal(ORDINAL_VAR, MAX_PHOTO_ORDINAL.to_string()),
        ];
        let stats = merge_rows(&PhotoMerger, &mut store, &rows);

        assert_eq!(stats.malformed, 3);
        let ImageValue::Positional(list) = &store.get("Q1").unwrap().image else {
            panic!("expected positional photos");
        };
        assert_eq!(list.len(), MAX_PHOTO_ORDINAL);
        assert_eq!(list.last().unwrap().as_deref(), Some("Last.jpg"));
    }

    #[test]
    fn language_qualified_photos_build_a_map() {
        let mut store = store_with(&["Q1"]);
        let rows = vec![
            photo("Q1", "Marker%20EN.jpg")
                .entity(TARGET_LANG_VAR, "http://www.wikidata.org/entity/Q1860"),
            photo("Q1", "Marker%20TL.jpg")
                .entity(TARGET_LANG_VAR, "http://www.wikidata.org/entity/Q34057"),
        ];
        merge_rows(&PhotoMerger, &mut store, &rows);

        let ImageValue::ByLanguage(map) = &store.get("Q1").unwrap().image else {
            panic!("expected per-language photos");
        };
        assert_eq!(map["en"].as_deref(), Some("Marker EN.jpg"));
        assert_eq!(map["tl"].as_deref(), Some("Marker TL.jpg"));
    }

    #[test]
    fn vicinity_rows_route_to_vicinity() {
        let mut store = store_with(&["Q1"]);
        let rows = vec![
            ResultRow::new()
                .entity(ENTITY_VAR, "http://www.wikidata.org/entity/Q1")
                .entity(VICINITY_IMAGE_VAR, format!("{FILE_PATH}Plaza.jpg"))
                .tagged(VICINITY_DESCRIPTION_VAR, "Plaza view", "en"),
            photo("Q1", "Marker.jpg"),
        ];
        merge_rows(&PhotoMerger, &mut store, &rows);

        let record = store.get("Q1").unwrap();
        let vicinity = record.vicinity.as_ref().unwrap();
        assert_eq!(vicinity.image_filename.as_deref(), Some("Plaza.jpg"));
        assert_eq!(vicinity.description.as_deref(), Some("Plaza view"));
        assert_eq!(record.image, ImageValue::Single("Marker.jpg".into()));
    }
}

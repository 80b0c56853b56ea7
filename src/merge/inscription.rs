use crate::data::Record;
use crate::errors::AtlasError;
use crate::merge::{ENTITY_VAR, FacetMerger, entity_id};
use crate::query::{BatchKind, ResultRow};
use crate::types::{EntityId, LangCode};
use crate::utils::format_inscription;

const INSCRIPTION_VAR: &str = "inscription";
const NO_VALUE_VAR: &str = "inscriptionNoValue";

/// Decoded inscription row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InscriptionRow {
    /// Raw inscription text in one language.
    Text { lang: LangCode, text: String },
    /// The marker explicitly has no inscription.
    NoValue,
}

/// Merges inscription text, paragraph-formatted per language.
#[derive(Clone, Copy, Debug, Default)]
pub struct InscriptionMerger;

impl FacetMerger for InscriptionMerger {
    type Row = InscriptionRow;

    fn batch(&self) -> BatchKind {
        BatchKind::Inscription
    }

    fn decode(&self, row: &ResultRow) -> Result<(EntityId, InscriptionRow), AtlasError> {
        let batch = self.batch();
        let id = entity_id(batch, row, ENTITY_VAR)?;
        if let Some(text) = row.text(INSCRIPTION_VAR) {
            let lang = row.lang(INSCRIPTION_VAR).ok_or_else(|| {
                AtlasError::malformed_row(
                    batch.name(),
                    format!("inscription for {id} has no language tag"),
                )
            })?;
            let decoded = InscriptionRow::Text {
                lang: lang.to_string(),
                text: text.to_string(),
            };
            return Ok((id, decoded));
        }
        if row.has(NO_VALUE_VAR) {
            return Ok((id, InscriptionRow::NoValue));
        }
        Err(AtlasError::malformed_row(
            batch.name(),
            format!("inscription row for {id} has neither text nor a no-value marker"),
        ))
    }

    fn merge(&self, record: &mut Record, row: InscriptionRow) -> bool {
        match row {
            InscriptionRow::Text { lang, text } => {
                record.inscription.set(&lang, format_inscription(&text))
            }
            InscriptionRow::NoValue => record.inscription.set_no_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Localized;
    use crate::merge::merge_rows;
    use crate::store::EntityStore;

    fn marker(id: &str) -> ResultRow {
        ResultRow::new().entity(ENTITY_VAR, format!("http://www.wikidata.org/entity/{id}"))
    }

    #[test]
    fn text_is_formatted_into_paragraphs_per_language() {
        let mut store = EntityStore::new();
        store.get_or_create("Q3");
        let rows = vec![
            marker("Q3").tagged(INSCRIPTION_VAR, "Dito isinilang<br><br>si Rizal.", "tl"),
            marker("Q3").tagged(INSCRIPTION_VAR, "Born here.", "en"),
        ];
        merge_rows(&InscriptionMerger, &mut store, &rows);

        let map = store.get("Q3").unwrap().inscription.as_map().unwrap();
        assert_eq!(
            map["tl"].as_deref(),
            Some("<p>Dito isinilang</p><p>si Rizal.</p>")
        );
        assert_eq!(map["en"].as_deref(), Some("<p>Born here.</p>"));
    }

    #[test]
    fn no_value_wins_over_text() {
        let mut store = EntityStore::new();
        store.get_or_create("Q3");
        let rows = vec![
            marker("Q3").tagged(INSCRIPTION_VAR, "Text", "en"),
            marker("Q3").entity(NO_VALUE_VAR, "http://www.wikidata.org/prop/novalue/P1684"),
            marker("Q3").tagged(INSCRIPTION_VAR, "Later", "tl"),
        ];
        merge_rows(&InscriptionMerger, &mut store, &rows);
        assert_eq!(store.get("Q3").unwrap().inscription, Localized::NoValue);
    }
}

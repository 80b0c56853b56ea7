use chrono::{DateTime, NaiveDate};

use crate::constants::ids::YEAR_PRECISION;
use crate::data::{DateValue, LanguageMap, Record};
use crate::errors::AtlasError;
use crate::merge::{ENTITY_VAR, FacetMerger, entity_id, required_text, target_language};
use crate::query::{BatchKind, ResultRow};
use crate::types::{EntityId, LangCode};

const DATE_VAR: &str = "date";
const PRECISION_VAR: &str = "datePrecision";
const DISPLAY_FORMAT: &str = "%B %-d, %Y";

/// Decoded date row: display text, optionally scoped to one language.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateRow {
    pub lang: Option<LangCode>,
    pub text: String,
}

/// Format a time value for display.
///
/// Year precision keeps the 4-character year prefix; anything finer renders
/// as `Month D, YYYY`. Returns `None` when the value cannot be parsed.
pub fn format_date(value: &str, precision: Option<&str>) -> Option<String> {
    if precision == Some(YEAR_PRECISION) {
        return value.get(..4).map(str::to_string);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.format(DISPLAY_FORMAT).to_string());
    }
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()
        .map(|parsed| parsed.format(DISPLAY_FORMAT).to_string())
}

/// Merges unveiling dates. The first shape to arrive for a record wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct DateMerger;

impl FacetMerger for DateMerger {
    type Row = DateRow;

    fn batch(&self) -> BatchKind {
        BatchKind::Date
    }

    fn decode(&self, row: &ResultRow) -> Result<(EntityId, DateRow), AtlasError> {
        let batch = self.batch();
        let id = entity_id(batch, row, ENTITY_VAR)?;
        let value = required_text(batch, row, DATE_VAR)?;
        let text = format_date(&value, row.text(PRECISION_VAR)).ok_or_else(|| {
            AtlasError::malformed_row(
                batch.name(),
                format!("date '{value}' for {id} is not a valid time value"),
            )
        })?;
        let lang = target_language(batch, row)?;
        Ok((id, DateRow { lang, text }))
    }

    fn merge(&self, record: &mut Record, row: DateRow) -> bool {
        let DateRow { lang, text } = row;
        let Some(code) = lang else {
            if !matches!(record.date, DateValue::Unset) {
                return false;
            }
            record.date = DateValue::Single(text);
            return true;
        };
        if matches!(record.date, DateValue::Unset) {
            record.date = DateValue::ByLanguage(LanguageMap::new());
        }
        let DateValue::ByLanguage(map) = &mut record.date else {
            return false;
        };
        match map.get_mut(&code) {
            Some(Some(_)) => false,
            Some(slot) => {
                *slot = Some(text);
                true
            }
            None => {
                map.insert(code, Some(text));
                true
            }
        }
    }
}

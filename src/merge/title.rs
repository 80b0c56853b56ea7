use tracing::debug;

use crate::data::{Record, TitleText};
use crate::errors::AtlasError;
use crate::merge::{ENTITY_VAR, FacetMerger, entity_id, target_language};
use crate::query::{BatchKind, ResultRow};
use crate::types::{EntityId, LangCode};
use crate::utils::untitled_substitute;

const LABEL_VAR: &str = "markerLabel";
const TITLE_VAR: &str = "title";
const SUBTITLE_VAR: &str = "subtitle";
const NO_VALUE_VAR: &str = "titleNoValue";

/// Decoded title row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TitleRow {
    /// A title (and optional subtitle) in one language.
    Titled {
        lang: LangCode,
        main: String,
        subtitle: Option<String>,
    },
    /// Explicit no-value, for one language or for the whole entity.
    NoValue {
        lang: Option<LangCode>,
        label: Option<String>,
    },
    /// Explicit no-value scoped to a language outside the table. Only the
    /// untitled substitute is kept.
    UnlistedNoValue { label: Option<String> },
}

/// Merges titles and derives untitled substitutes.
#[derive(Clone, Copy, Debug, Default)]
pub struct TitleMerger;

impl FacetMerger for TitleMerger {
    type Row = TitleRow;

    fn batch(&self) -> BatchKind {
        BatchKind::Title
    }

    fn decode(&self, row: &ResultRow) -> Result<(EntityId, TitleRow), AtlasError> {
        let batch = self.batch();
        let id = entity_id(batch, row, ENTITY_VAR)?;
        // An unlisted qualifier does not void the row: titles fall back to
        // the literal's own tag.
        let (target, unlisted) = match target_language(batch, row) {
            Ok(target) => (target, false),
            Err(err) => {
                debug!(batch = %batch, entity = %id, error = %err, "ignoring title language qualifier");
                (None, true)
            }
        };

        if let Some(main) = row.text(TITLE_VAR) {
            let lang = target
                .or_else(|| row.lang(TITLE_VAR).map(str::to_string))
                .ok_or_else(|| {
                    AtlasError::malformed_row(
                        batch.name(),
                        format!("title for {id} has no language"),
                    )
                })?;
            let decoded = TitleRow::Titled {
                lang,
                main: main.to_string(),
                subtitle: row.text(SUBTITLE_VAR).map(str::to_string),
            };
            return Ok((id, decoded));
        }

        if row.has(NO_VALUE_VAR) {
            let label = row.text(LABEL_VAR).map(str::to_string);
            let decoded = if unlisted {
                TitleRow::UnlistedNoValue { label }
            } else {
                TitleRow::NoValue {
                    lang: target,
                    label,
                }
            };
            return Ok((id, decoded));
        }

        Err(AtlasError::malformed_row(
            batch.name(),
            format!("title row for {id} has neither a title nor a no-value marker"),
        ))
    }

    fn merge(&self, record: &mut Record, row: TitleRow) -> bool {
        match row {
            TitleRow::Titled {
                lang,
                main,
                subtitle,
            } => record.title.set(&lang, TitleText { main, subtitle }),
            TitleRow::NoValue { lang, label } => {
                let changed = match lang {
                    Some(code) => record.title.set_null(&code),
                    None => record.title.set_no_value(),
                };
                set_substitute(record, label.as_deref()) || changed
            }
            TitleRow::UnlistedNoValue { label } => set_substitute(record, label.as_deref()),
        }
    }
}

fn set_substitute(record: &mut Record, label: Option<&str>) -> bool {
    let substitute = untitled_substitute(label.unwrap_or(&record.id));
    if record.index_title.as_deref() == Some(substitute.as_str()) {
        return false;
    }
    record.index_title = Some(substitute);
    true
}

//! Facet mergers: decode one batch's rows and fold them into existing records.
//!
//! Every merger follows the same two-step contract:
//! - `decode` turns a raw [`ResultRow`] into the facet's own typed row, or a
//!   [`AtlasError::MalformedRow`] that the caller logs and counts.
//! - `merge` applies a decoded row to one record and reports whether the
//!   record changed. Only the identity merger may create records.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::AddressPolicy;
use crate::data::Record;
use crate::errors::AtlasError;
use crate::language::code_for_item;
use crate::query::{BatchKind, ResultRow};
use crate::store::EntityStore;
use crate::types::{EntityId, LangCode};

/// Subject commemorated by a marker.
pub mod commemoration;
/// Unveiling date.
pub mod date;
/// Coordinate samples; the only merger that creates records.
pub mod identity;
/// Inscription text.
pub mod inscription;
/// Address, place photo, and directions.
pub mod location;
/// Marker and vicinity photos.
pub mod photo;
/// Title, subtitle, and untitled substitutes.
pub mod title;

pub use commemoration::CommemorationMerger;
pub use date::DateMerger;
pub use identity::IdentityMerger;
pub use inscription::InscriptionMerger;
pub use location::LocationMerger;
pub use photo::PhotoMerger;
pub use title::TitleMerger;

/// Output variable naming the entity every row belongs to.
pub const ENTITY_VAR: &str = "marker";
/// Output variable carrying a target-language qualifier.
pub const TARGET_LANG_VAR: &str = "targetLang";

/// Folds one facet's rows into records.
pub trait FacetMerger {
    /// Decoded row shape for this facet.
    type Row;

    /// Batch this merger consumes.
    fn batch(&self) -> BatchKind;

    /// Whether rows for unknown ids create records.
    fn creates_records(&self) -> bool {
        false
    }

    /// Decode a raw row into its owning entity id and typed row.
    fn decode(&self, row: &ResultRow) -> Result<(EntityId, Self::Row), AtlasError>;

    /// Apply a decoded row; returns `true` when the record changed.
    fn merge(&self, record: &mut Record, row: Self::Row) -> bool;
}

/// Row accounting for one merged batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Rows received.
    pub rows: usize,
    /// Rows that reached a record.
    pub applied: usize,
    /// Rows that changed a record.
    pub changed: usize,
    /// Rows skipped because they could not be decoded.
    pub malformed: usize,
    /// Rows skipped because their id is not in the store.
    pub unknown_entities: usize,
}

/// Decode and merge `rows` with `merger`, skipping malformed rows and rows
/// for ids the store does not know.
pub fn merge_rows<M: FacetMerger>(
    merger: &M,
    store: &mut EntityStore,
    rows: &[ResultRow],
) -> MergeStats {
    let batch = merger.batch();
    let mut stats = MergeStats {
        rows: rows.len(),
        ..MergeStats::default()
    };
    for row in rows {
        let (id, decoded) = match merger.decode(row) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(batch = %batch, error = %err, "skipping malformed row");
                stats.malformed += 1;
                continue;
            }
        };
        let record = if merger.creates_records() {
            Some(store.get_or_create(&id))
        } else {
            store.get_mut(&id)
        };
        let Some(record) = record else {
            debug!(batch = %batch, entity = %id, "skipping row for unknown entity");
            stats.unknown_entities += 1;
            continue;
        };
        stats.applied += 1;
        if merger.merge(record, decoded) {
            stats.changed += 1;
        }
    }
    stats
}

/// Merge a whole batch with the merger registered for `batch`.
pub fn merge_batch(
    batch: BatchKind,
    store: &mut EntityStore,
    rows: &[ResultRow],
    policy: &AddressPolicy,
) -> MergeStats {
    match batch {
        BatchKind::Identity => merge_rows(&IdentityMerger, store, rows),
        BatchKind::Title => merge_rows(&TitleMerger, store, rows),
        BatchKind::Location => merge_rows(&LocationMerger::new(policy), store, rows),
        BatchKind::Inscription => merge_rows(&InscriptionMerger, store, rows),
        BatchKind::Date => merge_rows(&DateMerger, store, rows),
        BatchKind::Photo => merge_rows(&PhotoMerger, store, rows),
        BatchKind::Commemoration => merge_rows(&CommemorationMerger, store, rows),
    }
}

/// Outcome of one batch as seen by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchReport {
    /// Batch this report covers.
    pub batch: BatchKind,
    /// Row accounting; all zero when the query failed.
    pub stats: MergeStats,
    /// Wall time from dispatch to response.
    pub elapsed: Duration,
    /// Query failure, when the batch did not produce rows.
    pub error: Option<String>,
}

impl BatchReport {
    /// Returns `true` when the query succeeded.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub(crate) fn entity_id(
    batch: BatchKind,
    row: &ResultRow,
    var: &str,
) -> Result<EntityId, AtlasError> {
    row.entity_id(var)
        .map(str::to_string)
        .ok_or_else(|| AtlasError::malformed_row(batch.name(), format!("missing ?{var}")))
}

pub(crate) fn required_text(
    batch: BatchKind,
    row: &ResultRow,
    var: &str,
) -> Result<String, AtlasError> {
    row.text(var)
        .map(str::to_string)
        .ok_or_else(|| AtlasError::malformed_row(batch.name(), format!("missing ?{var}")))
}

/// Language code of the row's target-language qualifier.
///
/// A qualifier naming a language outside the table makes the row malformed.
pub(crate) fn target_language(
    batch: BatchKind,
    row: &ResultRow,
) -> Result<Option<LangCode>, AtlasError> {
    let Some(item_id) = row.entity_id(TARGET_LANG_VAR) else {
        return Ok(None);
    };
    code_for_item(item_id).map(Some).ok_or_else(|| {
        AtlasError::malformed_row(
            batch.name(),
            format!("target language {item_id} is not in the language table"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: &str) -> ResultRow {
        ResultRow::new().entity(ENTITY_VAR, format!("http://www.wikidata.org/entity/{id}"))
    }

    #[test]
    fn dependent_batches_never_create_records() {
        let mut store = EntityStore::new();
        store.get_or_create("Q1");
        let rows = vec![
            marker("Q1").tagged("inscription", "Text", "en"),
            marker("Q2").tagged("inscription", "Ghost", "en"),
            marker("Q1"),
        ];

        let stats = merge_batch(
            BatchKind::Inscription,
            &mut store,
            &rows,
            &AddressPolicy::default(),
        );

        assert_eq!(stats.rows, 3);
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.changed, 1);
        assert_eq!(stats.unknown_entities, 1);
        assert_eq!(stats.malformed, 1);
        assert!(store.get("Q2").is_none());
    }

    #[test]
    fn unmapped_target_language_is_malformed() {
        let row = marker("Q1").entity(TARGET_LANG_VAR, "http://www.wikidata.org/entity/Q7850");
        assert!(matches!(
            target_language(BatchKind::Date, &row),
            Err(AtlasError::MalformedRow { .. })
        ));
        let row = marker("Q1").entity(TARGET_LANG_VAR, "http://www.wikidata.org/entity/Q34057");
        assert_eq!(
            target_language(BatchKind::Date, &row).unwrap().as_deref(),
            Some("tl")
        );
    }
}

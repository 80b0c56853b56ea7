use crate::data::{GeoPoint, Record};
use crate::errors::AtlasError;
use crate::merge::{ENTITY_VAR, FacetMerger, entity_id, required_text};
use crate::query::{BatchKind, ResultRow};
use crate::types::EntityId;
use crate::utils::parse_point_literal;

const COORD_VAR: &str = "coord";

/// Appends coordinate samples, creating records on first sight.
///
/// Collapsing samples to a single point is a store-wide step that runs once
/// after this batch (see [`crate::store::EntityStore::collapse_coordinates`]).
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityMerger;

impl FacetMerger for IdentityMerger {
    type Row = GeoPoint;

    fn batch(&self) -> BatchKind {
        BatchKind::Identity
    }

    fn creates_records(&self) -> bool {
        true
    }

    fn decode(&self, row: &ResultRow) -> Result<(EntityId, GeoPoint), AtlasError> {
        let id = entity_id(self.batch(), row, ENTITY_VAR)?;
        let literal = required_text(self.batch(), row, COORD_VAR)?;
        let point = parse_point_literal(&literal).ok_or_else(|| {
            AtlasError::malformed_row(
                self.batch().name(),
                format!("coordinate literal '{literal}' for {id} is not a point"),
            )
        })?;
        Ok((id, point))
    }

    fn merge(&self, record: &mut Record, point: GeoPoint) -> bool {
        record.coordinates.push_sample(point)
    }
}

use indexmap::IndexMap;

use crate::data::{Commemoration, Record};
use crate::errors::AtlasError;
use crate::merge::{ENTITY_VAR, FacetMerger, entity_id};
use crate::query::{BatchKind, ResultRow};
use crate::types::EntityId;

const SUBJECT_VAR: &str = "commemorates";
const SUBJECT_LABEL_VAR: &str = "commemoratesLabel";
const SUBJECT_ARTICLE_VAR: &str = "commemoratesArticle";

/// Decoded commemoration row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommemorationRow {
    pub subject: EntityId,
    pub entry: Commemoration,
}

/// Accumulates commemorated subjects per record.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommemorationMerger;

impl FacetMerger for CommemorationMerger {
    type Row = CommemorationRow;

    fn batch(&self) -> BatchKind {
        BatchKind::Commemoration
    }

    fn decode(&self, row: &ResultRow) -> Result<(EntityId, CommemorationRow), AtlasError> {
        let id = entity_id(self.batch(), row, ENTITY_VAR)?;
        let subject = entity_id(self.batch(), row, SUBJECT_VAR)?;
        let title = row
            .text(SUBJECT_LABEL_VAR)
            .map(str::to_string)
            .unwrap_or_else(|| subject.clone());
        let entry = Commemoration {
            title,
            article_url: row.text(SUBJECT_ARTICLE_VAR).map(str::to_string),
        };
        Ok((id, CommemorationRow { subject, entry }))
    }

    fn merge(&self, record: &mut Record, row: CommemorationRow) -> bool {
        let subjects = record.commemorates.get_or_insert_with(IndexMap::new);
        if subjects.contains_key(&row.subject) {
            return false;
        }
        subjects.insert(row.subject, row.entry);
        true
    }
}

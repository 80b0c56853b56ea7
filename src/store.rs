use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::constants::query::{ENTITY_PREFIX, FILTER_VARIABLE};
use crate::data::Record;
use crate::errors::AtlasError;
use crate::types::EntityId;
use crate::utils::numeric_id_key;

/// Index ordering for [`EntityStore::sorted_ids`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortMode {
    /// By alphabetic sort key, ties broken by id.
    #[default]
    Alpha,
    /// By the digits of the entity id.
    Numeric,
}

/// `VALUES` clause restricting dependent queries to the store's ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterClause(String);

impl FilterClause {
    /// Build a clause from ids; duplicates collapse and order is normalized.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sorted: BTreeSet<(Option<u64>, String)> = ids
            .into_iter()
            .map(|id| {
                let id = id.as_ref();
                (numeric_id_key(id), id.to_string())
            })
            .collect();
        let values = sorted
            .iter()
            .map(|(_, id)| format!("{ENTITY_PREFIX}{id}"))
            .collect::<Vec<_>>()
            .join(" ");
        Self(format!("VALUES {FILTER_VARIABLE} {{ {values} }}"))
    }

    /// Clause text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Id → record map for one aggregation run, in identity-batch arrival order.
#[derive(Clone, Debug, Default)]
pub struct EntityStore {
    records: IndexMap<EntityId, Record>,
    collapsed: bool,
}

impl EntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `id`, creating an empty one when absent.
    pub fn get_or_create(&mut self, id: &str) -> &mut Record {
        self.records
            .entry(id.to_string())
            .or_insert_with(|| Record::new(id))
    }

    /// Record for `id`; never creates.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    /// Mutable record for `id`; never creates.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Record> {
        self.records.get_mut(id)
    }

    /// Returns `true` when `id` has a record.
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// All records in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// All records, mutably, in insertion order.
    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.values_mut()
    }

    /// All ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.records.keys()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when no record exists.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Collapse every record's coordinate samples to their mean and assign
    /// numeric sort keys. Only the first call has any effect; returns the
    /// number of records collapsed.
    pub fn collapse_coordinates(&mut self) -> usize {
        if self.collapsed {
            return 0;
        }
        let mut collapsed = 0;
        for record in self.records.values_mut() {
            if record.coordinates.collapse().is_some() {
                collapsed += 1;
            }
            record.sort_keys.numeric = numeric_id_key(&record.id);
        }
        self.collapsed = true;
        debug!(records = collapsed, "collapsed coordinate samples");
        collapsed
    }

    /// Build the filter clause over every id in the store.
    ///
    /// Fails until coordinates are collapsed, so dependent batches never run
    /// against a half-built identity set.
    pub fn build_filter_clause(&self) -> Result<FilterClause, AtlasError> {
        if !self.collapsed {
            return Err(AtlasError::InvalidState(
                "filter clause requested before coordinates were collapsed".into(),
            ));
        }
        Ok(FilterClause::from_ids(self.records.keys()))
    }

    /// Ids ordered for the index list.
    pub fn sorted_ids(&self, mode: SortMode) -> Vec<EntityId> {
        let mut records: Vec<&Record> = self.records.values().collect();
        match mode {
            SortMode::Alpha => records.sort_by(|a, b| {
                a.sort_keys
                    .alpha
                    .cmp(&b.sort_keys.alpha)
                    .then_with(|| a.id.cmp(&b.id))
            }),
            SortMode::Numeric => records.sort_by(|a, b| {
                numeric_id_key(&a.id)
                    .cmp(&numeric_id_key(&b.id))
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }
        records.into_iter().map(|record| record.id.clone()).collect()
    }
}

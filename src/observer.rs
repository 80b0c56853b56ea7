use crate::data::Record;
use crate::merge::BatchReport;
use crate::store::EntityStore;

/// Receives pipeline progress on the thread that owns the store.
///
/// Every method has a no-op default so presenters implement only what they
/// render.
pub trait AtlasObserver {
    /// A batch finished merging (or failed).
    fn on_batch_settled(&mut self, _report: &BatchReport) {}

    /// All batches settled and derivation ran; fired once per run.
    fn on_ready(&mut self, _store: &EntityStore) {}

    /// A record changed after `on_ready` (inscription enrichment).
    fn on_record_updated(&mut self, _record: &Record) {}
}

/// Observer that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl AtlasObserver for NoopObserver {}

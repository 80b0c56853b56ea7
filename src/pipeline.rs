//! Batch orchestration: identity first, then the dependent batches in
//! parallel, then derivation, readiness, and optional enrichment.
//!
//! Only the pipeline thread touches the store. Dependent batches execute on
//! scoped worker threads and hand their rows back over a channel, so each
//! batch merges to completion before the next one starts, in arrival order.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{AddressPolicy, AtlasConfig};
use crate::derive::finalize_store;
use crate::enrichment::{EnrichmentReport, TalkPageClient, enrich_store};
use crate::errors::AtlasError;
use crate::merge::{BatchReport, MergeStats, merge_batch};
use crate::observer::{AtlasObserver, NoopObserver};
use crate::query::{BatchKind, HttpQueryClient, HttpTalkPageClient, QueryClient, ResultRow};
use crate::store::{EntityStore, FilterClause};

/// Pipeline lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Identity,
    FilterClauseReady,
    ParallelBatches,
    AllBatchesResolved,
    PostMergeDerivation,
    Ready,
}

impl PipelineState {
    /// States reachable from `self` in one step.
    pub fn successors(self) -> &'static [PipelineState] {
        match self {
            Self::Idle => &[Self::Identity],
            // An empty identity batch skips straight to resolution.
            Self::Identity => &[Self::FilterClauseReady, Self::AllBatchesResolved],
            Self::FilterClauseReady => &[Self::ParallelBatches],
            Self::ParallelBatches => &[Self::AllBatchesResolved],
            Self::AllBatchesResolved => &[Self::PostMergeDerivation],
            Self::PostMergeDerivation => &[Self::Ready],
            Self::Ready => &[],
        }
    }
}

/// Everything a run observed, in order.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// States visited, starting with `Idle`.
    pub states: Vec<PipelineState>,
    /// One report per batch, identity first, then in arrival order.
    pub batches: Vec<BatchReport>,
    /// Present when enrichment ran.
    pub enrichment: Option<EnrichmentReport>,
    /// Wall time until `Ready`.
    pub elapsed: Duration,
}

impl RunReport {
    /// Report for `batch`, if it ran.
    pub fn batch(&self, batch: BatchKind) -> Option<&BatchReport> {
        self.batches.iter().find(|report| report.batch == batch)
    }

    /// Batches whose query failed.
    pub fn failed_batches(&self) -> Vec<BatchKind> {
        self.batches
            .iter()
            .filter(|report| !report.succeeded())
            .map(|report| report.batch)
            .collect()
    }
}

/// Result of a finished run: the populated store and the run report.
#[derive(Debug)]
pub struct Atlas {
    pub store: EntityStore,
    pub report: RunReport,
}

/// One aggregation run. Consumed by [`Pipeline::run`], so it cannot be re-entered.
pub struct Pipeline {
    config: AtlasConfig,
    client: Arc<dyn QueryClient>,
    talk_pages: Option<Arc<dyn TalkPageClient>>,
    state: PipelineState,
    store: EntityStore,
    report: RunReport,
}

impl Pipeline {
    /// Create a pipeline that queries through `client`. Enrichment is off
    /// until a discussion-page client is attached.
    pub fn new(config: AtlasConfig, client: Arc<dyn QueryClient>) -> Self {
        Self {
            config,
            client,
            talk_pages: None,
            state: PipelineState::Idle,
            store: EntityStore::new(),
            report: RunReport {
                states: vec![PipelineState::Idle],
                ..RunReport::default()
            },
        }
    }

    /// Create a pipeline with HTTP clients for the configured endpoints.
    pub fn from_config(config: AtlasConfig) -> Result<Self, AtlasError> {
        if config.query_endpoint.trim().is_empty() {
            return Err(AtlasError::Configuration(
                "query endpoint must not be empty".into(),
            ));
        }
        let client = Arc::new(HttpQueryClient::new(
            config.query_endpoint.clone(),
            config.user_agent.clone(),
        ));
        debug!(endpoint = client.endpoint(), "query client configured");
        let talk_pages = if config.enrich_inscriptions {
            if config.talk_page_endpoint.trim().is_empty() {
                return Err(AtlasError::Configuration(
                    "discussion page endpoint must not be empty when enrichment is enabled".into(),
                ));
            }
            Some(Arc::new(HttpTalkPageClient::new(
                config.talk_page_endpoint.clone(),
                config.user_agent.clone(),
            )) as Arc<dyn TalkPageClient>)
        } else {
            None
        };
        let mut pipeline = Self::new(config, client);
        pipeline.talk_pages = talk_pages;
        Ok(pipeline)
    }

    /// Attach a discussion-page client; enrichment runs after `Ready` when
    /// the config enables it.
    pub fn with_talk_pages(mut self, client: Arc<dyn TalkPageClient>) -> Self {
        self.talk_pages = Some(client);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run to completion without an observer.
    pub fn run(self) -> Atlas {
        self.run_with_observer(&mut NoopObserver)
    }

    /// Run to completion, notifying `observer` as batches settle, once at
    /// `Ready`, and for each record enrichment updates.
    pub fn run_with_observer(mut self, observer: &mut dyn AtlasObserver) -> Atlas {
        let started = Instant::now();
        info!("[markers:pipeline] starting aggregation run");

        self.transition(PipelineState::Identity);
        let identity = self.run_identity();
        observer.on_batch_settled(&identity);
        self.report.batches.push(identity);

        if self.store.is_empty() {
            warn!("[markers:pipeline] identity batch produced no entities; skipping dependent batches");
        } else {
            match self.store.build_filter_clause() {
                Ok(clause) => {
                    self.transition(PipelineState::FilterClauseReady);
                    self.transition(PipelineState::ParallelBatches);
                    self.run_dependent_batches(&clause, observer);
                }
                Err(err) => {
                    warn!(error = %err, "[markers:pipeline] cannot build filter clause; skipping dependent batches");
                }
            }
        }
        self.transition(PipelineState::AllBatchesResolved);

        self.transition(PipelineState::PostMergeDerivation);
        finalize_store(&mut self.store);

        self.transition(PipelineState::Ready);
        self.report.elapsed = started.elapsed();
        info!(
            "[markers:pipeline] ready with {} records in {:.2}s ({} failed batches)",
            self.store.len(),
            self.report.elapsed.as_secs_f64(),
            self.report.failed_batches().len()
        );
        observer.on_ready(&self.store);

        if self.config.enrich_inscriptions
            && let Some(talk_pages) = &self.talk_pages
        {
            let enrichment = enrich_store(
                &mut self.store,
                talk_pages.as_ref(),
                observer,
                self.config.enrichment_workers,
            );
            self.report.enrichment = Some(enrichment);
        }

        Atlas {
            store: self.store,
            report: self.report,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.successors().contains(&next),
            "invalid pipeline transition {:?} -> {next:?}",
            self.state
        );
        debug!(from = ?self.state, to = ?next, "pipeline transition");
        self.state = next;
        self.report.states.push(next);
    }

    fn run_identity(&mut self) -> BatchReport {
        let batch = BatchKind::Identity;
        let started = Instant::now();
        let result = batch
            .render(None)
            .and_then(|query| self.client.execute(&query));
        let report = settle_batch(
            &mut self.store,
            &self.config.address,
            batch,
            result,
            started.elapsed(),
        );
        let collapsed = self.store.collapse_coordinates();
        info!(
            "[markers:pipeline] identity batch created {} records ({} with coordinates)",
            self.store.len(),
            collapsed
        );
        report
    }

    fn run_dependent_batches(&mut self, clause: &FilterClause, observer: &mut dyn AtlasObserver) {
        let client = self.client.as_ref();
        let store = &mut self.store;
        let policy = &self.config.address;
        let reports = &mut self.report.batches;

        let (sender, receiver) = mpsc::channel();
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(BatchKind::DEPENDENT.len());
            for batch in BatchKind::DEPENDENT {
                let sender = sender.clone();
                let query = batch.render(Some(clause));
                handles.push((
                    batch,
                    scope.spawn(move || {
                        let started = Instant::now();
                        let result = query.and_then(|query| client.execute(&query));
                        let _ = sender.send((batch, result, started.elapsed()));
                    }),
                ));
            }
            drop(sender);

            let mut settled = Vec::with_capacity(handles.len());
            for (batch, result, elapsed) in receiver {
                let report = settle_batch(store, policy, batch, result, elapsed);
                observer.on_batch_settled(&report);
                reports.push(report);
                settled.push(batch);
            }

            for (batch, handle) in handles {
                if handle.join().is_ok() || settled.contains(&batch) {
                    continue;
                }
                let report = settle_batch(
                    store,
                    policy,
                    batch,
                    Err(AtlasError::QueryTransport {
                        batch: batch.name().to_string(),
                        reason: "batch thread panicked".into(),
                    }),
                    Duration::ZERO,
                );
                observer.on_batch_settled(&report);
                reports.push(report);
            }
        });
    }
}

fn settle_batch(
    store: &mut EntityStore,
    policy: &AddressPolicy,
    batch: BatchKind,
    result: Result<Vec<ResultRow>, AtlasError>,
    elapsed: Duration,
) -> BatchReport {
    match result {
        Ok(rows) => {
            let stats = merge_batch(batch, store, &rows, policy);
            debug!(
                batch = %batch,
                rows = stats.rows,
                applied = stats.applied,
                changed = stats.changed,
                malformed = stats.malformed,
                unknown_entities = stats.unknown_entities,
                elapsed_ms = elapsed.as_millis(),
                "batch merged"
            );
            info!(
                "[markers:pipeline] batch '{}' merged {} of {} rows",
                batch, stats.applied, stats.rows
            );
            BatchReport {
                batch,
                stats,
                elapsed,
                error: None,
            }
        }
        Err(err) => {
            warn!(batch = %batch, error = %err, "batch failed; its facet stays unset");
            BatchReport {
                batch,
                stats: MergeStats::default(),
                elapsed,
                error: Some(err.to_string()),
            }
        }
    }
}

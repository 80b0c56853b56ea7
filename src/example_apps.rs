use std::error::Error;

use crate::config::AtlasConfig;
use crate::data::Record;
use crate::language::by_code;
use crate::merge::BatchReport;
use crate::metrics::facet_coverage;
use crate::observer::AtlasObserver;
use crate::pipeline::Pipeline;
use crate::store::{EntityStore, SortMode};

const PREVIEW_RECORDS: usize = 3;

/// Prints batch progress and enrichment updates as they happen.
#[derive(Default)]
struct ConsoleObserver {
    updated: usize,
}

impl AtlasObserver for ConsoleObserver {
    fn on_batch_settled(&mut self, report: &BatchReport) {
        match &report.error {
            None => println!(
                "  batch {:<14} {:>6} rows  {:>6} merged  {:>4} skipped  {:>6} ms",
                report.batch.name(),
                report.stats.rows,
                report.stats.applied,
                report.stats.malformed + report.stats.unknown_entities,
                report.elapsed.as_millis()
            ),
            Some(error) => println!("  batch {:<14} FAILED: {error}", report.batch.name()),
        }
    }

    fn on_ready(&mut self, store: &EntityStore) {
        println!("ready: {} records", store.len());
    }

    fn on_record_updated(&mut self, _record: &Record) {
        self.updated += 1;
    }
}

/// Run the live aggregation with default settings and print a coverage
/// summary followed by the first records as JSON.
pub fn run_marker_report() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let config = AtlasConfig::default();
    println!("=== historical markers report ===");
    println!("endpoint: {}", config.query_endpoint);
    println!();
    println!("[BATCHES]");

    let mut observer = ConsoleObserver::default();
    let atlas = Pipeline::from_config(config)?.run_with_observer(&mut observer);
    println!();

    let coverage = facet_coverage(&atlas.store);
    println!("[COVERAGE]");
    println!("  records:        {}", coverage.records);
    println!("  titled:         {}", coverage.titled);
    println!("  untitled:       {}", coverage.untitled);
    println!("  inscriptions:   {}", coverage.with_inscription);
    println!("  no inscription: {}", coverage.without_inscription);
    println!("  dates:          {}", coverage.with_date);
    println!("  photos:         {}", coverage.with_image);
    println!("  addresses:      {}", coverage.with_address);
    println!("  vicinity:       {}", coverage.with_vicinity);
    println!("  commemorations: {}", coverage.with_commemorations);
    println!();

    println!("[LANGUAGES]");
    for share in &coverage.per_language {
        let name = by_code(&share.code).map_or(share.code.as_str(), |info| info.name);
        println!(
            "  {:<4} {:<12} {:>6} records ({:.1}%)",
            share.code,
            name,
            share.count,
            share.share * 100.0
        );
    }
    println!();

    if let Some(enrichment) = atlas.report.enrichment {
        println!("[ENRICHMENT]");
        println!("  candidates:     {}", enrichment.candidates);
        println!("  pages found:    {}", enrichment.pages_found);
        println!("  enriched:       {}", observer.updated);
        println!("  failures:       {}", enrichment.failures);
        println!();
    }

    println!("[FIRST RECORDS]");
    for id in atlas
        .store
        .sorted_ids(SortMode::Alpha)
        .iter()
        .take(PREVIEW_RECORDS)
    {
        if let Some(record) = atlas.store.get(id) {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
    }
    Ok(())
}

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Endpoint and address-policy configuration.
pub mod config;
/// Centralized constants used across queries, mergers, and enrichment.
pub mod constants;
/// Record model and per-facet value types.
pub mod data;
/// Post-merge derivation of display fields.
pub mod derive;
/// Discussion-page inscription enrichment.
pub mod enrichment;
/// Reusable example runners shared by downstream crates.
pub mod example_apps;
/// Language table and translation selection.
pub mod language;
/// Per-facet row decoding and merging.
pub mod merge;
/// Aggregate coverage metrics.
pub mod metrics;
/// Presenter notification hooks.
pub mod observer;
/// Batch orchestration and run reporting.
pub mod pipeline;
/// Query clients, result rows, and batch query texts.
pub mod query;
/// Entity store and filter clause.
pub mod store;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;

mod errors;

pub use config::{AddressPolicy, AtlasConfig};
pub use data::{
    Commemoration, Coordinates, DateValue, GeoPoint, ImageValue, Localized, Location, Record,
    SortKeys, TitleText, Vicinity,
};
pub use enrichment::{EnrichmentReport, TalkPageClient};
pub use errors::AtlasError;
pub use merge::{BatchReport, FacetMerger, MergeStats};
pub use observer::{AtlasObserver, NoopObserver};
pub use pipeline::{Atlas, Pipeline, PipelineState, RunReport};
pub use query::{
    BatchKind, HttpQueryClient, HttpTalkPageClient, QueryClient, ResultRow, RowValue,
    ScriptedQueryClient,
};
pub use store::{EntityStore, FilterClause, SortMode};
pub use types::{EntityId, Filename, LangCode};

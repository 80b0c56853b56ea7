use thiserror::Error;

use crate::types::EntityId;

/// Error type for query, decoding, and enrichment failures.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("batch '{batch}' query failed with HTTP status {status}")]
    QueryStatus { batch: String, status: u16 },
    #[error("batch '{batch}' query transport failed: {reason}")]
    QueryTransport { batch: String, reason: String },
    #[error("batch '{batch}' returned a malformed response: {details}")]
    MalformedResponse { batch: String, details: String },
    #[error("batch '{batch}' row is malformed: {details}")]
    MalformedRow { batch: String, details: String },
    #[error("invalid pipeline state: {0}")]
    InvalidState(String),
    #[error("inscription enrichment for '{entity}' failed: {reason}")]
    Enrichment { entity: EntityId, reason: String },
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AtlasError {
    /// Build a malformed-row error for `batch`.
    pub fn malformed_row(batch: impl Into<String>, details: impl Into<String>) -> Self {
        Self::MalformedRow {
            batch: batch.into(),
            details: details.into(),
        }
    }
}

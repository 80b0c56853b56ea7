//! Query client interface, result rows, and a scripted client.
//!
//! Ownership model:
//! - `QueryClient` executes one query text and returns flat rows; it never
//!   retries and never touches the entity store.
//! - `ResultRow` is the decoded tabular row: output variable → typed value.
//! - `ScriptedQueryClient` answers from canned rows keyed by batch, for tests
//!   and offline runs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::errors::AtlasError;
use crate::types::{LangCode, QueryText, VarName};
use crate::utils::entity_id_from_uri;

/// Batch identifiers and query texts.
pub mod batches;
/// Blocking HTTP clients for the query and discussion-page endpoints.
pub mod http;

pub use batches::BatchKind;
pub use http::{HttpQueryClient, HttpTalkPageClient};

/// One typed value in a result row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowValue {
    /// Plain literal, optionally language-tagged.
    Literal {
        value: String,
        lang: Option<LangCode>,
    },
    /// Literal with an explicit datatype (dates, integers, geometry).
    Typed { value: String, datatype: String },
    /// Reference to an entity or resource by URI.
    Entity(String),
    /// Blank node label.
    Blank(String),
}

impl RowValue {
    /// Raw lexical value.
    pub fn text(&self) -> &str {
        match self {
            Self::Literal { value, .. } | Self::Typed { value, .. } => value,
            Self::Entity(uri) => uri,
            Self::Blank(label) => label,
        }
    }

    /// Language tag of a plain literal.
    pub fn lang(&self) -> Option<&str> {
        match self {
            Self::Literal { lang, .. } => lang.as_deref(),
            _ => None,
        }
    }
}

/// A flat result row: declared output variable → value. Unbound variables are absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultRow {
    values: IndexMap<VarName, RowValue>,
}

impl ResultRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<VarName>, value: RowValue) {
        self.values.insert(name.into(), value);
    }

    /// Builder form of [`ResultRow::insert`].
    pub fn with(mut self, name: impl Into<VarName>, value: RowValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind a plain literal without a language tag.
    pub fn literal(self, name: impl Into<VarName>, value: impl Into<String>) -> Self {
        self.with(
            name,
            RowValue::Literal {
                value: value.into(),
                lang: None,
            },
        )
    }

    /// Bind a language-tagged literal.
    pub fn tagged(
        self,
        name: impl Into<VarName>,
        value: impl Into<String>,
        lang: impl Into<LangCode>,
    ) -> Self {
        self.with(
            name,
            RowValue::Literal {
                value: value.into(),
                lang: Some(lang.into()),
            },
        )
    }

    /// Bind a typed literal.
    pub fn typed(
        self,
        name: impl Into<VarName>,
        value: impl Into<String>,
        datatype: impl Into<String>,
    ) -> Self {
        self.with(
            name,
            RowValue::Typed {
                value: value.into(),
                datatype: datatype.into(),
            },
        )
    }

    /// Bind an entity reference.
    pub fn entity(self, name: impl Into<VarName>, uri: impl Into<String>) -> Self {
        self.with(name, RowValue::Entity(uri.into()))
    }

    /// Value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&RowValue> {
        self.values.get(name)
    }

    /// Returns `true` when `name` is bound.
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Lexical value bound to `name`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).map(RowValue::text)
    }

    /// Language tag of the literal bound to `name`.
    pub fn lang(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(RowValue::lang)
    }

    /// Entity id bound to `name`: the trailing segment of a URI, or a
    /// pre-extracted literal id.
    pub fn entity_id(&self, name: &str) -> Option<&str> {
        self.text(name).and_then(entity_id_from_uri)
    }

    /// Bound variable names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Executes read-only structured queries against a remote endpoint.
///
/// Implementations must not retry: a failure is surfaced to the caller, which
/// decides how the affected facet degrades.
pub trait QueryClient: Send + Sync {
    /// Run `query` and return its rows in response order.
    fn execute(&self, query: &str) -> Result<Vec<ResultRow>, AtlasError>;
}

#[derive(Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Deserialize)]
struct SparqlResults {
    bindings: Vec<IndexMap<String, SparqlTerm>>,
}

#[derive(Deserialize)]
struct SparqlTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang")]
    lang: Option<String>,
    datatype: Option<String>,
}

impl SparqlTerm {
    fn into_value(self) -> RowValue {
        match (self.kind.as_str(), self.datatype) {
            ("uri", _) => RowValue::Entity(self.value),
            ("bnode", _) => RowValue::Blank(self.value),
            (_, Some(datatype)) => RowValue::Typed {
                value: self.value,
                datatype,
            },
            (_, None) => RowValue::Literal {
                value: self.value,
                lang: self.lang,
            },
        }
    }
}

/// Decode a SPARQL JSON results document into rows.
pub fn parse_sparql_json(batch: &str, body: &str) -> Result<Vec<ResultRow>, AtlasError> {
    let response: SparqlResponse =
        serde_json::from_str(body).map_err(|err| AtlasError::MalformedResponse {
            batch: batch.to_string(),
            details: format!("failed parsing SPARQL JSON results: {err}"),
        })?;
    Ok(response
        .results
        .bindings
        .into_iter()
        .map(|binding| ResultRow {
            values: binding
                .into_iter()
                .map(|(name, term)| (name, term.into_value()))
                .collect(),
        })
        .collect())
}

/// Canned answer for one batch.
#[derive(Clone, Debug)]
pub enum ScriptedResponse {
    /// Return these rows.
    Rows(Vec<ResultRow>),
    /// Fail as if the endpoint answered with this HTTP status.
    Status(u16),
}

/// In-memory query client for tests and offline runs.
///
/// Queries are matched to batches by their leading batch tag; batches without
/// a scripted response return no rows.
#[derive(Default)]
pub struct ScriptedQueryClient {
    responses: HashMap<BatchKind, ScriptedResponse>,
    executed: Mutex<Vec<QueryText>>,
}

impl ScriptedQueryClient {
    /// Create a client with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `batch` with `rows`.
    pub fn with_rows(mut self, batch: BatchKind, rows: Vec<ResultRow>) -> Self {
        self.responses.insert(batch, ScriptedResponse::Rows(rows));
        self
    }

    /// Fail `batch` with an HTTP `status`.
    pub fn with_status(mut self, batch: BatchKind, status: u16) -> Self {
        self.responses.insert(batch, ScriptedResponse::Status(status));
        self
    }

    /// Query texts received so far, in execution order.
    pub fn executed_queries(&self) -> Vec<QueryText> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QueryClient for ScriptedQueryClient {
    fn execute(&self, query: &str) -> Result<Vec<ResultRow>, AtlasError> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());
        let Some(batch) = BatchKind::from_query_text(query) else {
            return Err(AtlasError::MalformedResponse {
                batch: "unknown".into(),
                details: "query text carries no batch tag".into(),
            });
        };
        match self.responses.get(&batch) {
            Some(ScriptedResponse::Rows(rows)) => Ok(rows.clone()),
            Some(ScriptedResponse::Status(status)) => Err(AtlasError::QueryStatus {
                batch: batch.name().to_string(),
                status: *status,
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparql_json_decodes_every_term_kind() {
        let body = r#"{
            "head": {"vars": ["marker", "title", "date", "node"]},
            "results": {"bindings": [
                {
                    "marker": {"type": "uri", "value": "http://www.wikidata.org/entity/Q42"},
                    "title": {"type": "literal", "value": "Rizal Park", "xml:lang": "en"},
                    "date": {"type": "literal", "value": "1945-01-01T00:00:00Z",
                             "datatype": "http://www.w3.org/2001/XMLSchema#dateTime"},
                    "node": {"type": "bnode", "value": "b0"}
                },
                {
                    "marker": {"type": "uri", "value": "http://www.wikidata.org/entity/Q43"}
                }
            ]}
        }"#;
        let rows = parse_sparql_json("title", body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entity_id("marker"), Some("Q42"));
        assert_eq!(rows[0].lang("title"), Some("en"));
        assert!(matches!(rows[0].get("date"), Some(RowValue::Typed { .. })));
        assert_eq!(rows[0].get("node"), Some(&RowValue::Blank("b0".into())));
        assert!(!rows[1].has("title"));
        assert_eq!(
            rows[0].names().collect::<Vec<_>>(),
            vec!["marker", "title", "date", "node"]
        );
    }

    #[test]
    fn sparql_json_rejects_unexpected_shape() {
        let err = parse_sparql_json("date", r#"{"boolean": true}"#).unwrap_err();
        assert!(matches!(err, AtlasError::MalformedResponse { .. }));
    }

    #[test]
    fn scripted_client_answers_by_batch_tag() {
        let client = ScriptedQueryClient::new()
            .with_rows(
                BatchKind::Identity,
                vec![ResultRow::new().literal("marker", "Q1")],
            )
            .with_status(BatchKind::Date, 503);

        let identity = BatchKind::Identity.render(None).unwrap();
        assert_eq!(client.execute(&identity).unwrap().len(), 1);

        let clause = crate::store::FilterClause::from_ids(["Q1"]);
        let date = BatchKind::Date.render(Some(&clause)).unwrap();
        let err = client.execute(&date).unwrap_err();
        assert!(matches!(err, AtlasError::QueryStatus { status: 503, .. }));

        let photo = BatchKind::Photo.render(Some(&clause)).unwrap();
        assert!(client.execute(&photo).unwrap().is_empty());
        assert_eq!(client.executed_queries().len(), 3);
        assert!(client.execute("SELECT * WHERE {}").is_err());
    }
}

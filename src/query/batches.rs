use std::fmt;

use crate::constants::query::{BATCH_TAG_PREFIX, FILTER_PLACEHOLDER};
use crate::errors::AtlasError;
use crate::store::FilterClause;
use crate::types::QueryText;

/// One facet query. `Identity` runs first; the rest run concurrently once the
/// filter clause exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BatchKind {
    Identity,
    Title,
    Location,
    Inscription,
    Date,
    Photo,
    Commemoration,
}

impl BatchKind {
    /// Batches that depend on the filter clause, in issue order.
    pub const DEPENDENT: [BatchKind; 6] = [
        BatchKind::Title,
        BatchKind::Location,
        BatchKind::Inscription,
        BatchKind::Date,
        BatchKind::Photo,
        BatchKind::Commemoration,
    ];

    /// Stable batch name used in logs, reports, and query tags.
    pub fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Title => "title",
            Self::Location => "location",
            Self::Inscription => "inscription",
            Self::Date => "date",
            Self::Photo => "photo",
            Self::Commemoration => "commemoration",
        }
    }

    /// Parse a batch name.
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Identity]
            .into_iter()
            .chain(Self::DEPENDENT)
            .find(|batch| batch.name() == name)
    }

    /// Recover the batch from the tag on the first line of a rendered query.
    pub fn from_query_text(query: &str) -> Option<Self> {
        let first = query.lines().next()?.trim();
        Self::from_name(first.strip_prefix(BATCH_TAG_PREFIX)?.trim())
    }

    /// Returns `true` when the query text needs a filter clause.
    pub fn needs_filter(self) -> bool {
        self.template().contains(FILTER_PLACEHOLDER)
    }

    /// Render the query text, interpolating `filter` into its placeholder.
    pub fn render(self, filter: Option<&FilterClause>) -> Result<QueryText, AtlasError> {
        let template = self.template();
        if !self.needs_filter() {
            return Ok(template.to_string());
        }
        let filter = filter.ok_or_else(|| {
            AtlasError::InvalidState(format!(
                "batch '{}' requires a filter clause before it can run",
                self.name()
            ))
        })?;
        Ok(template.replace(FILTER_PLACEHOLDER, filter.as_str()))
    }

    fn template(self) -> &'static str {
        match self {
            Self::Identity => IDENTITY_QUERY,
            Self::Title => TITLE_QUERY,
            Self::Location => LOCATION_QUERY,
            Self::Inscription => INSCRIPTION_QUERY,
            Self::Date => DATE_QUERY,
            Self::Photo => PHOTO_QUERY,
            Self::Commemoration => COMMEMORATION_QUERY,
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const IDENTITY_QUERY: &str = r#"#batch:identity
SELECT ?marker ?coord WHERE {
  ?marker wdt:P31 wd:Q21562164 ;
          wdt:P625 ?coord .
  FILTER (!isBLANK(?coord)) .
}"#;

const TITLE_QUERY: &str = r#"#batch:title
SELECT ?marker ?markerLabel ?title ?subtitle ?titleNoValue ?targetLang WHERE {
  $FILTER_CLAUSE
  ?marker p:P1476 ?titleStatement .
  OPTIONAL {
    ?titleStatement ps:P1476 ?title .
    OPTIONAL { ?titleStatement pq:P1680 ?subtitle }
  }
  OPTIONAL {
    ?titleStatement a ?titleNoValue .
    FILTER (?titleNoValue = wdno:P1476)
  }
  OPTIONAL { ?titleStatement pq:P407 ?targetLang }
  SERVICE wikibase:label { bd:serviceParam wikibase:language "en" }
}"#;

const LOCATION_QUERY: &str = r#"#batch:location
SELECT ?marker ?country ?countryLabel ?location ?locationLabel ?locationImage
       ?streetAddress ?directions
       ?admin0 ?admin0Label ?admin0Type ?admin1 ?admin1Label ?admin1Type
       ?admin2 ?admin2Label ?admin2Type ?admin3 ?admin3Label ?admin3Type
       ?islandLabel ?islandAdminType WHERE {
  $FILTER_CLAUSE
  OPTIONAL { ?marker wdt:P17 ?country }
  OPTIONAL {
    ?marker wdt:P276 ?location .
    OPTIONAL { ?location wdt:P18 ?locationImage }
  }
  OPTIONAL { ?marker wdt:P969 ?streetAddress }
  OPTIONAL { ?marker wdt:P2795 ?directions }
  OPTIONAL {
    ?marker wdt:P131 ?admin0 .
    OPTIONAL {
      ?admin0 wdt:P31 ?admin0Type .
      FILTER (?admin0Type IN (wd:Q6256, wd:Q24698, wd:Q24746, wd:Q104157,
                              wd:Q29946056, wd:Q24764, wd:Q61878))
    }
    OPTIONAL {
      ?admin0 wdt:P131 ?admin1 .
      OPTIONAL {
        ?admin1 wdt:P31 ?admin1Type .
        FILTER (?admin1Type IN (wd:Q6256, wd:Q24698, wd:Q24746, wd:Q104157,
                                wd:Q29946056, wd:Q24764, wd:Q61878))
      }
      OPTIONAL {
        ?admin1 wdt:P131 ?admin2 .
        OPTIONAL {
          ?admin2 wdt:P31 ?admin2Type .
          FILTER (?admin2Type IN (wd:Q6256, wd:Q24698, wd:Q24746, wd:Q104157,
                                  wd:Q29946056, wd:Q24764, wd:Q61878))
        }
        OPTIONAL {
          ?admin2 wdt:P131 ?admin3 .
          OPTIONAL {
            ?admin3 wdt:P31 ?admin3Type .
            FILTER (?admin3Type IN (wd:Q6256, wd:Q24698, wd:Q24746, wd:Q104157,
                                    wd:Q29946056, wd:Q24764, wd:Q61878))
          }
        }
      }
    }
  }
  OPTIONAL {
    ?marker wdt:P5130 ?island .
    ?island wdt:P131 ?islandAdmin .
    ?islandAdmin wdt:P31 ?islandAdminType .
    FILTER (?islandAdminType IN (wd:Q104157, wd:Q29946056, wd:Q24764, wd:Q61878))
  }
  SERVICE wikibase:label { bd:serviceParam wikibase:language "en" }
}"#;

const INSCRIPTION_QUERY: &str = r#"#batch:inscription
SELECT ?marker ?inscription ?inscriptionNoValue WHERE {
  $FILTER_CLAUSE
  {
    ?marker wdt:P1684 ?inscription .
  }
  UNION
  {
    ?marker p:P1684 ?inscriptionStatement .
    ?inscriptionStatement a ?inscriptionNoValue .
    FILTER (?inscriptionNoValue = wdno:P1684)
  }
}"#;

const DATE_QUERY: &str = r#"#batch:date
SELECT ?marker ?date ?datePrecision ?targetLang WHERE {
  $FILTER_CLAUSE
  ?marker p:P571 ?dateStatement .
  ?dateStatement psv:P571 ?dateValue .
  ?dateValue wikibase:timeValue ?date ;
             wikibase:timePrecision ?datePrecision .
  OPTIONAL { ?dateStatement pq:P407 ?targetLang }
}"#;

const PHOTO_QUERY: &str = r#"#batch:photo
SELECT ?marker ?image ?targetLang ?ordinal ?vicinityImage ?vicinityDescription WHERE {
  $FILTER_CLAUSE
  ?marker p:P18 ?imageStatement .
  OPTIONAL {
    ?imageStatement ps:P18 ?image .
    FILTER NOT EXISTS { ?imageStatement pq:P3831 wd:Q16968816 }
    OPTIONAL { ?imageStatement pq:P407 ?targetLang }
    OPTIONAL { ?imageStatement pq:P1545 ?ordinal }
  }
  OPTIONAL {
    ?imageStatement ps:P18 ?vicinityImage .
    FILTER EXISTS { ?imageStatement pq:P3831 wd:Q16968816 }
    OPTIONAL { ?imageStatement pq:P2096 ?vicinityDescription }
  }
}"#;

const COMMEMORATION_QUERY: &str = r#"#batch:commemoration
SELECT ?marker ?commemorates ?commemoratesLabel ?commemoratesArticle WHERE {
  $FILTER_CLAUSE
  ?marker wdt:P547 ?commemorates .
  OPTIONAL {
    ?commemoratesArticle schema:about ?commemorates ;
                         schema:isPartOf <https://en.wikipedia.org/> .
  }
  SERVICE wikibase:label { bd:serviceParam wikibase:language "en" }
}"#;

//! Secondary inscription enrichment from entity discussion pages.
//!
//! Records that end the pipeline with no populated inscription are looked up
//! on their discussion page, where long inscriptions are kept in inline
//! templates. Fetches run on scoped worker threads; parsed results are applied
//! on the caller's thread, one record at a time, and each change is reported
//! through [`AtlasObserver::on_record_updated`].

use std::sync::OnceLock;
use std::sync::mpsc;
use std::thread;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::constants::enrichment::{
    INSCRIPTION_FIELD, LANGUAGE_FIELD, MISSING_PAGE_ID, TEMPLATE_NAME,
};
use crate::data::Record;
use crate::derive::derive_languages;
use crate::errors::AtlasError;
use crate::language::code_for_item;
use crate::observer::AtlasObserver;
use crate::store::EntityStore;
use crate::types::{EntityId, LangCode, Wikitext};
use crate::utils::format_inscription;

/// Fetches the wikitext of an entity's discussion page.
pub trait TalkPageClient: Send + Sync {
    /// Current page content, or `None` when the page does not exist.
    fn fetch_talk_page(&self, entity: &EntityId) -> Result<Option<Wikitext>, AtlasError>;
}

/// One inscription found in a discussion-page template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LongInscription {
    pub lang: LangCode,
    /// Raw template text, before paragraph formatting.
    pub text: String,
}

/// Counters for one enrichment pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Records that qualified for enrichment.
    pub candidates: usize,
    /// Discussion pages that existed.
    pub pages_found: usize,
    /// Records that gained at least one inscription.
    pub enriched: usize,
    /// Fetches that failed.
    pub failures: usize,
}

#[derive(Deserialize)]
struct ApiResponse {
    query: Option<ApiQuery>,
}

#[derive(Deserialize)]
struct ApiQuery {
    pages: IndexMap<String, ApiPage>,
}

#[derive(Deserialize)]
struct ApiPage {
    #[serde(default)]
    revisions: Vec<ApiRevision>,
}

#[derive(Deserialize)]
struct ApiRevision {
    #[serde(rename = "*")]
    content: Option<String>,
}

/// Extract the latest revision content from a MediaWiki `prop=revisions`
/// response. A missing page yields `Ok(None)`.
pub fn parse_talk_page_response(
    entity: &EntityId,
    body: &str,
) -> Result<Option<Wikitext>, AtlasError> {
    let enrichment_error = |reason: String| AtlasError::Enrichment {
        entity: entity.clone(),
        reason,
    };
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|err| enrichment_error(format!("failed parsing discussion page response: {err}")))?;
    let pages = response
        .query
        .ok_or_else(|| enrichment_error("response has no query section".into()))?
        .pages;
    let Some((page_id, page)) = pages.into_iter().next() else {
        return Ok(None);
    };
    if page_id == MISSING_PAGE_ID {
        return Ok(None);
    }
    Ok(page
        .revisions
        .into_iter()
        .next()
        .and_then(|revision| revision.content))
}

fn template_pattern() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(&format!(r"(?s)\{{\{{\s*{TEMPLATE_NAME}.+?\}}\}}"))
            .expect("constant regex pattern")
    })
}

fn language_pattern() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(&format!(r"\|\s*{LANGUAGE_FIELD}\s*=\s*(Q[0-9]+)"))
            .expect("constant regex pattern")
    })
}

fn inscription_pattern() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(&format!(r"(?s)\|\s*{INSCRIPTION_FIELD}\s*=\s*(.*?)(?:\||\}}\}})"))
            .expect("constant regex pattern")
    })
}

/// Find every long-inscription template in `wikitext` whose language is in
/// the language table. Templates missing either field are ignored.
pub fn extract_long_inscriptions(wikitext: &str) -> Vec<LongInscription> {
    template_pattern()
        .find_iter(wikitext)
        .filter_map(|template| {
            let template = template.as_str();
            let item_id = language_pattern().captures(template)?.get(1)?.as_str();
            let text = inscription_pattern().captures(template)?.get(1)?.as_str();
            let Some(lang) = code_for_item(item_id) else {
                debug!(language = item_id, "ignoring inscription in unlisted language");
                return None;
            };
            Some(LongInscription {
                lang,
                text: text.trim_end().to_string(),
            })
        })
        .collect()
}

/// Whether `record` should be looked up on its discussion page: its
/// inscription is not an explicit no-value and has no populated language.
pub fn needs_enrichment(record: &Record) -> bool {
    !record.inscription.is_no_value() && record.inscription.populated_count() == 0
}

/// Merge found inscriptions into `record` and re-derive its languages.
/// Returns `true` when the record changed.
pub fn apply_long_inscriptions(record: &mut Record, found: &[LongInscription]) -> bool {
    let mut changed = false;
    for inscription in found {
        changed |= record
            .inscription
            .set(&inscription.lang, format_inscription(&inscription.text));
    }
    if changed {
        derive_languages(record);
    }
    changed
}

type FetchOutcome = (EntityId, Result<Option<Wikitext>, AtlasError>);

/// Look up every qualifying record's discussion page and merge what is found.
///
/// Failures are isolated per record: they are logged, counted, and leave the
/// record untouched.
pub fn enrich_store(
    store: &mut EntityStore,
    client: &dyn TalkPageClient,
    observer: &mut dyn AtlasObserver,
    workers: usize,
) -> EnrichmentReport {
    let candidates: Vec<EntityId> = store
        .all()
        .filter(|record| needs_enrichment(record))
        .map(|record| record.id.clone())
        .collect();
    let mut report = EnrichmentReport {
        candidates: candidates.len(),
        ..EnrichmentReport::default()
    };
    if candidates.is_empty() {
        return report;
    }
    info!(
        "[markers:enrich] checking {} discussion pages for long inscriptions",
        candidates.len()
    );

    let chunk_size = candidates.len().div_ceil(workers.max(1));
    let (sender, receiver) = mpsc::channel::<FetchOutcome>();
    thread::scope(|scope| {
        for chunk in candidates.chunks(chunk_size) {
            let sender = sender.clone();
            scope.spawn(move || {
                for entity in chunk {
                    let outcome = client.fetch_talk_page(entity);
                    if sender.send((entity.clone(), outcome)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(sender);

        for (entity, outcome) in receiver {
            let wikitext = match outcome {
                Ok(Some(wikitext)) => wikitext,
                Ok(None) => continue,
                Err(err) => {
                    warn!(entity = %entity, error = %err, "discussion page fetch failed");
                    report.failures += 1;
                    continue;
                }
            };
            report.pages_found += 1;
            let found = extract_long_inscriptions(&wikitext);
            let Some(record) = store.get_mut(&entity) else {
                continue;
            };
            if apply_long_inscriptions(record, &found) {
                report.enriched += 1;
                debug!(entity = %entity, languages = ?record.languages, "record enriched");
                observer.on_record_updated(record);
            }
        }
    });

    info!(
        "[markers:enrich] enriched {} of {} records ({} failures)",
        report.enriched, report.candidates, report.failures
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Localized;
    use std::collections::HashMap;

    const PAGE: &str = "Notes.\n\
        {{LongInscription\n\
        | langqid = Q34057\n\
        | inscription = Unang talata.<br><br>Ikalawang talata.\n\
        }}\n\
        {{ LongInscription | langqid = Q1860 | inscription = First paragraph. | note = x }}\n\
        {{LongInscription|langqid=Q7850|inscription=Unlisted}}\n\
        {{LongInscription|inscription=No language}}";

    struct ScriptedTalkPages {
        pages: HashMap<EntityId, Result<Option<Wikitext>, String>>,
    }

    impl TalkPageClient for ScriptedTalkPages {
        fn fetch_talk_page(&self, entity: &EntityId) -> Result<Option<Wikitext>, AtlasError> {
            match self.pages.get(entity) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(reason)) => Err(AtlasError::Enrichment {
                    entity: entity.clone(),
                    reason: reason.clone(),
                }),
                None => Ok(None),
            }
        }
    }

    #[derive(Default)]
    struct UpdateLog(Vec<EntityId>);

    impl AtlasObserver for UpdateLog {
        fn on_record_updated(&mut self, record: &Record) {
            self.0.push(record.id.clone());
        }
    }

    #[test]
    fn templates_yield_listed_languages_only() {
        let found = extract_long_inscriptions(PAGE);
        assert_eq!(
            found,
            vec![
                LongInscription {
                    lang: "tl".into(),
                    text: "Unang talata.<br><br>Ikalawang talata.".into(),
                },
                LongInscription {
                    lang: "en".into(),
                    text: "First paragraph.".into(),
                },
            ]
        );
    }

    #[test]
    fn api_response_handles_present_and_missing_pages() {
        let entity = "Q1".to_string();
        let present = r#"{"batchcomplete":"","query":{"pages":{"555":{"pageid":555,"ns":1,
            "title":"Talk:Q1","revisions":[{"contentformat":"text/x-wiki","*":"hello"}]}}}}"#;
        assert_eq!(
            parse_talk_page_response(&entity, present).unwrap().as_deref(),
            Some("hello")
        );
        let missing = r#"{"query":{"pages":{"-1":{"ns":1,"title":"Talk:Q1","missing":""}}}}"#;
        assert_eq!(parse_talk_page_response(&entity, missing).unwrap(), None);
        assert!(matches!(
            parse_talk_page_response(&entity, "{}"),
            Err(AtlasError::Enrichment { .. })
        ));
    }

    #[test]
    fn trigger_skips_no_value_and_populated_inscriptions() {
        let mut record = Record::new("Q1");
        assert!(needs_enrichment(&record));
        record.inscription.set_null("en");
        assert!(needs_enrichment(&record));
        record.inscription.set("en", "<p>Text</p>".into());
        assert!(!needs_enrichment(&record));

        let mut silent = Record::new("Q2");
        silent.inscription.set_no_value();
        assert!(!needs_enrichment(&silent));
    }

    #[test]
    fn enrichment_updates_records_and_isolates_failures() {
        let mut store = EntityStore::new();
        for id in ["Q1", "Q2", "Q3", "Q4"] {
            store.get_or_create(id);
        }
        store
            .get_mut("Q4")
            .unwrap()
            .inscription
            .set("en", "<p>Already here</p>".into());

        let client = ScriptedTalkPages {
            pages: HashMap::from([
                ("Q1".to_string(), Ok(Some(PAGE.to_string()))),
                ("Q2".to_string(), Err("HTTP 500".to_string())),
                ("Q3".to_string(), Ok(None)),
            ]),
        };
        let mut log = UpdateLog::default();
        let report = enrich_store(&mut store, &client, &mut log, 2);

        assert_eq!(report.candidates, 3);
        assert_eq!(report.pages_found, 1);
        assert_eq!(report.enriched, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(log.0, vec!["Q1"]);

        let record = store.get("Q1").unwrap();
        assert_eq!(record.languages, vec!["en", "tl"]);
        assert_eq!(
            record.inscription.as_map().unwrap()["tl"].as_deref(),
            Some("<p>Unang talata.</p><p>Ikalawang talata.</p>")
        );
        assert_eq!(store.get("Q3").unwrap().inscription, Localized::Unset);
    }
}

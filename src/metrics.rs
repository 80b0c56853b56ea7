use crate::data::{DateValue, Localized};
use crate::language::preference_order;
use crate::store::EntityStore;
use crate::types::LangCode;

/// How many records carry each facet after a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FacetCoverage {
    pub records: usize,
    pub titled: usize,
    pub untitled: usize,
    pub with_inscription: usize,
    pub without_inscription: usize,
    pub with_date: usize,
    pub with_image: usize,
    pub with_address: usize,
    pub with_vicinity: usize,
    pub with_commemorations: usize,
    pub per_language: Vec<LanguageShare>,
}

/// Records available in one language.
#[derive(Clone, Debug, PartialEq)]
pub struct LanguageShare {
    pub code: LangCode,
    pub count: usize,
    pub share: f64,
}

/// Summarize facet coverage across `store`. Languages appear in preference
/// order and only when at least one record uses them.
pub fn facet_coverage(store: &EntityStore) -> FacetCoverage {
    let mut coverage = FacetCoverage {
        records: store.len(),
        ..FacetCoverage::default()
    };
    for record in store.all() {
        match &record.title {
            Localized::NoValue => coverage.untitled += 1,
            title if title.populated_count() > 0 => coverage.titled += 1,
            _ => {}
        }
        match &record.inscription {
            Localized::NoValue => coverage.without_inscription += 1,
            inscription if inscription.populated_count() > 0 => coverage.with_inscription += 1,
            _ => {}
        }
        if !matches!(record.date, DateValue::Unset) {
            coverage.with_date += 1;
        }
        if !record.image.filenames().is_empty() {
            coverage.with_image += 1;
        }
        if !record.location.address.is_empty() {
            coverage.with_address += 1;
        }
        if record.vicinity.is_some() {
            coverage.with_vicinity += 1;
        }
        if record.commemorates.as_ref().is_some_and(|subjects| !subjects.is_empty()) {
            coverage.with_commemorations += 1;
        }
    }

    let total = coverage.records;
    coverage.per_language = preference_order()
        .filter_map(|info| {
            let count = store
                .all()
                .filter(|record| record.languages.iter().any(|code| code == info.code))
                .count();
            (count > 0).then(|| LanguageShare {
                code: info.code.to_string(),
                count,
                share: if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64
                },
            })
        })
        .collect();
    coverage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ImageValue, LanguageMap, TitleText};

    #[test]
    fn coverage_counts_facets_and_languages() {
        let mut store = EntityStore::new();
        let first = store.get_or_create("Q1");
        first.title.set(
            "en",
            TitleText {
                main: "Fort Santiago".into(),
                subtitle: None,
            },
        );
        first.inscription.set("en", "<p>Text</p>".into());
        first.languages = vec!["en".into(), "tl".into()];
        first.location.address = "Manila".into();

        let second = store.get_or_create("Q2");
        second.title.set_no_value();
        second.inscription.set_no_value();
        second.image = ImageValue::Single("Marker.jpg".into());
        second.languages = vec!["en".into()];

        let mut placeholders = LanguageMap::new();
        placeholders.insert("en".to_string(), None);
        store.get_or_create("Q3").image = ImageValue::ByLanguage(placeholders);

        let coverage = facet_coverage(&store);
        assert_eq!(coverage.records, 3);
        assert_eq!(coverage.titled, 1);
        assert_eq!(coverage.untitled, 1);
        assert_eq!(coverage.with_inscription, 1);
        assert_eq!(coverage.without_inscription, 1);
        assert_eq!(coverage.with_image, 1);
        assert_eq!(coverage.with_address, 1);
        assert_eq!(coverage.per_language.len(), 2);
        assert_eq!(coverage.per_language[0].code, "en");
        assert_eq!(coverage.per_language[0].count, 2);
        assert!((coverage.per_language[0].share - 2.0 / 3.0).abs() < 1e-6);
        assert!((coverage.per_language[1].share - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_store_has_no_languages() {
        let coverage = facet_coverage(&EntityStore::new());
        assert_eq!(coverage, FacetCoverage::default());
    }
}

/// Remote endpoints and request parameters.
pub mod endpoints {
    /// Wikidata Query Service SPARQL endpoint.
    pub const QUERY_ENDPOINT: &str = "https://query.wikidata.org/sparql";
    /// MediaWiki action API used for discussion-page content.
    pub const TALK_PAGE_ENDPOINT: &str = "https://www.wikidata.org/w/api.php";
    /// Accept header value for SPARQL JSON results.
    pub const SPARQL_RESULTS_MIME: &str = "application/sparql-results+json";
    /// User agent sent with every request.
    pub const DEFAULT_USER_AGENT: &str = concat!(
        "heritage-markers/",
        env!("CARGO_PKG_VERSION"),
        " (historical markers map aggregation)"
    );
    /// Upper bound on a single response body read into memory.
    pub const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;
    /// Prefix stripped from media repository file URLs to get a bare filename.
    pub const FILE_PATH_URL_MARKERS: [&str; 2] = [
        "http://commons.wikimedia.org/wiki/Special:FilePath/",
        "https://commons.wikimedia.org/wiki/Special:FilePath/",
    ];
}

/// Fixed knowledge-graph identifiers used for classification.
pub mod ids {
    /// Precision value the query service uses for year-only dates.
    pub const YEAR_PRECISION: &str = "9";
    /// Home country; its label is omitted from addresses.
    pub const HOME_COUNTRY: &str = "Q928";
    /// Region administrative unit type.
    pub const REGION: &str = "Q24698";
    /// Province administrative unit type.
    pub const PROVINCE: &str = "Q24746";
    /// Highly urbanized city administrative unit type.
    pub const HIGHLY_URBANIZED_CITY: &str = "Q29946056";
    /// Component/independent city administrative unit type.
    pub const CITY: &str = "Q104157";
    /// Capital region, always shown in addresses.
    pub const CAPITAL_REGION: &str = "Q13580";
    /// Admin ids whose labels never appear in an address.
    pub const SKIPPED_ADDRESS_IDS: [&str; 5] = [
        "Q2863958", // arrondissement of Paris
        "Q90870",   // Arrondissement of Brussels-Capital
        "Q240",     // Brussels-Capital Region
        "Q8165",    // Karlsruhe Government Region
        "Q2013767", // Mitte (locality in Mitte)
    ];
    /// Admin ids whose label is replaced in addresses.
    pub const ADDRESS_LABEL_OVERRIDES: [(&str, &str); 1] = [("Q245546", "6th arrondissement")];
}

/// Language table in preference order.
pub mod languages {
    /// `(code, display name, language item id)` in preference order.
    pub const LANGUAGE_TABLE: [(&str, &str, &str); 8] = [
        ("en", "English", "Q1860"),
        ("tl", "Tagalog", "Q34057"),
        ("ceb", "Cebuano", "Q33239"),
        ("ilo", "Ilocano", "Q35936"),
        ("pam", "Kapampangan", "Q36121"),
        ("es", "Spanish", "Q1321"),
        ("de", "German", "Q188"),
        ("fr", "French", "Q150"),
    ];
}

/// Constants used by the facet mergers and post-merge derivation.
pub mod merge {
    /// Number of administrative containment levels walked per location row.
    pub const ADMIN_LEVELS: usize = 4;
    /// Separator between address parts.
    pub const ADDRESS_SEPARATOR: &str = ", ";
    /// Pattern stripped from a primary label to build an untitled substitute.
    pub const UNTITLED_SUFFIX_PATTERN: &str = r"(?i) *historical marker";
    /// Leading articles ignored by the alphabetic sort key.
    pub const LEADING_ARTICLES: [&str; 2] = ["The ", "Ang "];
    /// Pattern matching the double line break that separates inscription paragraphs.
    pub const PARAGRAPH_BREAK_PATTERN: &str = r"(?i)\s*<br\s*/?>\s*<br\s*/?>\s*";
    /// Pattern matching a single line break inside an index title.
    pub const LINE_BREAK_PATTERN: &str = r"<br\s*/?>";
    /// Largest photo ordinal accepted; higher ordinals make the row malformed.
    pub const MAX_PHOTO_ORDINAL: usize = 64;
}

/// Constants used by the query layer.
pub mod query {
    /// Placeholder replaced by the filter clause in batch queries.
    pub const FILTER_PLACEHOLDER: &str = "$FILTER_CLAUSE";
    /// Comment prefix tagging each query with its batch name.
    pub const BATCH_TAG_PREFIX: &str = "#batch:";
    /// Variable bound by the filter clause.
    pub const FILTER_VARIABLE: &str = "?marker";
    /// Entity prefix used inside the filter clause.
    pub const ENTITY_PREFIX: &str = "wd:";
}

/// Constants used by discussion-page inscription enrichment.
pub mod enrichment {
    /// Template carrying a long inscription on a discussion page.
    pub const TEMPLATE_NAME: &str = "LongInscription";
    /// Template field holding the language item id.
    pub const LANGUAGE_FIELD: &str = "langqid";
    /// Template field holding the inscription body.
    pub const INSCRIPTION_FIELD: &str = "inscription";
    /// Page id the MediaWiki API returns for missing pages.
    pub const MISSING_PAGE_ID: &str = "-1";
    /// Default number of concurrent discussion-page fetches.
    pub const DEFAULT_ENRICHMENT_WORKERS: usize = 8;
}

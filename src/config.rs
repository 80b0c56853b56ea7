use crate::constants::endpoints::{DEFAULT_USER_AGENT, QUERY_ENDPOINT, TALK_PAGE_ENDPOINT};
use crate::constants::enrichment::DEFAULT_ENRICHMENT_WORKERS;
use crate::constants::ids::{
    ADDRESS_LABEL_OVERRIDES, CAPITAL_REGION, HOME_COUNTRY, SKIPPED_ADDRESS_IDS,
};
use crate::types::EntityId;

/// Rules used when assembling a record's address from administrative levels.
#[derive(Clone, Debug)]
pub struct AddressPolicy {
    /// Country whose label is never appended.
    pub home_country: EntityId,
    /// Region that stays visible even below an independent city.
    pub capital_region: EntityId,
    /// Locality and admin ids whose labels are skipped.
    pub skipped_ids: Vec<EntityId>,
    /// Admin ids whose labels are replaced by a fixed label.
    pub label_overrides: Vec<(EntityId, String)>,
}

impl AddressPolicy {
    /// Returns `true` when `id` is on the skip-list.
    pub fn is_skipped(&self, id: &str) -> bool {
        self.skipped_ids.iter().any(|skipped| skipped == id)
    }

    /// Fixed replacement label for `id`, if any.
    pub fn label_override(&self, id: &str) -> Option<&str> {
        self.label_overrides
            .iter()
            .find(|(override_id, _)| override_id == id)
            .map(|(_, label)| label.as_str())
    }
}

impl Default for AddressPolicy {
    fn default() -> Self {
        Self {
            home_country: HOME_COUNTRY.to_string(),
            capital_region: CAPITAL_REGION.to_string(),
            skipped_ids: SKIPPED_ADDRESS_IDS.iter().map(|id| id.to_string()).collect(),
            label_overrides: ADDRESS_LABEL_OVERRIDES
                .iter()
                .map(|(id, label)| (id.to_string(), label.to_string()))
                .collect(),
        }
    }
}

/// Top-level aggregation configuration.
#[derive(Clone, Debug)]
pub struct AtlasConfig {
    /// Structured query endpoint.
    pub query_endpoint: String,
    /// Discussion-page API endpoint used by inscription enrichment.
    pub talk_page_endpoint: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Address assembly rules.
    pub address: AddressPolicy,
    /// Run discussion-page enrichment after the pipeline is ready.
    pub enrich_inscriptions: bool,
    /// Upper bound on concurrent discussion-page fetches.
    pub enrichment_workers: usize,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            query_endpoint: QUERY_ENDPOINT.to_string(),
            talk_page_endpoint: TALK_PAGE_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            address: AddressPolicy::default(),
            enrich_inscriptions: true,
            enrichment_workers: DEFAULT_ENRICHMENT_WORKERS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_skips_and_overrides_fixed_ids() {
        let policy = AddressPolicy::default();
        assert!(policy.is_skipped("Q240"));
        assert!(!policy.is_skipped("Q1490"));
        assert_eq!(policy.label_override("Q245546"), Some("6th arrondissement"));
        assert_eq!(policy.label_override("Q90"), None);
        assert_eq!(policy.home_country, "Q928");
    }
}

use crate::config::AddressPolicy;
use crate::constants::ids::{CITY, HIGHLY_URBANIZED_CITY, PROVINCE, REGION};
use crate::constants::merge::{ADDRESS_SEPARATOR, ADMIN_LEVELS};
use crate::data::Record;
use crate::errors::AtlasError;
use crate::merge::{ENTITY_VAR, FacetMerger, entity_id};
use crate::query::{BatchKind, ResultRow};
use crate::types::{AddressPart, EntityId, Filename};
use crate::utils::image_filename_from_url;

const COUNTRY_VAR: &str = "country";
const COUNTRY_LABEL_VAR: &str = "countryLabel";
const LOCALITY_VAR: &str = "location";
const LOCALITY_LABEL_VAR: &str = "locationLabel";
const LOCALITY_IMAGE_VAR: &str = "locationImage";
const STREET_ADDRESS_VAR: &str = "streetAddress";
const DIRECTIONS_VAR: &str = "directions";
const ISLAND_LABEL_VAR: &str = "islandLabel";
const ISLAND_ADMIN_TYPE_VAR: &str = "islandAdminType";

/// An item with an id and a display label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabeledItem {
    pub id: EntityId,
    pub label: Option<String>,
}

/// One administrative containment level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminLevel {
    pub id: EntityId,
    /// Label after overrides.
    pub label: Option<String>,
    /// Administrative unit type, when it is one of the recognized types.
    pub kind: Option<EntityId>,
}

/// Island the marker stands on, with the unit type that contains it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Island {
    pub label: String,
    pub admin_kind: EntityId,
}

/// Decoded location row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocationRow {
    pub country: Option<LabeledItem>,
    pub locality: Option<LabeledItem>,
    pub street_address: Option<String>,
    /// Walked levels, innermost first; stops at a missing level or the country.
    pub admin_levels: Vec<AdminLevel>,
    pub island: Option<Island>,
    pub locality_image: Option<Filename>,
    pub directions: Option<String>,
}

impl LocationRow {
    /// Assemble the display address under `policy`.
    pub fn address(&self, policy: &AddressPolicy) -> String {
        let mut parts: Vec<AddressPart> = Vec::new();

        if let Some(locality) = &self.locality
            && !policy.is_skipped(&locality.id)
            && let Some(label) = &locality.label
        {
            parts.push(label.clone());
        }
        if let Some(street) = &self.street_address {
            parts.push(street.clone());
        }

        for (index, level) in self.admin_levels.iter().enumerate() {
            let Some(label) = level.label.as_deref().filter(|label| !label.is_empty()) else {
                break;
            };
            if index > 0 && !continues_after(&self.admin_levels[index - 1], level, policy) {
                break;
            }
            if policy.is_skipped(&level.id) {
                continue;
            }
            if let Some(island) = &self.island
                && level.kind.as_deref() == Some(island.admin_kind.as_str())
            {
                parts.push(island.label.clone());
            }
            parts.push(label.to_string());
        }

        if let Some(country) = &self.country
            && country.id != policy.home_country
            && let Some(label) = &country.label
        {
            parts.push(label.clone());
        }

        parts.join(ADDRESS_SEPARATOR)
    }
}

/// Whether `current` is still shown after `previous`.
///
/// Nothing is shown above a province or a region, and a city's enclosing
/// region is hidden unless it is the capital region.
fn continues_after(previous: &AdminLevel, current: &AdminLevel, policy: &AddressPolicy) -> bool {
    let previous_kind = previous.kind.as_deref();
    if previous_kind == Some(PROVINCE) || previous_kind == Some(REGION) {
        return false;
    }
    let previous_is_city = previous_kind == Some(CITY) || previous_kind == Some(HIGHLY_URBANIZED_CITY);
    !previous_is_city
        || current.kind.as_deref() != Some(REGION)
        || current.id == policy.capital_region
}

/// Builds addresses and collects place photos and directions.
#[derive(Clone, Copy, Debug)]
pub struct LocationMerger<'a> {
    policy: &'a AddressPolicy,
}

impl<'a> LocationMerger<'a> {
    /// Create a merger applying `policy`.
    pub fn new(policy: &'a AddressPolicy) -> Self {
        Self { policy }
    }
}

fn labeled_item(row: &ResultRow, var: &str, label_var: &str) -> Option<LabeledItem> {
    row.entity_id(var).map(|id| LabeledItem {
        id: id.to_string(),
        label: row.text(label_var).map(str::to_string),
    })
}

impl FacetMerger for LocationMerger<'_> {
    type Row = LocationRow;

    fn batch(&self) -> BatchKind {
        BatchKind::Location
    }

    fn decode(&self, row: &ResultRow) -> Result<(EntityId, LocationRow), AtlasError> {
        let id = entity_id(self.batch(), row, ENTITY_VAR)?;
        let country = labeled_item(row, COUNTRY_VAR, COUNTRY_LABEL_VAR);

        let mut admin_levels = Vec::with_capacity(ADMIN_LEVELS);
        for level in 0..ADMIN_LEVELS {
            let var = format!("admin{level}");
            let Some(admin_id) = row.entity_id(&var) else {
                break;
            };
            if country.as_ref().is_some_and(|country| country.id == admin_id) {
                break;
            }
            let label = match self.policy.label_override(admin_id) {
                Some(label) => Some(label.to_string()),
                None => row.text(&format!("{var}Label")).map(str::to_string),
            };
            admin_levels.push(AdminLevel {
                id: admin_id.to_string(),
                label,
                kind: row.entity_id(&format!("{var}Type")).map(str::to_string),
            });
        }

        let island = match (
            row.text(ISLAND_LABEL_VAR),
            row.entity_id(ISLAND_ADMIN_TYPE_VAR),
        ) {
            (Some(label), Some(kind)) => Some(Island {
                label: label.to_string(),
                admin_kind: kind.to_string(),
            }),
            _ => None,
        };

        let decoded = LocationRow {
            country,
            locality: labeled_item(row, LOCALITY_VAR, LOCALITY_LABEL_VAR),
            street_address: row.text(STREET_ADDRESS_VAR).map(str::to_string),
            admin_levels,
            island,
            locality_image: row.text(LOCALITY_IMAGE_VAR).map(image_filename_from_url),
            directions: row.text(DIRECTIONS_VAR).map(str::to_string),
        };
        Ok((id, decoded))
    }

    fn merge(&self, record: &mut Record, row: LocationRow) -> bool {
        let mut changed = false;
        if record.location.address.is_empty() {
            let address = row.address(self.policy);
            if !address.is_empty() {
                record.location.address = address;
                changed = true;
            }
        }
        if record.location.image_filename.is_none()
            && let Some(filename) = row.locality_image
        {
            record.location.image_filename = Some(filename);
            changed = true;
        }
        if let Some(directions) = row.directions {
            let vicinity = record.vicinity_mut();
            if vicinity.description.is_none() {
                vicinity.description = Some(directions);
                changed = true;
            }
        }
        changed
    }
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use crate::types::{EntityId, Filename, LangCode};

/// Per-language values; a `None` entry means "known language, no value".
pub type LanguageMap<T> = IndexMap<LangCode, Option<T>>;

/// A single geographic point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Coordinate samples before collapse, or the single representative point after.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coordinates {
    /// Raw samples in arrival order.
    Samples(Vec<GeoPoint>),
    /// Arithmetic mean of all samples.
    Point(GeoPoint),
}

impl Default for Coordinates {
    fn default() -> Self {
        Self::Samples(Vec::new())
    }
}

impl Coordinates {
    /// Append a raw sample. Ignored once collapsed.
    pub fn push_sample(&mut self, point: GeoPoint) -> bool {
        match self {
            Self::Samples(samples) => {
                samples.push(point);
                true
            }
            Self::Point(_) => false,
        }
    }

    /// Collapse samples to their mean. Returns the point, or `None` when
    /// there were no samples to collapse.
    pub fn collapse(&mut self) -> Option<GeoPoint> {
        match self {
            Self::Point(point) => Some(*point),
            Self::Samples(samples) if samples.is_empty() => None,
            Self::Samples(samples) => {
                let count = samples.len() as f64;
                let (lat_sum, lon_sum) = samples
                    .iter()
                    .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
                let point = GeoPoint {
                    lat: lat_sum / count,
                    lon: lon_sum / count,
                };
                *self = Self::Point(point);
                Some(point)
            }
        }
    }

    /// The collapsed point, if collapse has happened.
    pub fn point(&self) -> Option<GeoPoint> {
        match self {
            Self::Point(point) => Some(*point),
            Self::Samples(_) => None,
        }
    }
}

/// Three-state localized field: not loaded, explicit no-value, or per-language values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "values")]
pub enum Localized<T> {
    /// Not loaded yet (or never reported).
    #[default]
    Unset,
    /// The source states explicitly that there is no value.
    NoValue,
    /// Values keyed by language code, in arrival order.
    ByLanguage(LanguageMap<T>),
}

impl<T> Localized<T> {
    /// Returns `true` for the explicit no-value state.
    pub fn is_no_value(&self) -> bool {
        matches!(self, Self::NoValue)
    }

    /// Returns `true` when the per-language shape holds an entry for `code`.
    pub fn has_language(&self, code: &str) -> bool {
        matches!(self, Self::ByLanguage(map) if map.contains_key(code))
    }

    /// Number of languages with an actual value.
    pub fn populated_count(&self) -> usize {
        match self {
            Self::ByLanguage(map) => map.values().filter(|value| value.is_some()).count(),
            _ => 0,
        }
    }

    /// Per-language map, if the field uses that shape.
    pub fn as_map(&self) -> Option<&LanguageMap<T>> {
        match self {
            Self::ByLanguage(map) => Some(map),
            _ => None,
        }
    }

    /// Store `value` for `code`. An existing populated entry is kept; returns
    /// `true` when the field changed.
    ///
    /// A field in the no-value state is left untouched.
    pub fn set(&mut self, code: &str, value: T) -> bool {
        if self.is_no_value() {
            return false;
        }
        if matches!(self, Self::Unset) {
            *self = Self::ByLanguage(LanguageMap::new());
        }
        let Self::ByLanguage(map) = self else {
            return false;
        };
        match map.get_mut(code) {
            Some(Some(_)) => false,
            Some(slot @ None) => {
                *slot = Some(value);
                true
            }
            None => {
                map.insert(code.to_string(), Some(value));
                true
            }
        }
    }

    /// Record an explicit null for `code` unless an entry already exists.
    pub fn set_null(&mut self, code: &str) -> bool {
        match self {
            Self::NoValue => false,
            Self::Unset => {
                let mut map = LanguageMap::new();
                map.insert(code.to_string(), None);
                *self = Self::ByLanguage(map);
                true
            }
            Self::ByLanguage(map) => {
                if map.contains_key(code) {
                    return false;
                }
                map.insert(code.to_string(), None);
                true
            }
        }
    }

    /// Collapse the whole field to explicit no-value.
    pub fn set_no_value(&mut self) -> bool {
        if self.is_no_value() {
            return false;
        }
        *self = Self::NoValue;
        true
    }
}

/// Main title plus optional subtitle in one language.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleText {
    pub main: String,
    pub subtitle: Option<String>,
}

/// Unveiling date: one language-neutral string or per-language strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "shape", content = "value")]
pub enum DateValue {
    #[default]
    Unset,
    Single(String),
    ByLanguage(LanguageMap<String>),
}

impl DateValue {
    /// Returns `true` when the per-language shape holds an entry for `code`.
    pub fn has_language(&self, code: &str) -> bool {
        matches!(self, Self::ByLanguage(map) if map.contains_key(code))
    }
}

/// Marker photo: single file, ordered list, or per-language files.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "shape", content = "value")]
pub enum ImageValue {
    #[default]
    Unset,
    Single(Filename),
    Positional(Vec<Option<Filename>>),
    ByLanguage(LanguageMap<Filename>),
}

impl ImageValue {
    /// Returns `true` when the per-language shape holds an entry for `code`.
    pub fn has_language(&self, code: &str) -> bool {
        matches!(self, Self::ByLanguage(map) if map.contains_key(code))
    }

    /// All filenames referenced by this value.
    pub fn filenames(&self) -> Vec<&str> {
        match self {
            Self::Unset => Vec::new(),
            Self::Single(name) => vec![name.as_str()],
            Self::Positional(list) => list.iter().flatten().map(String::as_str).collect(),
            Self::ByLanguage(map) => map.values().flatten().map(String::as_str).collect(),
        }
    }
}

/// Address and optional place photo.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub image_filename: Option<Filename>,
}

/// Alternate context photo and directions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vicinity {
    pub description: Option<String>,
    pub image_filename: Option<Filename>,
}

impl Vicinity {
    /// Returns `true` when neither sub-field carries content.
    pub fn is_empty(&self) -> bool {
        self.description.as_deref().is_none_or(str::is_empty)
            && self.image_filename.as_deref().is_none_or(str::is_empty)
    }
}

/// A commemorated subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commemoration {
    pub title: String,
    /// Encyclopedia article about the subject, when one exists.
    pub article_url: Option<String>,
}

/// Index ordering keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKeys {
    /// Display title with a leading symbol and article removed.
    pub alpha: Option<String>,
    /// Digits of the entity id (`Q1234` → 1234).
    pub numeric: Option<u64>,
}

/// Aggregate for one entity, assembled across batches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: EntityId,
    pub coordinates: Coordinates,
    pub title: Localized<TitleText>,
    /// Title shown in the index list.
    pub index_title: Option<String>,
    pub inscription: Localized<String>,
    pub date: DateValue,
    pub image: ImageValue,
    pub location: Location,
    /// `None` until a batch reports vicinity data, and again after
    /// finalization when nothing was reported.
    pub vicinity: Option<Vicinity>,
    pub commemorates: Option<IndexMap<EntityId, Commemoration>>,
    /// Languages with localized content, in preference order.
    pub languages: Vec<LangCode>,
    pub sort_keys: SortKeys,
}

impl Record {
    /// Create an empty record for `id`.
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            coordinates: Coordinates::default(),
            title: Localized::Unset,
            index_title: None,
            inscription: Localized::Unset,
            date: DateValue::Unset,
            image: ImageValue::Unset,
            location: Location::default(),
            vicinity: None,
            commemorates: None,
            languages: Vec::new(),
            sort_keys: SortKeys::default(),
        }
    }

    /// Vicinity data, created empty on first use.
    pub fn vicinity_mut(&mut self) -> &mut Vicinity {
        self.vicinity.get_or_insert_with(Vicinity::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_collapse_to_mean_once() {
        let mut coords = Coordinates::default();
        assert_eq!(coords.collapse(), None);
        coords.push_sample(GeoPoint { lat: 14.0, lon: 121.0 });
        coords.push_sample(GeoPoint { lat: 14.2, lon: 121.2 });

        let point = coords.collapse().unwrap();
        assert!((point.lat - 14.1).abs() < 1e-9);
        assert!((point.lon - 121.1).abs() < 1e-9);
        assert!(!coords.push_sample(GeoPoint { lat: 0.0, lon: 0.0 }));
        assert_eq!(coords.collapse(), Some(point));
    }

    #[test]
    fn localized_set_is_idempotent_and_never_downgrades() {
        let mut field: Localized<String> = Localized::Unset;
        assert!(field.set("en", "Alpha".into()));
        assert!(!field.set("en", "Alpha".into()));
        assert!(!field.set_null("en"));
        assert_eq!(field.populated_count(), 1);

        assert!(field.set_null("tl"));
        assert!(field.set("tl", "Beta".into()));
        assert_eq!(field.populated_count(), 2);
        assert!(field.has_language("tl"));
    }

    #[test]
    fn localized_no_value_is_sticky() {
        let mut field: Localized<String> = Localized::Unset;
        field.set("en", "Alpha".into());
        assert!(field.set_no_value());
        assert!(!field.set("en", "Alpha".into()));
        assert!(!field.set_null("tl"));
        assert!(field.is_no_value());
        assert_eq!(field.populated_count(), 0);
    }

    #[test]
    fn vicinity_empty_check_treats_blank_strings_as_missing() {
        let mut vicinity = Vicinity::default();
        assert!(vicinity.is_empty());
        vicinity.description = Some(String::new());
        assert!(vicinity.is_empty());
        vicinity.image_filename = Some("Context.jpg".into());
        assert!(!vicinity.is_empty());
    }

    #[test]
    fn image_filenames_cover_every_shape() {
        let list = ImageValue::Positional(vec![Some("a.jpg".into()), None, Some("c.jpg".into())]);
        assert_eq!(list.filenames(), vec!["a.jpg", "c.jpg"]);
        assert!(ImageValue::Unset.filenames().is_empty());
    }
}

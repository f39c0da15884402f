use geo::{MultiPolygon, Point};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Region identifier after ingestion. Integral values always become `Code`,
/// so `"7"`, `"7.0"` and a JSON `7` all compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum RegionId {
    Code(i64),
    Label(String),
}

impl RegionId {
    /// Single normalisation point for identifiers coming from GeoJSON
    /// properties, workbook cells and request parameters.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(code) = trimmed.parse::<i64>() {
            return Some(RegionId::Code(code));
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(RegionId::Code(f as i64))
            }
            _ => Some(RegionId::Label(trimmed.to_string())),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Self::normalize(s),
            serde_json::Value::Number(n) => Self::normalize(&n.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionId::Code(code) => write!(f, "{}", code),
            RegionId::Label(label) => f.write_str(label),
        }
    }
}

impl FromStr for RegionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s).ok_or_else(|| "empty region identifier".to_string())
    }
}

impl<'de> Deserialize<'de> for RegionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RegionIdVisitor;

        impl<'de> Visitor<'de> for RegionIdVisitor {
            type Value = RegionId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a region identifier (integer or string)")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RegionId, E> {
                Ok(RegionId::Code(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RegionId, E> {
                i64::try_from(v)
                    .map(RegionId::Code)
                    .map_err(|_| E::custom("region code out of range"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<RegionId, E> {
                RegionId::normalize(&v.to_string()).ok_or_else(|| E::custom("invalid region code"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RegionId, E> {
                RegionId::normalize(v).ok_or_else(|| E::custom("empty region identifier"))
            }
        }

        deserializer.deserialize_any(RegionIdVisitor)
    }
}

/// For optional request fields: a missing, empty or all-blank value is
/// `None`, so `?region=` clears instead of failing to decode.
pub fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => T::deserialize(value).map(Some).map_err(de::Error::custom),
    }
}

/// One indicator cell. Absent, blank, non-numeric and NaN cells are all `NoData`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum IndicatorValue {
    Value(f64),
    #[default]
    NoData,
}

impl IndicatorValue {
    pub fn parse(cell: &str) -> Self {
        match cell.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => IndicatorValue::Value(v),
            _ => IndicatorValue::NoData,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            IndicatorValue::Value(v) => Some(*v),
            IndicatorValue::NoData => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, IndicatorValue::NoData)
    }
}

impl From<Option<f64>> for IndicatorValue {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => IndicatorValue::Value(v),
            _ => IndicatorValue::NoData,
        }
    }
}

// Serialized as a plain number or null.
impl Serialize for IndicatorValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

#[derive(Debug, Clone)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Region joined with the value of one indicator for one year.
#[derive(Debug, Clone)]
pub struct EnrichedRegion {
    pub id: RegionId,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub value: IndicatorValue,
    pub centroid: Option<Point<f64>>,
}

/// Map coordinate as reported by a pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl From<LngLat> for Point<f64> {
    fn from(c: LngLat) -> Self {
        Point::new(c.lng, c.lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_identifiers_normalize_to_codes() {
        assert_eq!(RegionId::normalize("7"), Some(RegionId::Code(7)));
        assert_eq!(RegionId::normalize(" 7.0 "), Some(RegionId::Code(7)));
        assert_eq!(
            RegionId::from_json(&serde_json::json!(7)),
            Some(RegionId::Code(7))
        );
        assert_eq!(
            RegionId::from_json(&serde_json::json!(7.0)),
            Some(RegionId::Code(7))
        );
    }

    #[test]
    fn other_identifiers_stay_labels() {
        assert_eq!(
            RegionId::normalize("IR-07"),
            Some(RegionId::Label("IR-07".to_string()))
        );
        assert_eq!(RegionId::normalize("7.5"), Some(RegionId::Label("7.5".to_string())));
        assert_eq!(RegionId::normalize("   "), None);
        assert_eq!(RegionId::from_json(&serde_json::Value::Null), None);
    }

    #[test]
    fn region_id_deserializes_from_strings_and_numbers() {
        let from_str: RegionId = serde_json::from_str("\"12\"").unwrap();
        let from_num: RegionId = serde_json::from_str("12").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "12");
    }

    #[derive(Deserialize)]
    struct Optional {
        #[serde(default, deserialize_with = "blank_as_none")]
        region: Option<RegionId>,
        #[serde(default, deserialize_with = "blank_as_none")]
        year: Option<String>,
    }

    #[test]
    fn blank_optional_fields_are_none() {
        let o: Optional = serde_json::from_str(r#"{"region":"  ","year":""}"#).unwrap();
        assert!(o.region.is_none());
        assert!(o.year.is_none());

        let o: Optional = serde_json::from_str(r#"{"region":null}"#).unwrap();
        assert!(o.region.is_none());
        assert!(o.year.is_none());

        let o: Optional = serde_json::from_str(r#"{"region":4,"year":"2020"}"#).unwrap();
        assert_eq!(o.region, Some(RegionId::Code(4)));
        assert_eq!(o.year.as_deref(), Some("2020"));
    }

    #[test]
    fn indicator_cells_parse_to_explicit_missing_marker() {
        assert_eq!(IndicatorValue::parse("3.5"), IndicatorValue::Value(3.5));
        assert_eq!(IndicatorValue::parse(""), IndicatorValue::NoData);
        assert_eq!(IndicatorValue::parse("n/a"), IndicatorValue::NoData);
        assert_eq!(IndicatorValue::parse("NaN"), IndicatorValue::NoData);
        assert_eq!(serde_json::to_string(&IndicatorValue::NoData).unwrap(), "null");
    }
}

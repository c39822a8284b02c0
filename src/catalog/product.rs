use crate::normalize::{Confidence, Problem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The smallest-unit quantity every volume is normalized into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    /// Countable items
    #[default]
    Units,
    Milligrams,
    Millilitres,
    Millimetres,
}

impl Measure {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Units => "units",
            Self::Milligrams => "milligrams",
            Self::Millilitres => "millilitres",
            Self::Millimetres => "millimetres",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "units" => Some(Self::Units),
            "milligrams" => Some(Self::Milligrams),
            "millilitres" => Some(Self::Millilitres),
            "millimetres" => Some(Self::Millimetres),
            _ => None,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// What a tag value describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Category,
    Brand,
}

/// A classification attached to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub value: String,
    pub kind: TagKind,
}

impl Tag {
    pub fn new(value: impl Into<String>, kind: TagKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }
}

/// A product record with typed quantities and prices
///
/// Prices are in minor currency units. `price` is what the active promotion
/// charges and `discount_amount` how many items that promotion covers.
///
/// # Invariants
///
/// - `discount_amount >= 1`
/// - `volume >= 1`
/// - `orig_price` equals `price` when the source has no original price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub identifier: String,
    pub name: String,
    pub tags: Vec<Tag>,
    pub price: i64,
    pub orig_price: i64,
    pub discount_amount: u32,
    pub volume: u64,
    pub volume_measure: Measure,
    pub valid_on: DateTime<Utc>,
}

/// A canonical product together with where it came from and how much the
/// interpretation of its fields can be trusted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedProduct {
    /// The feed URI the product was read from
    pub source_uri: String,

    /// Product image, when the feed lists one
    pub image_uri: Option<String>,

    pub product: CanonicalProduct,

    pub retrieved_on: DateTime<Utc>,

    pub confidence: Confidence,

    /// Fields that fell back to defaults, in order of detection
    pub problems: Vec<Problem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_roundtrip() {
        for measure in &[
            Measure::Units,
            Measure::Milligrams,
            Measure::Millilitres,
            Measure::Millimetres,
        ] {
            let db_str = measure.to_db_string();
            assert_eq!(Measure::from_db_string(db_str), Some(*measure));
        }
    }

    #[test]
    fn test_measure_default_is_units() {
        assert_eq!(Measure::default(), Measure::Units);
        assert_eq!(Measure::from_db_string("litres"), None);
    }

    #[test]
    fn test_tag_serializes_kind_lowercase() {
        let tag = Tag::new("zuivel", TagKind::Category);
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, r#"{"value":"zuivel","kind":"category"}"#);
    }
}

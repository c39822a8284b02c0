//! Normalization engine
//!
//! Pure functions that turn ambiguous supplier text into typed quantities:
//! - `interpret_unit`: free-text sizes such as "3 x 500 g"
//! - `interpret_measure`: structured volume plus supplier measure code
//! - `interpret_sticker`: promotional stickers such as "2 voor 3.00"
//! - `apply_mix_match`: the retailer's mix-and-match promotion fields
//! - `normalize_article`: a whole feed article into a `CanonicalProduct`
//!
//! None of these fail on unfamiliar text. They fall back to a default,
//! record a `Problem`, and lower the confidence of the result instead.

mod article;
mod assessment;
mod discount;
mod measure;
mod mix_match;
pub mod tables;
mod unit;

pub use article::{normalize_article, ArticleContext, NormalizedArticle};
pub use assessment::{Assessment, Confidence, Interpreted, Problem};
pub use discount::interpret_sticker;
pub use measure::interpret_measure;
pub use mix_match::{apply_mix_match, MixMatch};
pub use unit::interpret_unit;

use crate::catalog::Measure;

/// A product size in a canonical measure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity {
    pub volume: u64,
    pub measure: Measure,
}

impl Default for Quantity {
    fn default() -> Self {
        Self {
            volume: 1,
            measure: Measure::Units,
        }
    }
}

/// Promotional price and the number of items it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    /// Minor currency units
    pub price: i64,
    pub discount_amount: u32,
}

impl Pricing {
    pub fn single(price: i64) -> Self {
        Self {
            price,
            discount_amount: 1,
        }
    }
}

/// Largest volume a product record can carry
pub(crate) const MAX_VOLUME: u64 = i64::MAX as u64;

/// Rounds a scaled amount to a volume, rejecting zero and out-of-range sizes
pub(crate) fn to_volume(amount: f64) -> Option<u64> {
    let volume = amount.round();
    (volume.is_finite() && volume >= 1.0 && volume < MAX_VOLUME as f64).then_some(volume as u64)
}

/// Converts an amount in major currency units to minor units
pub(crate) fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Lowercases, trims and collapses whitespace
pub(crate) fn collapse(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units_rounds() {
        assert_eq!(to_minor_units(1.99), 199);
        assert_eq!(to_minor_units(0.1 + 0.2), 30);
        assert_eq!(to_minor_units(12.0), 1200);
    }

    #[test]
    fn test_to_volume_bounds() {
        assert_eq!(to_volume(1.4), Some(1));
        assert_eq!(to_volume(0.4), None);
        assert_eq!(to_volume(1e19), None);
        assert_eq!(to_volume(f64::INFINITY), None);
    }

    #[test]
    fn test_collapse() {
        assert_eq!(collapse("  Per   Stuk \n"), "per stuk");
        assert_eq!(collapse(""), "");
    }
}

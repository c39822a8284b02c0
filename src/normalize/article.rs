//! Feed article normalization
//!
//! Turns one JSON article from a product feed into a `CanonicalProduct`.
//! The steps run in a fixed order, each folding its assessment into the
//! record's:
//! 1. base price from `salePrice` / `originalPrice`
//! 2. mix-and-match promotion
//! 3. quantity, from `unitSize` text or the structured `volume` fields
//! 4. sticker
//! 5. invariants: at least one item per discount and a volume of one

use crate::catalog::{CanonicalProduct, Category, Tag, TagKind};
use crate::normalize::{
    apply_mix_match, interpret_measure, interpret_sticker, interpret_unit, to_minor_units,
    Assessment, Interpreted, MixMatch, Pricing, Quantity,
};
use crate::{StructuralError, StructuralResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Brand placeholder the retailer uses for its own label
const PLACEHOLDER_BRAND: &str = "-------";

/// Context shared by every article of one feed
#[derive(Debug, Clone, Copy)]
pub struct ArticleContext<'a> {
    /// Brand used for the retailer's own label
    pub default_brand: &'a str,
    /// The category whose feed the article came from
    pub category: Option<&'a Category>,
    /// When the feed was retrieved; becomes the product's `valid_on`
    pub retrieved_on: DateTime<Utc>,
}

/// A normalized article with its image and assessment
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedArticle {
    pub product: CanonicalProduct,
    pub image_uri: Option<String>,
    pub assessment: Assessment,
}

/// A feed value that may arrive as a number, as a string or as anything else
///
/// Optional fields accept every JSON type so that an odd value becomes a
/// problem note rather than a lost article.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedValue {
    Number(serde_json::Number),
    Text(String),
    Other(Value),
}

impl FeedValue {
    /// The value as text, when it is a number or a string
    fn as_text(&self) -> Option<String> {
        match self {
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.trim().to_string()),
            Self::Other(_) => None,
        }
    }

    /// The value as the supplier sent it, for problem notes
    fn raw(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
            Self::Other(v) => v.to_string(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().replace(',', ".").parse().ok(),
            Self::Other(_) => None,
        };
        value.filter(|v: &f64| v.is_finite())
    }

    /// A whole, non-negative count
    fn as_count(&self) -> Option<u32> {
        self.as_f64()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX))
            .map(|v| v as u32)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    article_number: FeedValue,
    name: String,
    brand: Option<Value>,
    sale_price: FeedValue,
    original_price: Option<FeedValue>,
    unit_size: Option<FeedValue>,
    volume: Option<FeedValue>,
    volume_measure: Option<Value>,
    sticker: Option<FeedValue>,
    mix_matched: Option<Value>,
    mix_match_button_type: Option<FeedValue>,
    mix_match_discount: Option<FeedValue>,
    mix_match_item_quantity: Option<FeedValue>,
    image_url: Option<Value>,
}

/// Reads `{"name": "..."}` objects, or a bare string, as a name
fn name_of(value: &Value) -> Option<&str> {
    value
        .as_str()
        .or_else(|| value.get("name").and_then(Value::as_str))
}

/// Reads a boolean flag that may also be sent as `"true"` or `"false"`
fn flag_of(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Null => Some(false),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Normalizes one feed article
///
/// # Arguments
///
/// * `raw` - The article's JSON object; it is only read
/// * `context` - Brand, category and retrieval time shared by the feed
///
/// # Returns
///
/// * `Ok(NormalizedArticle)` - Always produced when the required fields
///   (`articleNumber`, `name`, `salePrice`) are usable, possibly with low
///   confidence
/// * `Err(StructuralError)` - The article lacks a required field
pub fn normalize_article(
    raw: &Value,
    context: &ArticleContext<'_>,
) -> StructuralResult<NormalizedArticle> {
    let article = RawArticle::deserialize(raw)?;
    let mut assessment = Assessment::new();

    let identifier = article
        .article_number
        .as_text()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StructuralError::MissingField("articleNumber".to_string()))?;

    let brand = article
        .brand
        .as_ref()
        .and_then(name_of)
        .map(str::trim)
        .filter(|b| !b.is_empty() && *b != PLACEHOLDER_BRAND)
        .unwrap_or(context.default_brand);
    let name = format!("{} {}", brand, article.name.trim())
        .trim()
        .to_lowercase();

    let sale_price =
        article
            .sale_price
            .as_f64()
            .ok_or_else(|| StructuralError::InvalidField {
                field: "salePrice".to_string(),
                value: article.sale_price.raw(),
            })?;
    let price = to_minor_units(sale_price);
    let orig_price = match article.original_price.as_ref() {
        Some(original) => match original.as_f64() {
            Some(original) => to_minor_units(original),
            None => {
                assessment.flag("originalPrice", original.raw());
                price
            }
        },
        None => price,
    };

    let mut pricing = Pricing::single(price);

    let mix_matched = match article.mix_matched.as_ref().map(|v| (v, flag_of(v))) {
        Some((_, Some(enabled))) => enabled,
        Some((value, None)) => {
            assessment.flag("mixMatched", value.to_string());
            false
        }
        None => false,
    };
    if mix_matched {
        pricing = mix_match_pricing(&article, pricing).merge_into(&mut assessment);
    }

    let quantity = interpret_quantity(&article).merge_into(&mut assessment);

    if let Some(sticker) = article.sticker.as_ref() {
        pricing = interpret_sticker(&sticker.raw(), pricing, quantity).merge_into(&mut assessment);
    }

    let mut tags = Vec::new();
    if let Some(category) = context.category.filter(|c| !c.name.is_empty()) {
        tags.push(Tag::new(category.name.clone(), TagKind::Category));
    }
    tags.push(Tag::new(brand.to_lowercase(), TagKind::Brand));

    let product = CanonicalProduct {
        identifier,
        name,
        tags,
        price: pricing.price,
        orig_price,
        discount_amount: pricing.discount_amount.max(1),
        volume: quantity.volume.max(1),
        volume_measure: quantity.measure,
        valid_on: context.retrieved_on,
    };

    Ok(NormalizedArticle {
        product,
        image_uri: article
            .image_url
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        assessment,
    })
}

/// Applies the mix-and-match fields, or reports the one that is unusable
fn mix_match_pricing(article: &RawArticle, pricing: Pricing) -> Interpreted<Pricing> {
    let raw_discount = article.mix_match_discount.as_ref();
    let Some(discount) = raw_discount.and_then(FeedValue::as_f64) else {
        let raw = raw_discount.map(FeedValue::raw).unwrap_or_default();
        return Interpreted::fallback(pricing, "mixMatchDiscount", raw);
    };

    let quantity = match article.mix_match_item_quantity.as_ref() {
        Some(value) => match value.as_count() {
            Some(quantity) => Some(quantity),
            None => return Interpreted::fallback(pricing, "mixMatchItemQuantity", value.raw()),
        },
        None => None,
    };

    let kind = article
        .mix_match_button_type
        .as_ref()
        .map(FeedValue::raw)
        .unwrap_or_default();
    let promotion = MixMatch {
        kind: &kind,
        discount,
        quantity,
    };
    apply_mix_match(&promotion, pricing)
}

/// Free-text size wins over the structured fields when both are present
fn interpret_quantity(article: &RawArticle) -> Interpreted<Quantity> {
    if let Some(text) = article.unit_size.as_ref().map(FeedValue::raw).filter(|t| !t.is_empty()) {
        return interpret_unit(&text);
    }

    match (article.volume.as_ref(), article.volume_measure.as_ref()) {
        (Some(volume), Some(measure)) => match name_of(measure) {
            Some(code) => interpret_measure(&volume.raw(), code),
            None => Interpreted::fallback(Quantity::default(), "volumeMeasure", measure.to_string()),
        },
        _ => Interpreted::certain(Quantity::default()),
    }
}

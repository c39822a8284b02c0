//! Discount sticker interpretation
//!
//! Stickers are matched against `tables::STICKER_RULES` in order; the first
//! rule that matches decides the effect on the price.

use crate::catalog::Measure;
use crate::normalize::tables::{StickerEffect, STICKER_RULES};
use crate::normalize::{collapse, to_minor_units, Interpreted, Pricing, Quantity};
use regex::Captures;

const FIELD: &str = "sticker";

/// Applies a promotional sticker to a price
///
/// # Arguments
///
/// * `raw` - The sticker text, e.g. `"2 voor 3,00"` or `"25% korting"`
/// * `pricing` - The price before the sticker is applied
/// * `quantity` - The product size, used by per-weight stickers
///
/// # Returns
///
/// The adjusted pricing. Unrecognized stickers leave `pricing` untouched and
/// record a `sticker` problem with the text as the supplier wrote it.
pub fn interpret_sticker(raw: &str, pricing: Pricing, quantity: Quantity) -> Interpreted<Pricing> {
    let text = collapse(&raw.replace(',', "."));

    for rule in STICKER_RULES {
        let Some(caps) = rule.pattern.captures(&text) else {
            continue;
        };
        tracing::trace!("Sticker '{}' matched rule {}", text, rule.name);

        return match apply(rule.effect, &caps, pricing, quantity) {
            Some(adjusted) => Interpreted::certain(adjusted),
            None => Interpreted::fallback(pricing, FIELD, raw.trim()),
        };
    }

    Interpreted::fallback(pricing, FIELD, raw.trim())
}

fn apply(
    effect: StickerEffect,
    caps: &Captures<'_>,
    pricing: Pricing,
    quantity: Quantity,
) -> Option<Pricing> {
    match effect {
        StickerEffect::NoChange => Some(pricing),
        StickerEffect::CombinationPrice => {
            let amount = caps[1].parse::<u32>().ok().filter(|n| *n > 0)?;
            let price = currency(caps, 2, 3)?;
            Some(Pricing {
                price,
                discount_amount: amount,
            })
        }
        StickerEffect::PricePer100Gram => {
            if quantity.measure != Measure::Milligrams {
                return None;
            }
            let per_100_gram = currency(caps, 1, 2)?;
            let price = (per_100_gram as f64 * quantity.volume as f64 / 100_000.0).round() as i64;
            Some(Pricing { price, ..pricing })
        }
        StickerEffect::FixedPrice => {
            let price = currency(caps, 1, 2)?;
            Some(Pricing { price, ..pricing })
        }
        StickerEffect::PercentOff => {
            let percent = caps[1].parse::<f64>().ok().filter(|p| *p <= 100.0)?;
            let price = (pricing.price as f64 * (100.0 - percent) / 100.0).round() as i64;
            Some(Pricing { price, ..pricing })
        }
        StickerEffect::OnePlusOneFree => Some(Pricing {
            price: (pricing.price as f64 * 0.5).round() as i64,
            discount_amount: 2,
        }),
        StickerEffect::TwoPlusOneFree => Some(Pricing {
            price: (pricing.price as f64 * 1.5).round() as i64,
            discount_amount: 3,
        }),
    }
}

/// Assembles `whole.fraction` from two capture groups into minor units
fn currency(caps: &Captures<'_>, whole: usize, fraction: usize) -> Option<i64> {
    let whole = caps.get(whole)?.as_str();
    let amount = match caps.get(fraction) {
        Some(fraction) => format!("{}.{}", whole, fraction.as_str()),
        None => whole.to_string(),
    };
    amount.parse::<f64>().ok().map(to_minor_units)
}

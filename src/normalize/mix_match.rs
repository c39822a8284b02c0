use crate::normalize::{to_minor_units, Interpreted, Pricing};

/// The mix-and-match promotion fields of a feed article
#[derive(Debug, Clone, PartialEq)]
pub struct MixMatch<'a> {
    /// `mixMatchButtonType`, e.g. `"FIXED_PRICE"`
    pub kind: &'a str,
    /// `mixMatchDiscount`: a price in major units or a percentage,
    /// depending on `kind`
    pub discount: f64,
    /// `mixMatchItemQuantity`
    pub quantity: Option<u32>,
}

/// Applies a mix-and-match promotion to a price
///
/// | kind                   | effect                                     |
/// |------------------------|--------------------------------------------|
/// | `FIXED_PRICE`          | price becomes the discount                 |
/// | `QUANTITY_FIXED_PRICE` | `quantity` items for the discount together |
/// | `PERCENT`              | price scaled by discount percent           |
/// | `TWO_BUY_ONE_PAY`      | price scaled by discount percent           |
/// | empty, discount 100    | no change                                  |
///
/// Other kinds leave the price alone and report `mixMatchButtonType`.
pub fn apply_mix_match(promotion: &MixMatch<'_>, pricing: Pricing) -> Interpreted<Pricing> {
    match promotion.kind {
        "FIXED_PRICE" => Interpreted::certain(Pricing {
            price: to_minor_units(promotion.discount),
            ..pricing
        }),
        "QUANTITY_FIXED_PRICE" => match promotion.quantity.filter(|q| *q > 0) {
            Some(quantity) => Interpreted::certain(Pricing {
                price: (promotion.discount * 100.0 / quantity as f64).round() as i64,
                discount_amount: quantity,
            }),
            None => missing_quantity(promotion, pricing),
        },
        "PERCENT" | "TWO_BUY_ONE_PAY" => match promotion.quantity.filter(|q| *q > 0) {
            Some(quantity) => Interpreted::certain(Pricing {
                price: (pricing.price as f64 * promotion.discount / 100.0).round() as i64,
                discount_amount: quantity,
            }),
            None => missing_quantity(promotion, pricing),
        },
        // The retailer marks some plain articles as mix-matched at 100%
        "" if promotion.discount == 100.0 => Interpreted::certain(pricing),
        other => Interpreted::fallback(pricing, "mixMatchButtonType", other),
    }
}

fn missing_quantity(promotion: &MixMatch<'_>, pricing: Pricing) -> Interpreted<Pricing> {
    let value = promotion
        .quantity
        .map(|q| q.to_string())
        .unwrap_or_default();
    Interpreted::fallback(pricing, "mixMatchItemQuantity", value)
}

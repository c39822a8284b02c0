use crate::catalog::Measure;
use crate::normalize::tables::{
    is_countable_noun, is_non_quantity_noun, unit_scale, RE_COUNTED, RE_MAGNITUDE, RE_MULTIPLIER,
    RE_PER_ITEM,
};
use crate::normalize::{collapse, to_volume, Interpreted, Quantity, MAX_VOLUME};

const FIELD: &str = "unit";

/// Interprets a free-text product size
///
/// Recognized forms, tried in order:
/// 1. `N x rest`: `rest` is interpreted and its volume multiplied by `N`
/// 2. per-item idioms (`per stuk`, `per bos`, `2 personen`, ...): the default
///    of one unit
/// 3. `N noun` with a countable noun (`12 stuks`): `N` units. Nouns that
///    count something else (`40 wasbeurten`) keep the default
/// 4. magnitude plus unit (`500 g`, `1,5 l`, `30 cm`): scaled into
///    milligrams, millilitres or millimetres
///
/// Anything else, or a size that comes out as zero or too large to store,
/// yields the default with a `unit` problem naming the supplier's text.
///
/// # Arguments
///
/// * `raw` - The supplier's size text
///
/// # Returns
///
/// The interpreted quantity; never fails
pub fn interpret_unit(raw: &str) -> Interpreted<Quantity> {
    let text = collapse(&raw.replace(',', "."));
    match recognize(&text) {
        Some(quantity) => Interpreted::certain(quantity),
        None => Interpreted::fallback(Quantity::default(), FIELD, raw.trim()),
    }
}

/// Matches normalized text against the known size forms
fn recognize(text: &str) -> Option<Quantity> {
    if let Some(caps) = RE_MULTIPLIER.captures(text) {
        let inner = recognize(&caps[2])?;
        let count = caps[1].parse::<u64>().ok()?;
        let volume = inner.volume.checked_mul(count).filter(|v| (1..=MAX_VOLUME).contains(v))?;
        return Some(Quantity {
            volume,
            measure: inner.measure,
        });
    }

    if RE_PER_ITEM.is_match(text) {
        return Some(Quantity::default());
    }

    if let Some(caps) = RE_COUNTED.captures(text) {
        let noun = &caps[2];
        if is_countable_noun(noun) {
            if let Some(count) = caps[1]
                .parse::<u64>()
                .ok()
                .filter(|n| (1..=MAX_VOLUME).contains(n))
            {
                return Some(Quantity {
                    volume: count,
                    measure: Measure::Units,
                });
            }
        } else if is_non_quantity_noun(noun) {
            return Some(Quantity::default());
        }
    }

    let caps = RE_MAGNITUDE.captures(text)?;
    let scale = unit_scale(&caps[2])?;
    let magnitude = caps[1].parse::<f64>().ok()?;
    Some(Quantity {
        volume: to_volume(magnitude * scale.multiplier)?,
        measure: scale.measure,
    })
}

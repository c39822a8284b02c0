use crate::normalize::tables::measure_code_scale;
use crate::normalize::{to_volume, Interpreted, Quantity};

/// Interprets a structured volume with a supplier measure code
///
/// `volume` is the numeric amount as text (`"0.5"`, `"250"`) and `code` the
/// supplier's unit code (`"KILOGRAM"`, `"CENTILTR"`). An unknown code is
/// reported under `volumeMeasure`; an unparsable, zero or oversized amount
/// under `volume`. Either way the default quantity is returned.
pub fn interpret_measure(volume: &str, code: &str) -> Interpreted<Quantity> {
    let code = code.trim();
    let Some(scale) = measure_code_scale(code) else {
        return Interpreted::fallback(Quantity::default(), "volumeMeasure", code);
    };

    let amount = volume.trim().replace(',', ".");
    let scaled = amount
        .parse::<f64>()
        .ok()
        .and_then(|v| to_volume(v * scale.multiplier));

    match scaled {
        Some(volume) => Interpreted::certain(Quantity {
            volume,
            measure: scale.measure,
        }),
        None => Interpreted::fallback(Quantity::default(), "volume", volume.trim()),
    }
}

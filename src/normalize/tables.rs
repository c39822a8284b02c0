//! Measure and pattern tables
//!
//! Process-wide, immutable lookup data for the normalization engine:
//! - unit abbreviations and their scale into a canonical measure
//! - supplier measure codes used by structured feed fields
//! - countable nouns that do or do not describe a product quantity
//! - the ordered list of discount sticker patterns
//!
//! Everything here is built once on first use.

use crate::catalog::Measure;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// How one supplier unit converts into a canonical measure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    pub multiplier: f64,
    pub measure: Measure,
}

const fn scale(multiplier: f64, measure: Measure) -> UnitScale {
    UnitScale {
        multiplier,
        measure,
    }
}

/// Unit abbreviations as they appear in free-text quantities
static UNIT_ABBREVIATIONS: LazyLock<HashMap<&'static str, UnitScale>> = LazyLock::new(|| {
    HashMap::from([
        ("mg", scale(1.0, Measure::Milligrams)),
        ("g", scale(1_000.0, Measure::Milligrams)),
        ("gr", scale(1_000.0, Measure::Milligrams)),
        ("gram", scale(1_000.0, Measure::Milligrams)),
        ("kg", scale(1_000_000.0, Measure::Milligrams)),
        ("kilo", scale(1_000_000.0, Measure::Milligrams)),
        ("kilogram", scale(1_000_000.0, Measure::Milligrams)),
        ("ml", scale(1.0, Measure::Millilitres)),
        ("cl", scale(10.0, Measure::Millilitres)),
        ("dl", scale(100.0, Measure::Millilitres)),
        ("l", scale(1_000.0, Measure::Millilitres)),
        ("lt", scale(1_000.0, Measure::Millilitres)),
        ("ltr", scale(1_000.0, Measure::Millilitres)),
        ("liter", scale(1_000.0, Measure::Millilitres)),
        ("litre", scale(1_000.0, Measure::Millilitres)),
        ("mm", scale(1.0, Measure::Millimetres)),
        ("cm", scale(10.0, Measure::Millimetres)),
        ("m", scale(1_000.0, Measure::Millimetres)),
        ("meter", scale(1_000.0, Measure::Millimetres)),
    ])
});

/// Supplier measure codes from structured `volumeMeasure` fields
static MEASURE_CODES: LazyLock<HashMap<&'static str, UnitScale>> = LazyLock::new(|| {
    HashMap::from([
        ("DOZIJN", scale(12.0, Measure::Units)),
        ("GROS", scale(144.0, Measure::Units)),
        ("STUK", scale(1.0, Measure::Units)),
        ("Diversen", scale(1.0, Measure::Units)),
        ("PLAK", scale(1.0, Measure::Units)),
        ("PUNT(EN)", scale(1.0, Measure::Units)),
        ("ROL(LEN)", scale(1.0, Measure::Units)),
        ("MILIGRAM", scale(1.0, Measure::Milligrams)),
        ("GRAM", scale(1_000.0, Measure::Milligrams)),
        ("HECTOGRM", scale(100_000.0, Measure::Milligrams)),
        ("KILOGRAM", scale(1_000_000.0, Measure::Milligrams)),
        ("TON", scale(1_000_000_000.0, Measure::Milligrams)),
        ("POND", scale(500_000.0, Measure::Milligrams)),
        ("ONS", scale(100_000.0, Measure::Milligrams)),
        ("MILIMETR", scale(1.0, Measure::Millimetres)),
        ("CENTIMTR", scale(10.0, Measure::Millimetres)),
        ("DECIMETR", scale(100.0, Measure::Millimetres)),
        ("METER", scale(1_000.0, Measure::Millimetres)),
        ("KILOMETR", scale(1_000_000.0, Measure::Millimetres)),
        ("MILILITR", scale(1.0, Measure::Millilitres)),
        ("CENTILTR", scale(10.0, Measure::Millilitres)),
        ("DECILITR", scale(100.0, Measure::Millilitres)),
        ("LITER", scale(1_000.0, Measure::Millilitres)),
        ("DECALITR", scale(10_000.0, Measure::Millilitres)),
        ("HECTOLTR", scale(100_000.0, Measure::Millilitres)),
    ])
});

/// Nouns that count the product itself ("12 stuks", "4 rollen")
const COUNTABLE_NOUNS: &[&str] = &[
    "stuk",
    "stuks",
    "stuk(s)",
    "st",
    "rol",
    "rollen",
    "rol(len)",
    "plak",
    "plakken",
    "tros",
    "bol",
    "bollen",
    "blik",
    "blikken",
    "fles",
    "flessen",
    "pak",
    "pakken",
    "zakje",
    "zakjes",
    "zakje(s)",
    "tablet",
    "tabletten",
    "capsule",
    "capsules",
    "sachet",
    "sachets",
    "paar",
    "eieren",
    "doekjes",
];

/// Nouns that count something other than the product ("40 wasbeurten");
/// these leave the quantity at its default without being a problem
const NON_QUANTITY_NOUNS: &[&str] = &[
    "wasbeurt",
    "wasbeurten",
    "portie",
    "porties",
    "kopjes",
    "koppen",
    "glazen",
    "scoops",
    "keer",
];

pub fn unit_scale(abbreviation: &str) -> Option<UnitScale> {
    UNIT_ABBREVIATIONS.get(abbreviation).copied()
}

pub fn measure_code_scale(code: &str) -> Option<UnitScale> {
    MEASURE_CODES.get(code).copied()
}

pub fn is_countable_noun(word: &str) -> bool {
    COUNTABLE_NOUNS.contains(&word)
}

pub fn is_non_quantity_noun(word: &str) -> bool {
    NON_QUANTITY_NOUNS.contains(&word)
}

// ===== Free-text quantity patterns =====

pub static RE_MULTIPLIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*x\s*(.+)$").expect("valid multiplier regex"));

pub static RE_PER_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:per (?:stuk|krop|bos|doos|set|bak|zak|tros|pakket)|los|\d+ (?:persoon|personen))$")
        .expect("valid per-item regex")
});

pub static RE_COUNTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*([a-z()]+)$").expect("valid counted regex"));

pub static RE_MAGNITUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:ca\.?\s*)?(\d+(?:\.\d+)?)\s*([a-z]+)\.?$").expect("valid magnitude regex")
});

// ===== Sticker patterns =====

/// What a matched sticker does to the price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickerEffect {
    /// Generic sale marker, no price change
    NoChange,
    /// "N voor P.F": N items for a combined price
    CombinationPrice,
    /// "P.F per 100 gram": price scaled by weight
    PricePer100Gram,
    /// "nu voor P.F": a fixed price
    FixedPrice,
    /// "N% korting"
    PercentOff,
    /// "1 + 1 gratis"
    OnePlusOneFree,
    /// "2 + 1 gratis"
    TwoPlusOneFree,
}

pub struct StickerRule {
    pub name: &'static str,
    pub pattern: &'static LazyLock<Regex>,
    pub effect: StickerEffect,
}

static RE_STICKER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:actie|aanbieding|bonus|sale|korting|per 100\s?g(?:ram)?)?$")
        .expect("valid sale marker regex")
});

static RE_STICKER_COMBINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+) voor (?:€\s?)?(\d+)(?:\.(\d{1,2}))?$").expect("valid combination regex")
});

static RE_STICKER_PER_100_GRAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:€\s?)?(\d+)(?:\.(\d{1,2}))? per 100\s?g(?:ram)?$")
        .expect("valid per 100 gram regex")
});

static RE_STICKER_FIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^nu voor (?:€\s?)?(\d+)(?:\.(\d{1,2}))?$").expect("valid fixed price regex")
});

static RE_STICKER_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:probeer )?(\d+(?:\.\d+)?)\s?% korting$").expect("valid percent regex")
});

static RE_STICKER_ONE_PLUS_ONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1\s?\+\s?1 gratis$").expect("valid 1+1 regex"));

static RE_STICKER_TWO_PLUS_ONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^2\s?\+\s?1 gratis$").expect("valid 2+1 regex"));

/// Sticker rules in priority order; the first match wins
pub static STICKER_RULES: &[StickerRule] = &[
    StickerRule {
        name: "marker",
        pattern: &RE_STICKER_MARKER,
        effect: StickerEffect::NoChange,
    },
    StickerRule {
        name: "combination",
        pattern: &RE_STICKER_COMBINATION,
        effect: StickerEffect::CombinationPrice,
    },
    StickerRule {
        name: "per-100-gram",
        pattern: &RE_STICKER_PER_100_GRAM,
        effect: StickerEffect::PricePer100Gram,
    },
    StickerRule {
        name: "fixed",
        pattern: &RE_STICKER_FIXED,
        effect: StickerEffect::FixedPrice,
    },
    StickerRule {
        name: "percent",
        pattern: &RE_STICKER_PERCENT,
        effect: StickerEffect::PercentOff,
    },
    StickerRule {
        name: "one-plus-one",
        pattern: &RE_STICKER_ONE_PLUS_ONE,
        effect: StickerEffect::OnePlusOneFree,
    },
    StickerRule {
        name: "two-plus-one",
        pattern: &RE_STICKER_TWO_PLUS_ONE,
        effect: StickerEffect::TwoPlusOneFree,
    },
];

//! Confidence tracking for field interpretation
//!
//! Every interpretation step returns an `Interpreted<T>`: the value it
//! settled on plus an `Assessment` of how sure it is. An assessment can only
//! be downgraded, so folding several steps together never raises confidence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How far an automatic interpretation can be trusted
///
/// Ordered so that `Low < Neutral`; combining two confidences takes the
/// minimum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// At least one field fell back to a default
    Low,

    /// Every field was recognized
    #[default]
    Neutral,
}

impl Confidence {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Neutral => "neutral",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

/// A field/value pair that could not be interpreted confidently
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Problem {
    pub field: String,
    pub value: String,
}

impl Problem {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unclear '{}' with value '{}'", self.field, self.value)
    }
}

/// Accumulated confidence and problems for one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assessment {
    confidence: Confidence,
    problems: Vec<Problem>,
}

impl Assessment {
    /// Creates an assessment with neutral confidence and no problems
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn is_confident(&self) -> bool {
        self.confidence == Confidence::Neutral
    }

    /// Records a problem and downgrades confidence to `Low`
    pub fn flag(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.problems.push(Problem::new(field, value));
        self.confidence = Confidence::Low;
    }

    /// Folds another assessment into this one
    ///
    /// Problems are appended in order and confidence becomes the lower of
    /// the two.
    pub fn absorb(&mut self, other: Assessment) {
        self.confidence = self.confidence.min(other.confidence);
        self.problems.extend(other.problems);
    }

    pub fn into_parts(self) -> (Confidence, Vec<Problem>) {
        (self.confidence, self.problems)
    }
}

/// A value produced by an interpretation step, with its assessment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreted<T> {
    pub value: T,
    pub assessment: Assessment,
}

impl<T> Interpreted<T> {
    /// A value that was recognized without guessing
    pub fn certain(value: T) -> Self {
        Self {
            value,
            assessment: Assessment::new(),
        }
    }

    /// A fallback value, recorded with the field and raw text that could not
    /// be interpreted
    pub fn fallback(value: T, field: impl Into<String>, raw: impl Into<String>) -> Self {
        let mut assessment = Assessment::new();
        assessment.flag(field, raw);
        Self { value, assessment }
    }

    pub fn confidence(&self) -> Confidence {
        self.assessment.confidence()
    }

    pub fn problems(&self) -> &[Problem] {
        self.assessment.problems()
    }

    /// Moves the value out, folding its assessment into `into`
    pub fn merge_into(self, into: &mut Assessment) -> T {
        into.absorb(self.assessment);
        self.value
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Interpreted<U> {
        Interpreted {
            value: f(self.value),
            assessment: self.assessment,
        }
    }
}

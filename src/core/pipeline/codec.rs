//! String ⇄ number codec for values typed into text inputs.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::core::issues::FieldCode;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").expect("static regex"));

/// Decode a numeric literal (`-?digits[.digits]`). Anything else, including
/// exponents and surrounding whitespace, is `invalid_type`.
pub fn decode(raw: &str) -> Result<f64, FieldCode> {
    if !NUMBER.is_match(raw) {
        return Err(FieldCode::InvalidType);
    }
    raw.parse::<f64>().map_err(|_| FieldCode::InvalidType)
}

/// Canonical decimal form. The output always decodes back to `value`.
pub fn encode(value: f64) -> String {
    value.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    Inclusive(f64),
    Exclusive(f64),
}

/// Constraint applied after decoding a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberRule {
    integer: bool,
    min: Option<Bound>,
    max: Option<Bound>,
}

impl NumberRule {
    pub const fn number() -> Self {
        Self {
            integer: false,
            min: None,
            max: None,
        }
    }

    pub const fn integer() -> Self {
        Self {
            integer: true,
            min: None,
            max: None,
        }
    }

    pub const fn at_least(mut self, min: f64) -> Self {
        self.min = Some(Bound::Inclusive(min));
        self
    }

    pub const fn greater_than(mut self, min: f64) -> Self {
        self.min = Some(Bound::Exclusive(min));
        self
    }

    pub const fn at_most(mut self, max: f64) -> Self {
        self.max = Some(Bound::Inclusive(max));
        self
    }

    /// Decode `raw` and apply the rule. Type problems are reported before
    /// range problems, and the lower bound before the upper.
    pub fn check(&self, raw: &str) -> Result<f64, FieldCode> {
        let value = decode(raw)?;

        if self.integer && value.fract() != 0.0 {
            return Err(FieldCode::InvalidType);
        }

        match self.min {
            Some(Bound::Inclusive(min)) if value < min => return Err(FieldCode::TooSmall),
            Some(Bound::Exclusive(min)) if value <= min => return Err(FieldCode::TooSmall),
            _ => {}
        }

        match self.max {
            Some(Bound::Inclusive(max)) if value > max => return Err(FieldCode::TooBig),
            Some(Bound::Exclusive(max)) if value >= max => return Err(FieldCode::TooBig),
            _ => {}
        }

        Ok(value)
    }
}

pub const NON_NEGATIVE_INT: NumberRule = NumberRule::integer().at_least(0.0);
pub const POSITIVE_INT: NumberRule = NumberRule::integer().at_least(1.0);
pub const UNIT_INTERVAL: NumberRule = NumberRule::number().at_least(0.0).at_most(1.0);
pub const PROBABILITY: NumberRule = NumberRule::number().greater_than(0.0).at_most(1.0);

/// Accept either a JSON string or a JSON number for a form field; numbers are
/// re-encoded through [`encode`].
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => encode(number),
    })
}

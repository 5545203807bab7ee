//! Purchasable units and their prices.
//!
//! A product is sold in one or more units (`"1kg"`, `"500g"`, `"1 dozen"`).
//! On the wire each unit is a single-key object mapping the unit label to a
//! price: `[{"1kg": 50}, {"500g": "30"}]`.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::price::Price;

/// Label of the placeholder unit used when a product has no valid rates.
pub const DEFAULT_UNIT: &str = "default";

/// Errors that can occur when parsing a rate option.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RateError {
    /// The rate entry is not a JSON object.
    #[error("rate entry must be an object")]
    NotAnObject,
    /// The rate entry has zero or several keys.
    #[error("rate entry must have exactly one unit, found {0}")]
    KeyCount(usize),
    /// The unit label is empty.
    #[error("rate unit cannot be empty")]
    EmptyUnit,
    /// The price is not a finite number.
    #[error("rate price for {unit} is invalid: {reason}")]
    InvalidPrice {
        /// Unit label.
        unit: String,
        /// Parse failure.
        reason: String,
    },
}

/// Unit label identifying one purchasable denomination of a product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitKey(String);

impl UnitKey {
    /// Create a unit key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The placeholder unit (`"default"`).
    #[must_use]
    pub fn placeholder() -> Self {
        Self(DEFAULT_UNIT.to_owned())
    }

    /// The unit label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key is the placeholder or blank, i.e. not a real unit.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        let key = self.0.trim();
        key.is_empty() || key == DEFAULT_UNIT
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

/// One validated rate option of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateOption {
    /// Unit label.
    pub unit: UnitKey,
    /// Price of one unit.
    pub price: Price,
}

impl RateOption {
    /// Create a rate option.
    #[must_use]
    pub fn new(unit: impl Into<String>, price: Price) -> Self {
        Self {
            unit: UnitKey::new(unit),
            price,
        }
    }

    /// Parse one wire rate entry (`{"1kg": 50}`).
    ///
    /// # Errors
    ///
    /// Returns a [`RateError`] unless the entry is a single-key object whose
    /// value parses to a finite number.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, RateError> {
        let map = value.as_object().ok_or(RateError::NotAnObject)?;
        if map.len() != 1 {
            return Err(RateError::KeyCount(map.len()));
        }
        let Some((unit, raw)) = map.iter().next() else {
            return Err(RateError::KeyCount(0));
        };
        if unit.trim().is_empty() {
            return Err(RateError::EmptyUnit);
        }
        let price = Price::from_json(raw).map_err(|e| RateError::InvalidPrice {
            unit: unit.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(unit.clone(), price))
    }

    /// Serialize back to the wire form.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            self.unit.as_str().to_owned(),
            serde_json::to_value(self.price).unwrap_or(serde_json::Value::Null),
        );
        serde_json::Value::Object(map)
    }

    /// The selection this option represents.
    #[must_use]
    pub fn selection(&self) -> RateSelection {
        RateSelection {
            key: self.unit.clone(),
            value: self.price,
        }
    }
}

/// Keep the valid entries of a wire rate list, in order.
#[must_use]
pub fn parse_rates(values: &[serde_json::Value]) -> Vec<RateOption> {
    values
        .iter()
        .filter_map(|v| RateOption::from_json(v).ok())
        .collect()
}

/// A unit chosen by the user, with its unit price.
///
/// Serialized as `{"key": "1kg", "value": 50}`, the shape the cart endpoints
/// use for `selectedRate` and `currentRate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSelection {
    /// Unit label.
    pub key: UnitKey,
    /// Unit price.
    pub value: Price,
}

impl RateSelection {
    /// Create a selection.
    #[must_use]
    pub fn new(key: impl Into<String>, value: Price) -> Self {
        Self {
            key: UnitKey::new(key),
            value,
        }
    }

    /// The placeholder selection `{key: "default", value: 0}`.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            key: UnitKey::placeholder(),
            value: Price::ZERO,
        }
    }

    /// Whether this selection names a real unit.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.key.is_placeholder()
    }
}

//! Type-safe price representation using decimal arithmetic.
//!
//! The backend sends prices as JSON numbers and, for some older rows, as
//! numeric strings (`"30"`, `"49.50"`). Both forms deserialize into [`Price`];
//! anything that is not a finite number is rejected.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Sub};

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input was not a number.
    #[error("not a number: {0}")]
    NotANumber(String),
    /// The input was NaN or infinite.
    #[error("price must be finite")]
    NotFinite,
}

/// A monetary amount in the store currency (INR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from whole rupees.
    #[must_use]
    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Parse a price from a float, rejecting NaN and infinities.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotFinite`] for NaN or infinite input.
    pub fn from_f64(value: f64) -> Result<Self, PriceError> {
        if !value.is_finite() {
            return Err(PriceError::NotFinite);
        }
        Decimal::from_f64(value)
            .map(|d| Self(d.normalize()))
            .ok_or(PriceError::NotFinite)
    }

    /// Parse a price from a numeric string such as `"49.50"`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotANumber`] if the string is not a decimal number.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        s.trim()
            .parse::<Decimal>()
            .map(Self)
            .map_err(|_| PriceError::NotANumber(s.to_owned()))
    }

    /// Parse a price from a JSON value (number or numeric string).
    ///
    /// # Errors
    ///
    /// Returns an error for any other JSON type or a non-finite number.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PriceError> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Self::from_rupees(i));
                }
                n.as_f64()
                    .ok_or_else(|| PriceError::NotANumber(n.to_string()))
                    .and_then(Self::from_f64)
            }
            serde_json::Value::String(s) => Self::parse(s),
            other => Err(PriceError::NotANumber(other.to_string())),
        }
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price multiplied by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Amount as `f64` for the wire format.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{:.2}", self.0)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract().is_zero()
            && let Some(whole) = self.0.to_i64()
        {
            return serializer.serialize_i64(whole);
        }
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_price_from_number_and_string() {
        let a: Price = serde_json::from_str("50").unwrap();
        let b: Price = serde_json::from_str("\"50\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Price::from_rupees(50));
    }

    #[test]
    fn test_price_rejects_garbage() {
        assert!(serde_json::from_str::<Price>("\"abc\"").is_err());
        assert!(serde_json::from_str::<Price>("null").is_err());
        assert!(Price::from_f64(f64::NAN).is_err());
        assert!(Price::from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_times_and_sum() {
        let p = Price::parse("49.50").unwrap();
        assert_eq!(p.times(2), Price::parse("99").unwrap());
        let total: Price = [Price::from_rupees(10), Price::from_rupees(5)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_rupees(15));
    }

    #[test]
    fn test_serialize_whole_as_integer() {
        assert_eq!(serde_json::to_string(&Price::from_rupees(30)).unwrap(), "30");
        assert_eq!(
            serde_json::to_string(&Price::parse("12.5").unwrap()).unwrap(),
            "12.5"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_rupees(100).to_string(), "₹100.00");
    }
}

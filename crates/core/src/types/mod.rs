//! Core types for Freshmart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod rate;
pub mod status;

pub use id::*;
pub use price::{Price, PriceError};
pub use rate::{DEFAULT_UNIT, RateError, RateOption, RateSelection, UnitKey, parse_rates};
pub use status::{OrderAction, OrderStatus};

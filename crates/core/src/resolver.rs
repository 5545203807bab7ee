//! Rate/unit resolution for product cards and detail pages.
//!
//! Every view that shows an "Add to Cart" control asks the same question:
//! which unit should appear selected? The answer is the unit already in the
//! cart for that product, otherwise the first valid rate option.

use crate::cart::{Cart, CartLine};
use crate::catalog::Product;
use crate::types::{RateOption, RateSelection, parse_rates};

/// Selected unit plus whether the add-to-cart control is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Unit to show as selected.
    pub selection: RateSelection,
    /// Whether adding to cart is possible.
    pub can_add: bool,
}

impl Resolution {
    fn placeholder() -> Self {
        Self {
            selection: RateSelection::placeholder(),
            can_add: false,
        }
    }
}

/// Resolve the selected unit from validated rate options.
///
/// If `existing` names a unit still offered in `rates`, that unit is chosen
/// with its current price; otherwise the first option. An empty list yields
/// `{key: "default", value: 0}` with adding disabled.
#[must_use]
pub fn resolve(rates: &[RateOption], existing: Option<&CartLine>) -> Resolution {
    let matched = existing.and_then(|line| rates.iter().find(|r| r.unit == line.rate.key));
    matched
        .or_else(|| rates.first())
        .map_or_else(Resolution::placeholder, |rate| Resolution {
            selection: rate.selection(),
            can_add: true,
        })
}

/// Resolve from a raw wire rate list, dropping invalid entries first.
#[must_use]
pub fn resolve_raw(rates: &[serde_json::Value], existing: Option<&CartLine>) -> Resolution {
    resolve(&parse_rates(rates), existing)
}

/// Resolve for a product against the current cart.
///
/// When the product has several lines in the cart the first one in cart
/// order wins.
#[must_use]
pub fn resolve_for_product(product: &Product, cart: &Cart) -> Resolution {
    resolve(&product.rates, cart.lines_for(&product.id).next())
}

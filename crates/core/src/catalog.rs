//! Catalog entities read from the backend.
//!
//! Products, categories and delivery centres are immutable from the client's
//! point of view: fetched, displayed, never mutated locally.

use crate::types::{CategoryId, DeliveryCentreId, ProductId, RateOption};

/// Category reference carried by a product.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryRef {
    /// Category id, when the product document links one.
    pub id: Option<CategoryId>,
    /// Display label.
    pub name: String,
}

/// A product in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Product id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Category reference.
    pub category: CategoryRef,
    /// Valid rate options in list order.
    pub rates: Vec<RateOption>,
    /// Units in stock.
    pub stock: i64,
    /// Whether the product is listed.
    pub active: bool,
    /// Image references (URLs or storage keys).
    pub images: Vec<String>,
}

impl Product {
    /// First image reference, used for cart display.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whether the product can currently be bought.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.active && self.stock > 0 && !self.rates.is_empty()
    }

    /// Look up the rate option for a unit label.
    #[must_use]
    pub fn rate_for(&self, unit: &str) -> Option<&RateOption> {
        self.rates.iter().find(|r| r.unit.as_str() == unit)
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Category id.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Optional image reference.
    pub image: Option<String>,
    /// Whether the category is listed.
    pub active: bool,
}

/// A delivery centre customers can pick at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryCentre {
    /// Centre id.
    pub id: DeliveryCentreId,
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Whether the centre accepts orders.
    pub active: bool,
}

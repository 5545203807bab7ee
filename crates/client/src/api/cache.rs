//! Cache types for catalog responses.

use freshmart_core::{Category, DeliveryCentre, Product};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Categories(Vec<Category>),
    DeliveryCentres(Vec<DeliveryCentre>),
}

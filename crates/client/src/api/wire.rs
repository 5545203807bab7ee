//! JSON shapes exchanged with the backend.
//!
//! Field names follow the backend's documents (`prod_ID`, `selectedRate`,
//! `deliveryCharge`), which is why every field carries an explicit rename.
//! Nothing here is trusted: [`super::conversions`] validates each shape into
//! a `freshmart_core` type.

use chrono::{DateTime, Utc};
use freshmart_core::{Price, RateSelection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Envelopes
// =============================================================================

/// Responses arrive either bare or wrapped under a named key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CartEnvelope {
    Wrapped { cart: CartWire },
    Bare(CartWire),
}

impl CartEnvelope {
    pub fn into_inner(self) -> CartWire {
        match self {
            Self::Wrapped { cart } | Self::Bare(cart) => cart,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OrderEnvelope {
    Wrapped { order: OrderWire },
    Bare(OrderWire),
}

impl OrderEnvelope {
    pub fn into_inner(self) -> OrderWire {
        match self {
            Self::Wrapped { order } | Self::Bare(order) => order,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wishlist { wishlist: Vec<T> },
    Products { products: Vec<T> },
    Categories { categories: Vec<T> },
    Orders { orders: Vec<T> },
    Data { data: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_inner(self) -> Vec<T> {
        match self {
            Self::Bare(v)
            | Self::Wishlist { wishlist: v }
            | Self::Products { products: v }
            | Self::Categories { categories: v }
            | Self::Orders { orders: v }
            | Self::Data { data: v } => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductEnvelope {
    Wrapped { product: ProductWire },
    Bare(ProductWire),
}

impl ProductEnvelope {
    pub fn into_inner(self) -> ProductWire {
        match self {
            Self::Wrapped { product } | Self::Bare(product) => product,
        }
    }
}

/// Error body. The backend is inconsistent about the key.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
    pub msg: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .or(self.msg)
            .filter(|m| !m.trim().is_empty())
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CartWire {
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    /// Required: a body without `items` is not a cart.
    pub items: Vec<CartItemWire>,
    #[serde(default)]
    pub total: Price,
    #[serde(default)]
    pub gst: Price,
    #[serde(default, rename = "deliveryCharge")]
    pub delivery_charge: Price,
    #[serde(default)]
    pub discount: Price,
    #[serde(default, rename = "grandTotal")]
    pub grand_total: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemWire {
    #[serde(rename = "prod_ID")]
    pub prod_id: String,
    #[serde(default, rename = "prod_Name")]
    pub prod_name: String,
    #[serde(default)]
    pub image: String,
    #[serde(rename = "selectedRate")]
    pub selected_rate: Option<RateSelection>,
    pub quantity: i64,
    #[serde(default, rename = "prod_Rate")]
    pub prod_rate: Vec<Value>,
    #[serde(default, rename = "prod_category")]
    pub prod_category: Value,
}

#[derive(Debug, Serialize)]
pub struct AddToCartBody<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    #[serde(rename = "prod_ID")]
    pub prod_id: &'a str,
    pub quantity: u32,
    #[serde(rename = "selectedRate")]
    pub selected_rate: &'a RateSelection,
    #[serde(rename = "prod_Name")]
    pub prod_name: &'a str,
    pub image: &'a str,
    #[serde(rename = "prod_Rate")]
    pub prod_rate: Vec<Value>,
    #[serde(rename = "prod_category")]
    pub prod_category: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateCartBody<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    #[serde(rename = "prod_ID")]
    pub prod_id: &'a str,
    pub quantity: u32,
    #[serde(rename = "currentRate")]
    pub current_rate: &'a RateSelection,
    #[serde(rename = "selectedRate")]
    pub selected_rate: &'a RateSelection,
}

#[derive(Debug, Serialize)]
pub struct RemoveFromCartBody<'a> {
    #[serde(rename = "selectedRate")]
    pub selected_rate: &'a RateSelection,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressWire {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "addressLine1")]
    pub line1: String,
    #[serde(default, rename = "addressLine2", skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemWire {
    #[serde(rename = "prod_ID")]
    pub prod_id: String,
    #[serde(default, rename = "prod_Name")]
    pub prod_name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, rename = "prod_category")]
    pub prod_category: Value,
    #[serde(rename = "selectedRate")]
    pub selected_rate: Option<RateSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub order_quantity: Option<i64>,
    #[serde(default)]
    pub subtotal: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_subtotal: Option<Price>,
}

#[derive(Debug, Deserialize)]
pub struct OrderWire {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<OrderItemWire>,
    #[serde(default)]
    pub total: Price,
    #[serde(default)]
    pub gst: Price,
    #[serde(default, rename = "deliveryCharge")]
    pub delivery_charge: Price,
    #[serde(default)]
    pub discount: Price,
    #[serde(default, rename = "grandTotal")]
    pub grand_total: Price,
    #[serde(default, rename = "actual_grandTotal")]
    pub actual_grand_total: Option<Price>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub address: AddressWire,
    #[serde(default, rename = "deliveryDay")]
    pub delivery_day: String,
    #[serde(default, rename = "deliveryTime")]
    pub delivery_time: String,
    #[serde(default, rename = "deliveryCentre")]
    pub delivery_centre: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// `POST /createorder` body: `{orderdetails: {order: {...}}}`.
#[derive(Debug, Serialize)]
pub struct CreateOrderBody<'a> {
    pub orderdetails: OrderDetailsWire<'a>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetailsWire<'a> {
    pub order: NewOrderWire<'a>,
}

#[derive(Debug, Serialize)]
pub struct NewOrderWire<'a> {
    pub user_id: &'a str,
    pub items: Vec<OrderItemWire>,
    pub total: Price,
    pub gst: Price,
    #[serde(rename = "deliveryCharge")]
    pub delivery_charge: Price,
    pub discount: Price,
    #[serde(rename = "grandTotal")]
    pub grand_total: Price,
    pub status: &'a str,
    pub address: AddressWire,
    #[serde(rename = "deliveryDay")]
    pub delivery_day: &'a str,
    #[serde(rename = "deliveryTime")]
    pub delivery_time: &'a str,
    #[serde(rename = "deliveryCentre")]
    pub delivery_centre: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct OrderStatusBody<'a> {
    pub status: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ActualQuantitiesBody {
    pub items: Vec<ActualLineWire>,
    #[serde(rename = "actual_grandTotal")]
    pub actual_grand_total: Price,
}

#[derive(Debug, Serialize)]
pub struct ActualLineWire {
    #[serde(rename = "prod_ID")]
    pub prod_id: String,
    #[serde(rename = "selectedRate")]
    pub selected_rate: RateSelection,
    pub actual_quantity: u32,
    pub actual_subtotal: Price,
}

// =============================================================================
// Wishlist
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct WishlistEntryWire {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "prod_ID", alias = "productId")]
    pub prod_id: Value,
}

#[derive(Debug, Serialize)]
pub struct AddToWishlistBody<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    #[serde(rename = "prod_ID")]
    pub prod_id: &'a str,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductWire {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, rename = "prod_Name", alias = "name")]
    pub name: String,
    #[serde(default, rename = "prod_category", alias = "category")]
    pub category: Value,
    #[serde(default, rename = "prod_Rate", alias = "rates")]
    pub rates: Vec<Value>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_true", rename = "isActive", alias = "active")]
    pub active: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryWire {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, alias = "category_Name")]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_true", rename = "isActive", alias = "active")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryCentreWire {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_true", rename = "isActive", alias = "active")]
    pub active: bool,
}

const fn default_true() -> bool {
    true
}

//! Freshmart Core - Shared domain types.
//!
//! This crate provides the types the storefront client reconciles against
//! the backend:
//! - `catalog` - Products, categories, delivery centres (read-only)
//! - `cart` - Cart lines keyed by `(product, unit)` and server totals
//! - `wishlist` - Wishlist membership
//! - `order` - Orders, fulfilled quantities and checkout details
//! - `resolver` - Which unit a product view shows as selected
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no runtime. This keeps it lightweight and lets test doubles reuse
//! the exact keying rules the client relies on.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod order;
pub mod resolver;
pub mod types;
pub mod wishlist;

pub use cart::{Cart, CartError, CartLine, CartMutation, CartTotals, LineDisplay, LineKey};
pub use catalog::{Category, CategoryRef, DeliveryCentre, Product};
pub use order::{
    CheckoutDetails, CheckoutError, DeliveryAddress, DeliverySlot, Order, OrderError, OrderLine,
};
pub use resolver::{Resolution, resolve, resolve_for_product, resolve_raw};
pub use types::*;
pub use wishlist::{Wishlist, WishlistEntry};

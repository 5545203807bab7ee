//! Client-side stores reconciled against the backend.
//!
//! - `cart` - Cart reconciler (snapshot replacement, serialized calls)
//! - `wishlist` - Wishlist synchronizer (bus notifications, notices)
//! - `orders` - Order history and the delivery-centre desk
//! - `badge` - Header counts driven only by the change bus

mod badge;
mod cart;
mod orders;
mod wishlist;

pub use badge::{BadgeCounts, CountBadge};
pub use cart::{CartState, CartStore};
pub use orders::OrderDesk;
pub use wishlist::{
    ADDED_NOTICE, ALREADY_PRESENT_NOTICE, AddOutcome, REMOVED_NOTICE, WishlistStore,
};

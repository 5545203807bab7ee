//! Freshmart Client - Cart and wishlist reconciliation against the REST
//! backend.
//!
//! # Architecture
//!
//! - `api` - `reqwest` client for the backend; catalog reads cached in `moka`
//! - `store` - Cart reconciler, wishlist synchronizer, order desk, count badge
//! - `bus` - Typed change notifications (`tokio::sync::broadcast`)
//! - `notice` - Auto-expiring user feedback
//! - `session` - One user's stores wired to a shared bus
//! - `config` - Environment configuration
//! - `telemetry` - `tracing-subscriber` setup
//!
//! Stores never merge locally: every successful call replaces the local
//! snapshot with the one the backend returned, and every failure leaves it
//! untouched.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod bus;
pub mod config;
pub mod error;
pub mod notice;
pub mod session;
pub mod store;
pub mod telemetry;

pub use api::ApiClient;
pub use bus::{ChangeBus, StoreEvent};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, GENERIC_FAILURE, Result};
pub use notice::{Notice, NoticeBoard, NoticeKind};
pub use session::Session;
pub use store::{
    AddOutcome, BadgeCounts, CartState, CartStore, CountBadge, OrderDesk, WishlistStore,
};

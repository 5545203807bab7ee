//! Per-user bundle of stores.

use freshmart_core::{Category, DeliveryCentre, UserId};
use tracing::instrument;

use crate::api::ApiClient;
use crate::bus::ChangeBus;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::notice::NoticeBoard;
use crate::store::{BadgeCounts, CartStore, CountBadge, OrderDesk, WishlistStore};

/// Everything a signed-in user's views share: one API client, one change bus
/// and the stores built on them.
#[derive(Debug, Clone)]
pub struct Session {
    api: ApiClient,
    bus: ChangeBus,
    cart: CartStore,
    wishlist: WishlistStore,
    orders: OrderDesk,
}

impl Session {
    /// Build a session with its own change bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_bus(config, ChangeBus::new())
    }

    /// Build a session publishing on an existing bus, so several sessions
    /// (windows) of the same user observe each other's changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_bus(config: &ClientConfig, bus: ChangeBus) -> Result<Self> {
        let api = ApiClient::new(config)?;
        let cart = CartStore::new(api.clone(), bus.clone(), NoticeBoard::new(config.notice_ttl));
        let wishlist =
            WishlistStore::new(api.clone(), bus.clone(), NoticeBoard::new(config.notice_ttl));
        let orders = OrderDesk::new(api.clone(), bus.clone(), NoticeBoard::new(config.notice_ttl));
        Ok(Self {
            api,
            bus,
            cart,
            wishlist,
            orders,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        self.api.user_id()
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub const fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub const fn wishlist(&self) -> &WishlistStore {
        &self.wishlist
    }

    #[must_use]
    pub const fn orders(&self) -> &OrderDesk {
        &self.orders
    }

    /// Fetch the cart and wishlist concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first error from either fetch.
    #[instrument(skip(self), fields(user_id = %self.user_id()))]
    pub async fn load(&self) -> Result<()> {
        tokio::try_join!(self.cart.fetch(), self.wishlist.fetch())?;
        Ok(())
    }

    /// Start a header badge seeded with the current counts.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn badge(&self) -> CountBadge {
        let initial = BadgeCounts {
            cart_items: self.cart.snapshot().item_count(),
            wishlist: self.wishlist.snapshot().len(),
        };
        CountBadge::spawn(&self.bus, self.user_id().clone(), initial)
    }

    /// Categories for navigation (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.api.get_categories().await
    }

    /// Active delivery centres offered at checkout (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delivery_centres(&self) -> Result<Vec<DeliveryCentre>> {
        let centres = self.api.get_delivery_centres().await?;
        Ok(centres.into_iter().filter(|c| c.active).collect())
    }
}

//! Cart reconciler.
//!
//! Holds the latest authoritative cart snapshot. Every operation calls the
//! backend and, on success, replaces the local snapshot wholesale with the
//! server's response; the client never merges lines locally. Failures leave
//! the snapshot untouched and show a notice.
//!
//! Server calls on one cart are serialized: a call waits for the previous one
//! to finish before it is sent. Each call takes a ticket when its turn comes
//! and a snapshot is only applied if its ticket is newer than the one already
//! applied, so an older response can never overwrite a newer snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use freshmart_core::{
    Cart, CartLine, CheckoutDetails, LineDisplay, LineKey, Order, Product, ProductId,
    RateSelection, Resolution, UserId, resolve_for_product,
};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, is_missing_cart};
use crate::bus::{ChangeBus, StoreEvent};
use crate::error::{ClientError, Result};
use crate::notice::NoticeBoard;

/// The cart as last applied, with the ticket of the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartState {
    /// Latest snapshot.
    pub cart: Cart,
    /// Ticket of the call that produced `cart` (0 before the first load).
    pub ticket: u64,
    /// Whether a snapshot has been loaded from the backend.
    pub loaded: bool,
}

/// Handle on one user's cart.
///
/// Cheaply cloneable; clones share the snapshot and the call queue.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: ApiClient,
    bus: ChangeBus,
    notices: NoticeBoard,
    state: watch::Sender<CartState>,
    queue: Mutex<()>,
    tickets: AtomicU64,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("CartStore")
            .field("user_id", self.inner.api.user_id())
            .field("lines", &state.cart.len())
            .field("ticket", &state.ticket)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    #[must_use]
    pub fn new(api: ApiClient, bus: ChangeBus, notices: NoticeBoard) -> Self {
        let owner = api.user_id().clone();
        let (state, _) = watch::channel(CartState {
            cart: Cart::empty(Some(owner)),
            ticket: 0,
            loaded: false,
        });
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                bus,
                notices,
                state,
                queue: Mutex::new(()),
                tickets: AtomicU64::new(0),
            }),
        }
    }

    /// The signed-in user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        self.inner.api.user_id()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.inner.state.borrow().cart.clone()
    }

    /// Current state including its ticket.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Watch every applied snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// Notices raised by cart operations.
    #[must_use]
    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }

    /// Which unit a view of `product` should show as selected.
    #[must_use]
    pub fn resolve(&self, product: &Product) -> Resolution {
        resolve_for_product(product, &self.inner.state.borrow().cart)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Load the cart from the backend.
    ///
    /// A 500 from the backend means the user has no cart row yet and yields
    /// an empty cart with zero totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any other reason.
    #[instrument(skip(self), fields(user_id = %self.user_id()))]
    pub async fn fetch(&self) -> Result<Cart> {
        let _turn = self.inner.queue.lock().await;
        let ticket = self.next_ticket();

        let cart = match self.inner.api.get_cart().await {
            Ok(cart) => cart,
            Err(err) if is_missing_cart(&err) => {
                warn!("Backend has no cart for user, treating as empty");
                Cart::empty(Some(self.user_id().clone()))
            }
            Err(err) => return Err(self.fail("fetch", err)),
        };
        Ok(self.apply(ticket, cart))
    }

    /// Add `quantity` of `product` in the selected unit.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the quantity is 0, no real unit is
    /// selected, or the product lacks an id, name, image or category; nothing
    /// is sent in that case. Otherwise returns an error if the request fails.
    #[instrument(skip(self, product, selection), fields(product_id = %product.id, unit = %selection.key))]
    pub async fn add(
        &self,
        product: &Product,
        quantity: u32,
        selection: &RateSelection,
    ) -> Result<Cart> {
        let line = match new_line(product, quantity, selection) {
            Ok(line) => line,
            Err(err) => return Err(self.fail("add", err)),
        };

        let _turn = self.inner.queue.lock().await;
        let ticket = self.next_ticket();
        match self.inner.api.add_to_cart(&line).await {
            Ok(cart) => {
                self.inner.notices.success("Added to cart");
                Ok(self.apply(ticket, cart))
            }
            Err(err) => Err(self.fail("add", err)),
        }
    }

    /// Set the quantity of a line, optionally moving it to another unit.
    ///
    /// The line is identified by `current`; when it is absent the new unit is
    /// used, and failing that the product's only line in the cart. A quantity
    /// of 0 is sent as a removal.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::MissingRate` if no unit can be determined, or an
    /// error if the request fails.
    #[instrument(skip(self, current, new_rate), fields(product_id = %product_id))]
    pub async fn update(
        &self,
        product_id: &ProductId,
        quantity: u32,
        current: Option<&RateSelection>,
        new_rate: Option<&RateSelection>,
    ) -> Result<Cart> {
        let _turn = self.inner.queue.lock().await;
        let current = {
            let state = self.inner.state.borrow();
            identify_line(&state.cart, product_id, current, new_rate)
        };
        let current = match current {
            Ok(rate) => rate,
            Err(err) => return Err(self.fail("update", err)),
        };
        self.send_update(product_id, quantity, &current, new_rate).await
    }

    /// Increase a line's quantity by one.
    ///
    /// The quantity is read when the call's turn comes, so rapid repeated
    /// increments each count.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the line is not in the cart, or an
    /// error if the request fails.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn increment(&self, key: &LineKey) -> Result<Cart> {
        let _turn = self.inner.queue.lock().await;
        let line = match self.line(key) {
            Ok(line) => line,
            Err(err) => return Err(self.fail("increment", err)),
        };
        self.send_update(
            &line.product_id,
            line.quantity.saturating_add(1),
            &line.rate,
            None,
        )
        .await
    }

    /// Decrease a line's quantity by one, removing it when it reaches 0.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the line is not in the cart, or an
    /// error if the request fails.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn decrement(&self, key: &LineKey) -> Result<Cart> {
        let _turn = self.inner.queue.lock().await;
        let line = match self.line(key) {
            Ok(line) => line,
            Err(err) => return Err(self.fail("decrement", err)),
        };
        self.send_update(
            &line.product_id,
            line.quantity.saturating_sub(1),
            &line.rate,
            None,
        )
        .await
    }

    /// Remove the line for `product_id` in `unit`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::MissingRate` without a unit, or an error if the
    /// request fails.
    #[instrument(skip(self, unit), fields(product_id = %product_id))]
    pub async fn remove(
        &self,
        product_id: &ProductId,
        unit: Option<&RateSelection>,
    ) -> Result<Cart> {
        let Some(unit) = unit.filter(|u| !u.is_placeholder()) else {
            return Err(self.fail(
                "remove",
                ClientError::MissingRate(format!(
                    "A unit is required to remove product {product_id} from the cart"
                )),
            ));
        };

        let _turn = self.inner.queue.lock().await;
        self.send_remove(product_id, unit).await
    }

    /// Place an order for the current cart and clear it locally.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the cart is empty or the delivery
    /// details are incomplete, or an error if the request fails.
    #[instrument(skip(self, details), fields(user_id = %self.user_id()))]
    pub async fn checkout(&self, details: &CheckoutDetails) -> Result<Order> {
        if let Err(err) = details.validate() {
            return Err(self.fail("checkout", err.into()));
        }

        let _turn = self.inner.queue.lock().await;
        let cart = self.snapshot();
        if cart.is_empty() {
            return Err(self.fail(
                "checkout",
                ClientError::Validation("Your cart is empty".to_string()),
            ));
        }

        let ticket = self.next_ticket();
        match self.inner.api.create_order(&cart, details).await {
            Ok(order) => {
                info!(order_id = %order.id, grand_total = %order.totals.grand_total, "Order placed");
                self.apply(ticket, Cart::empty(Some(self.user_id().clone())));
                self.inner.bus.publish(StoreEvent::OrderChanged {
                    user: self.user_id().clone(),
                    order_id: order.id.clone(),
                    status: order.status,
                });
                self.inner.notices.success("Order placed successfully");
                Ok(order)
            }
            Err(err) => Err(self.fail("checkout", err)),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Send an update. The caller holds the queue.
    async fn send_update(
        &self,
        product_id: &ProductId,
        quantity: u32,
        current: &RateSelection,
        new_rate: Option<&RateSelection>,
    ) -> Result<Cart> {
        if quantity == 0 {
            debug!(unit = %current.key, "Quantity 0, removing line");
            return self.send_remove(product_id, current).await;
        }

        let selected = new_rate.filter(|r| !r.is_placeholder()).unwrap_or(current);
        let ticket = self.next_ticket();
        match self
            .inner
            .api
            .update_cart(product_id, quantity, current, selected)
            .await
        {
            Ok(cart) => Ok(self.apply(ticket, cart)),
            Err(err) => Err(self.fail("update", err)),
        }
    }

    /// Send a removal. The caller holds the queue.
    async fn send_remove(&self, product_id: &ProductId, unit: &RateSelection) -> Result<Cart> {
        let ticket = self.next_ticket();
        match self.inner.api.remove_from_cart(product_id, unit).await {
            Ok(cart) => Ok(self.apply(ticket, cart)),
            Err(err) => Err(self.fail("remove", err)),
        }
    }

    fn next_ticket(&self) -> u64 {
        self.inner.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn line(&self, key: &LineKey) -> Result<CartLine> {
        self.inner
            .state
            .borrow()
            .cart
            .line(key)
            .cloned()
            .ok_or_else(|| ClientError::Validation(format!("{key} is not in the cart")))
    }

    /// Apply a server snapshot produced by the call holding `ticket`.
    ///
    /// Returns the snapshot now current, which is the stored one if `cart`
    /// turned out to be stale.
    fn apply(&self, ticket: u64, cart: Cart) -> Cart {
        let user = self.user_id();
        let cart = match cart.owner() {
            Some(owner) if owner != user => {
                warn!(owner = %owner, "Cart belongs to another user, treating as empty");
                Cart::empty(Some(user.clone()))
            }
            Some(_) => cart,
            None => cart.with_owner(user.clone()),
        };

        let applied = self.inner.state.send_if_modified(|state| {
            if ticket <= state.ticket {
                return false;
            }
            state.cart = cart.clone();
            state.ticket = ticket;
            state.loaded = true;
            true
        });

        if !applied {
            let current = self.inner.state.borrow();
            warn!(
                ticket,
                current = current.ticket,
                "Dropping stale cart snapshot"
            );
            return current.cart.clone();
        }

        debug!(
            ticket,
            lines = cart.len(),
            grand_total = %cart.totals().grand_total,
            "Applied cart snapshot"
        );
        self.inner.bus.publish(StoreEvent::CartChanged {
            user: user.clone(),
            item_count: cart.item_count(),
            line_count: cart.len(),
        });
        cart
    }

    /// Log a failed operation and surface it as a notice.
    fn fail(&self, operation: &'static str, err: ClientError) -> ClientError {
        warn!(operation, error = %err, "Cart operation failed");
        self.inner.notices.error(err.user_message());
        err
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Build the line an add request sends, checking every required field.
fn new_line(product: &Product, quantity: u32, selection: &RateSelection) -> Result<CartLine> {
    if product.id.is_blank() {
        return Err(ClientError::Validation("Product id is required".to_string()));
    }
    if quantity == 0 {
        return Err(ClientError::Validation(
            "Quantity must be at least 1".to_string(),
        ));
    }
    if selection.is_placeholder() {
        return Err(ClientError::Validation("Please select a unit".to_string()));
    }

    let display = LineDisplay {
        name: product.name.clone(),
        image: product.primary_image().unwrap_or_default().to_string(),
        category: product.category.name.clone(),
    };
    if let Some(field) = display.first_missing() {
        return Err(ClientError::Validation(format!("{field} is required")));
    }

    Ok(CartLine {
        product_id: product.id.clone(),
        rate: selection.clone(),
        quantity,
        display,
        rates: product.rates.clone(),
    })
}

/// Unit that identifies the line an update addresses.
///
/// Tries the current unit, then the new unit, then the product's only line.
fn identify_line(
    cart: &Cart,
    product_id: &ProductId,
    current: Option<&RateSelection>,
    new_rate: Option<&RateSelection>,
) -> Result<RateSelection> {
    if let Some(rate) = current
        .filter(|r| !r.is_placeholder())
        .or_else(|| new_rate.filter(|r| !r.is_placeholder()))
    {
        return Ok(rate.clone());
    }

    let mut lines = cart.lines_for(product_id);
    match (lines.next(), lines.next()) {
        (Some(only), None) => Ok(only.rate.clone()),
        (Some(_), Some(_)) => Err(ClientError::MissingRate(format!(
            "Product {product_id} is in the cart in several units; choose one"
        ))),
        (None, _) => Err(ClientError::MissingRate(format!(
            "No unit known for product {product_id}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use freshmart_core::{CartMutation, CartTotals, CategoryRef, Price, RateOption};

    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new("A"),
            name: "Apple".to_string(),
            category: CategoryRef {
                id: None,
                name: "Fruits".to_string(),
            },
            rates: vec![
                RateOption::new("1kg", Price::from_rupees(50)),
                RateOption::new("500g", Price::from_rupees(30)),
            ],
            stock: 10,
            active: true,
            images: vec!["apple.jpg".to_string()],
        }
    }

    fn kg() -> RateSelection {
        RateSelection::new("1kg", Price::from_rupees(50))
    }

    fn half_kg() -> RateSelection {
        RateSelection::new("500g", Price::from_rupees(30))
    }

    fn cart_with(rates: &[RateSelection]) -> Cart {
        let mut cart = Cart::from_parts(None, vec![], CartTotals::default()).unwrap();
        for rate in rates {
            cart.apply(CartMutation::Add(new_line(&product(), 1, rate).unwrap()))
                .unwrap();
        }
        cart
    }

    #[test]
    fn test_new_line_copies_display_fields() {
        let line = new_line(&product(), 2, &kg()).unwrap();
        assert_eq!(line.display.name, "Apple");
        assert_eq!(line.display.image, "apple.jpg");
        assert_eq!(line.display.category, "Fruits");
        assert_eq!(line.rates.len(), 2);
        assert_eq!(line.subtotal(), Price::from_rupees(100));
    }

    #[test]
    fn test_new_line_rejects_missing_fields() {
        assert!(matches!(
            new_line(&product(), 0, &kg()),
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            new_line(&product(), 1, &RateSelection::placeholder()),
            Err(ClientError::Validation(_))
        ));

        let mut no_image = product();
        no_image.images.clear();
        let err = new_line(&no_image, 1, &kg()).unwrap_err();
        assert_eq!(err.user_message(), "image is required");

        let mut no_id = product();
        no_id.id = ProductId::new(" ");
        assert!(matches!(
            new_line(&no_id, 1, &kg()),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn test_identify_prefers_current_unit() {
        let cart = cart_with(&[kg(), half_kg()]);
        let id = ProductId::new("A");
        let rate = identify_line(&cart, &id, Some(&kg()), Some(&half_kg())).unwrap();
        assert_eq!(rate, kg());
    }

    #[test]
    fn test_identify_falls_back_to_new_unit() {
        let cart = cart_with(&[]);
        let id = ProductId::new("A");
        let rate = identify_line(&cart, &id, None, Some(&half_kg())).unwrap();
        assert_eq!(rate, half_kg());
    }

    #[test]
    fn test_identify_falls_back_to_only_line() {
        let cart = cart_with(&[half_kg()]);
        let id = ProductId::new("A");
        let rate = identify_line(&cart, &id, Some(&RateSelection::placeholder()), None).unwrap();
        assert_eq!(rate, half_kg());
    }

    #[test]
    fn test_identify_ambiguous_or_unknown() {
        let id = ProductId::new("A");
        let both = cart_with(&[kg(), half_kg()]);
        assert!(matches!(
            identify_line(&both, &id, None, None),
            Err(ClientError::MissingRate(_))
        ));
        let none = cart_with(&[]);
        assert!(matches!(
            identify_line(&none, &id, None, None),
            Err(ClientError::MissingRate(_))
        ));
    }
}

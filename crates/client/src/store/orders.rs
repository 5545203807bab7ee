//! Order history and the delivery-centre desk.
//!
//! Customers list their orders; delivery staff record the quantity actually
//! fulfilled per line, persist it, and move orders through their status.
//! Actual quantities are edited locally first (the actual grand total is
//! recomputed on every edit) and only sent with [`OrderDesk::save_actual`].

use std::sync::Arc;

use freshmart_core::{LineKey, Order, OrderAction, OrderError, OrderId, Price};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::bus::{ChangeBus, StoreEvent};
use crate::error::{ClientError, Result};
use crate::notice::NoticeBoard;

/// Handle on the orders visible to the signed-in user.
#[derive(Clone)]
pub struct OrderDesk {
    inner: Arc<OrderDeskInner>,
}

struct OrderDeskInner {
    api: ApiClient,
    bus: ChangeBus,
    notices: NoticeBoard,
    state: watch::Sender<Vec<Order>>,
}

impl std::fmt::Debug for OrderDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderDesk")
            .field("user_id", self.inner.api.user_id())
            .field("orders", &self.inner.state.borrow().len())
            .finish_non_exhaustive()
    }
}

impl OrderDesk {
    #[must_use]
    pub fn new(api: ApiClient, bus: ChangeBus, notices: NoticeBoard) -> Self {
        let (state, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(OrderDeskInner {
                api,
                bus,
                notices,
                state,
            }),
        }
    }

    /// Orders currently loaded, newest first as the backend lists them.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.inner.state.borrow().clone()
    }

    /// One loaded order.
    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.inner
            .state
            .borrow()
            .iter()
            .find(|o| &o.id == order_id)
            .cloned()
    }

    /// Watch the loaded orders.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Order>> {
        self.inner.state.subscribe()
    }

    /// Notices raised by desk operations.
    #[must_use]
    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }

    /// Load every order visible to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. Unsaved actual quantities are
    /// discarded on success.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Vec<Order>> {
        let orders = self
            .inner
            .api
            .get_orders()
            .await
            .map_err(|err| self.fail("fetch", err))?;
        self.inner.state.send_replace(orders.clone());
        Ok(orders)
    }

    /// Load (or reload) one order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn open(&self, order_id: &OrderId) -> Result<Order> {
        let order = self
            .inner
            .api
            .get_order(order_id)
            .await
            .map_err(|err| self.fail("open", err))?;
        self.store(order.clone());
        Ok(order)
    }

    /// Record the quantity actually fulfilled for one line.
    ///
    /// Returns the recomputed actual grand total. Nothing is sent until
    /// [`Self::save_actual`].
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the order is not loaded, the line
    /// does not exist, or `actual` exceeds the ordered quantity.
    pub fn set_actual_quantity(
        &self,
        order_id: &OrderId,
        key: &LineKey,
        actual: u32,
    ) -> Result<Price> {
        self.edit(order_id, |order| order.set_actual_quantity(key, actual))
    }

    /// Forget the actual quantity recorded for one line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the order is not loaded or the
    /// line does not exist.
    pub fn clear_actual_quantity(&self, order_id: &OrderId, key: &LineKey) -> Result<Price> {
        self.edit(order_id, |order| order.clear_actual_quantity(key))
    }

    /// Persist the actual quantities recorded on a loaded order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the order is not loaded, or an
    /// error if the request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn save_actual(&self, order_id: &OrderId) -> Result<Order> {
        let order = self.loaded(order_id).map_err(|err| self.fail("save", err))?;
        let saved = self
            .inner
            .api
            .save_actual_quantities(&order)
            .await
            .map_err(|err| self.fail("save", err))?;
        info!(
            actual_grand_total = %saved.actual_grand_total.unwrap_or(saved.totals.grand_total),
            "Saved actual quantities"
        );
        self.store(saved.clone());
        self.publish(&saved);
        self.inner.notices.success("Quantities saved");
        Ok(saved)
    }

    /// Take an action on a loaded order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidTransition` without sending anything if
    /// the order's status does not offer `action`, or an error if the request
    /// fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn apply_action(&self, order_id: &OrderId, action: OrderAction) -> Result<Order> {
        let order = self.loaded(order_id).map_err(|err| self.fail("action", err))?;
        let target = order
            .next_status(action)
            .map_err(|err| self.fail("action", err.into()))?;

        let updated = self
            .inner
            .api
            .update_order_status(order_id, target)
            .await
            .map_err(|err| self.fail("action", err))?;
        info!(status = %updated.status, "Order status changed");
        self.store(updated.clone());
        self.publish(&updated);
        self.inner
            .notices
            .success(format!("Order marked {}", updated.status));
        Ok(updated)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn loaded(&self, order_id: &OrderId) -> Result<Order> {
        self.order(order_id)
            .ok_or_else(|| ClientError::Validation(format!("Order {order_id} is not loaded")))
    }

    fn store(&self, order: Order) {
        self.inner.state.send_modify(|orders| {
            match orders.iter_mut().find(|o| o.id == order.id) {
                Some(existing) => *existing = order,
                None => orders.push(order),
            }
        });
    }

    fn edit<F>(&self, order_id: &OrderId, f: F) -> Result<Price>
    where
        F: FnOnce(&mut Order) -> std::result::Result<Price, OrderError>,
    {
        let mut outcome = Err(ClientError::Validation(format!(
            "Order {order_id} is not loaded"
        )));
        self.inner.state.send_if_modified(|orders| {
            let Some(order) = orders.iter_mut().find(|o| &o.id == order_id) else {
                return false;
            };
            outcome = f(order).map_err(edit_error);
            outcome.is_ok()
        });
        outcome.map_err(|err| self.fail("edit", err))
    }

    fn publish(&self, order: &Order) {
        self.inner.bus.publish(StoreEvent::OrderChanged {
            user: order.user_id.clone(),
            order_id: order.id.clone(),
            status: order.status,
        });
    }

    fn fail(&self, operation: &'static str, err: ClientError) -> ClientError {
        warn!(operation, error = %err, "Order operation failed");
        self.inner.notices.error(err.user_message());
        err
    }
}

/// Line edits are input mistakes, not status problems.
fn edit_error(err: OrderError) -> ClientError {
    match err {
        OrderError::ActionNotOffered { .. } => ClientError::InvalidTransition(err),
        OrderError::LineNotFound(_) | OrderError::ExceedsOrdered { .. } => {
            ClientError::Validation(err.to_string())
        }
    }
}

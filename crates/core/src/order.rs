//! Orders and checkout details.
//!
//! An order is a snapshot of the cart at checkout. Delivery-centre staff may
//! later record the quantity actually fulfilled for each line; the order then
//! carries a second, client-recomputed total next to the quoted one:
//!
//! ```text
//! actual_grand_total = Σ(actual_subtotal ?? subtotal) + gst + delivery_charge − discount
//! ```

use chrono::{DateTime, Utc};

use crate::cart::{CartTotals, LineDisplay, LineKey};
use crate::types::{
    DeliveryCentreId, OrderAction, OrderId, OrderStatus, Price, ProductId, RateSelection, UserId,
};

/// Errors raised by order operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// The addressed line does not exist.
    #[error("order has no line {0}")]
    LineNotFound(LineKey),
    /// Fulfilled quantity larger than what was ordered.
    #[error("actual quantity {actual} exceeds ordered quantity {ordered} for {key}")]
    ExceedsOrdered {
        /// Line key.
        key: LineKey,
        /// Quantity ordered.
        ordered: u32,
        /// Quantity entered.
        actual: u32,
    },
    /// The action is not offered in the current status.
    #[error("cannot {action:?} an order that is {status}")]
    ActionNotOffered {
        /// Current status.
        status: OrderStatus,
        /// Requested action.
        action: OrderAction,
    },
}

/// Errors in checkout details, reported before anything is sent.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// A required field is blank.
    #[error("{0} is required")]
    Missing(&'static str),
    /// The pincode is not six digits.
    #[error("pincode must be 6 digits")]
    InvalidPincode,
    /// The phone number is not ten digits.
    #[error("phone number must be 10 digits")]
    InvalidPhone,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    /// Product id.
    pub product_id: ProductId,
    /// Unit and unit price at placement.
    pub rate: RateSelection,
    /// Quantity ordered.
    pub quantity: u32,
    /// Subtotal quoted at placement.
    pub subtotal: Price,
    /// Display fields copied from the cart line.
    pub display: LineDisplay,
    /// Quantity actually fulfilled, when recorded.
    pub actual_quantity: Option<u32>,
    /// Subtotal for the fulfilled quantity, when recorded.
    pub actual_subtotal: Option<Price>,
}

impl OrderLine {
    /// Key of this line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            unit: self.rate.key.clone(),
        }
    }

    /// Actual subtotal when recorded, otherwise the quoted subtotal.
    #[must_use]
    pub fn effective_subtotal(&self) -> Price {
        self.actual_subtotal.unwrap_or(self.subtotal)
    }

    /// Whether fulfilment differs from what was ordered.
    #[must_use]
    pub fn is_adjusted(&self) -> bool {
        self.actual_quantity.is_some_and(|q| q != self.quantity)
    }
}

/// Delivery day and time slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliverySlot {
    /// Delivery day label (e.g. `"Saturday"`).
    pub day: String,
    /// Time slot label (e.g. `"7am - 9am"`).
    pub time: String,
}

/// Delivery address entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryAddress {
    /// Recipient name.
    pub name: String,
    /// House / street lines.
    pub line1: String,
    /// Landmark or second line.
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// Six digit postal code.
    pub pincode: String,
    /// Ten digit phone number.
    pub phone: String,
}

/// Everything the customer supplies at checkout besides the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDetails {
    /// Where to deliver.
    pub address: DeliveryAddress,
    /// When to deliver.
    pub slot: DeliverySlot,
    /// Centre fulfilling the order.
    pub delivery_centre: DeliveryCentreId,
    /// Free-form notes for the delivery staff.
    pub notes: Option<String>,
}

impl CheckoutDetails {
    /// Check required fields before submitting.
    ///
    /// # Errors
    ///
    /// Returns the first [`CheckoutError`] found.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let required = [
            ("name", &self.address.name),
            ("address", &self.address.line1),
            ("city", &self.address.city),
            ("delivery day", &self.slot.day),
            ("delivery time", &self.slot.time),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CheckoutError::Missing(field));
            }
        }
        if self.delivery_centre.is_blank() {
            return Err(CheckoutError::Missing("delivery centre"));
        }
        if !is_digits(&self.address.pincode, 6) {
            return Err(CheckoutError::InvalidPincode);
        }
        if !is_digits(&self.address.phone, 10) {
            return Err(CheckoutError::InvalidPhone);
        }
        Ok(())
    }
}

fn is_digits(s: &str, len: usize) -> bool {
    let s = s.trim();
    s.len() == len && s.chars().all(|c| c.is_ascii_digit())
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Order id.
    pub id: OrderId,
    /// Customer.
    pub user_id: UserId,
    /// Lines copied from the cart.
    pub lines: Vec<OrderLine>,
    /// Totals quoted at placement.
    pub totals: CartTotals,
    /// Total recomputed from fulfilled quantities.
    pub actual_grand_total: Option<Price>,
    /// Delivery status.
    pub status: OrderStatus,
    /// Delivery address.
    pub address: DeliveryAddress,
    /// Delivery slot.
    pub slot: DeliverySlot,
    /// Fulfilling centre.
    pub delivery_centre: Option<DeliveryCentreId>,
    /// Customer notes.
    pub notes: Option<String>,
    /// Placement time.
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// `Σ(actual_subtotal ?? subtotal) + gst + delivery_charge − discount`.
    #[must_use]
    pub fn compute_actual_grand_total(&self) -> Price {
        let lines: Price = self.lines.iter().map(OrderLine::effective_subtotal).sum();
        lines + self.totals.gst + self.totals.delivery_charge - self.totals.discount
    }

    /// Record the fulfilled quantity of a line and recompute the actual
    /// grand total. Returns the new actual grand total.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::LineNotFound`] for an unknown line and
    /// [`OrderError::ExceedsOrdered`] if more than the ordered quantity is
    /// entered.
    pub fn set_actual_quantity(&mut self, key: &LineKey, actual: u32) -> Result<Price, OrderError> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == key.product_id && l.rate.key == key.unit)
            .ok_or_else(|| OrderError::LineNotFound(key.clone()))?;
        if actual > line.quantity {
            return Err(OrderError::ExceedsOrdered {
                key: key.clone(),
                ordered: line.quantity,
                actual,
            });
        }
        line.actual_quantity = Some(actual);
        line.actual_subtotal = Some(line.rate.value.times(actual));

        let total = self.compute_actual_grand_total();
        self.actual_grand_total = Some(total);
        Ok(total)
    }

    /// Drop a recorded actual quantity, reverting the line to its quote.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::LineNotFound`] for an unknown line.
    pub fn clear_actual_quantity(&mut self, key: &LineKey) -> Result<Price, OrderError> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == key.product_id && l.rate.key == key.unit)
            .ok_or_else(|| OrderError::LineNotFound(key.clone()))?;
        line.actual_quantity = None;
        line.actual_subtotal = None;

        let total = self.compute_actual_grand_total();
        self.actual_grand_total = if self.lines.iter().any(|l| l.actual_subtotal.is_some()) {
            Some(total)
        } else {
            None
        };
        Ok(total)
    }

    /// Whether any line was fulfilled with a different quantity.
    #[must_use]
    pub fn has_adjustments(&self) -> bool {
        self.lines.iter().any(OrderLine::is_adjusted)
    }

    /// Actions offered in the current status.
    #[must_use]
    pub const fn actions(&self) -> &'static [OrderAction] {
        self.status.actions()
    }

    /// Status after `action`, if it is offered.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::ActionNotOffered`] otherwise.
    pub fn next_status(&self, action: OrderAction) -> Result<OrderStatus, OrderError> {
        self.status.after(action).ok_or(OrderError::ActionNotOffered {
            status: self.status,
            action,
        })
    }
}

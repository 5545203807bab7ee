//! Order delivery status.
//!
//! ```text
//! Order Placed ──► Confirmed ──► Delivered
//!      │
//!      └──► Cancelled
//! ```
//!
//! Cancellation is only offered while the order is still `Order Placed`.

use serde::{Deserialize, Serialize};

/// Delivery status of an order, as stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Order Placed")]
    OrderPlaced,
    Confirmed,
    Delivered,
    Cancelled,
}

/// An action staff or customers can take on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    /// Delivery centre accepts the order.
    Confirm,
    /// Order handed over to the customer.
    Deliver,
    /// Order abandoned before confirmation.
    Cancel,
}

impl OrderStatus {
    /// Actions offered for an order in this status.
    #[must_use]
    pub const fn actions(self) -> &'static [OrderAction] {
        match self {
            Self::OrderPlaced => &[OrderAction::Confirm, OrderAction::Cancel],
            Self::Confirmed => &[OrderAction::Deliver],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    /// Whether `action` is offered in this status.
    #[must_use]
    pub fn offers(self, action: OrderAction) -> bool {
        self.actions().contains(&action)
    }

    /// Status reached by taking `action`, if it is offered.
    #[must_use]
    pub fn after(self, action: OrderAction) -> Option<Self> {
        if !self.offers(action) {
            return None;
        }
        Some(action.target())
    }

    /// Whether no further actions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.actions().is_empty()
    }
}

impl OrderAction {
    /// Status this action moves an order into.
    #[must_use]
    pub const fn target(self) -> OrderStatus {
        match self {
            Self::Confirm => OrderStatus::Confirmed,
            Self::Deliver => OrderStatus::Delivered,
            Self::Cancel => OrderStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderPlaced => write!(f, "Order Placed"),
            Self::Confirmed => write!(f, "Confirmed"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::str::FromStr for OrderAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirm" => Ok(Self::Confirm),
            "deliver" => Ok(Self::Deliver),
            "cancel" => Ok(Self::Cancel),
            _ => Err(format!("invalid order action: {s}")),
        }
    }
}

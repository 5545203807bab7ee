//! Process-wide change notifications.
//!
//! Stores publish a [`StoreEvent`] after every applied change so that
//! consumers which do not hold the store itself (a header badge, another
//! window of the same session) can refresh. Fan-out is best effort: a
//! publish with no subscribers is not an error, and a subscriber that falls
//! more than the channel capacity behind skips to the newest events.

use freshmart_core::{OrderId, OrderStatus, UserId};
use tokio::sync::broadcast;
use tracing::trace;

/// Events buffered per subscriber before the oldest are dropped.
const BUS_CAPACITY: usize = 256;

/// A change applied by one of the stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A new cart snapshot was applied.
    CartChanged {
        user: UserId,
        /// Sum of quantities.
        item_count: u32,
        /// Number of distinct lines.
        line_count: usize,
    },
    /// The wishlist was re-fetched after a change.
    WishlistChanged { user: UserId, count: usize },
    /// An order was placed or updated.
    OrderChanged {
        user: UserId,
        order_id: OrderId,
        status: OrderStatus,
    },
}

impl StoreEvent {
    /// User the event belongs to.
    #[must_use]
    pub const fn user(&self) -> &UserId {
        match self {
            Self::CartChanged { user, .. }
            | Self::WishlistChanged { user, .. }
            | Self::OrderChanged { user, .. } => user,
        }
    }
}

/// Typed publish/subscribe channel shared by the stores of a session.
///
/// Cloning yields another handle on the same channel.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Publish an event to every current subscriber.
    pub fn publish(&self, event: StoreEvent) {
        // Err only means nobody is listening right now.
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(subscribers = delivered, "Published store event");
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

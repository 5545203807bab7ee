//! Header count badge.
//!
//! Tracks cart and wishlist counts from [`ChangeBus`] events alone, without a
//! handle on either store.

use freshmart_core::UserId;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bus::{ChangeBus, StoreEvent};

/// Counts shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BadgeCounts {
    /// Sum of cart quantities.
    pub cart_items: u32,
    /// Wishlist entries.
    pub wishlist: usize,
}

/// Bus consumer keeping [`BadgeCounts`] current for one user.
///
/// The listening task stops when the badge is dropped.
#[derive(Debug)]
pub struct CountBadge {
    counts: watch::Receiver<BadgeCounts>,
    task: JoinHandle<()>,
}

impl CountBadge {
    /// Start listening on `bus` for events about `user`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(bus: &ChangeBus, user: UserId, initial: BadgeCounts) -> Self {
        let (tx, counts) = watch::channel(initial);
        let events = bus.subscribe();
        let task = tokio::spawn(listen(events, user, tx));
        Self { counts, task }
    }

    /// Latest counts.
    #[must_use]
    pub fn counts(&self) -> BadgeCounts {
        *self.counts.borrow()
    }

    /// Watch the counts.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BadgeCounts> {
        self.counts.clone()
    }
}

impl Drop for CountBadge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn listen(
    mut events: broadcast::Receiver<StoreEvent>,
    user: UserId,
    counts: watch::Sender<BadgeCounts>,
) {
    loop {
        match events.recv().await {
            Ok(event) if event.user() == &user => {
                counts.send_if_modified(|c| apply(c, &event));
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Badge fell behind the change bus");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Change bus closed, badge stopping");
                return;
            }
        }
    }
}

fn apply(counts: &mut BadgeCounts, event: &StoreEvent) -> bool {
    let before = *counts;
    match event {
        StoreEvent::CartChanged { item_count, .. } => counts.cart_items = *item_count,
        StoreEvent::WishlistChanged { count, .. } => counts.wishlist = *count,
        StoreEvent::OrderChanged { .. } => {}
    }
    before != *counts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_badge_follows_bus() {
        let bus = ChangeBus::new();
        let user = UserId::new("u1");
        let badge = CountBadge::spawn(&bus, user.clone(), BadgeCounts::default());
        let mut rx = badge.subscribe();

        bus.publish(StoreEvent::WishlistChanged {
            user: user.clone(),
            count: 4,
        });
        rx.changed().await.unwrap();
        assert_eq!(badge.counts().wishlist, 4);

        bus.publish(StoreEvent::CartChanged {
            user,
            item_count: 3,
            line_count: 2,
        });
        rx.changed().await.unwrap();
        assert_eq!(
            badge.counts(),
            BadgeCounts {
                cart_items: 3,
                wishlist: 4
            }
        );
    }

    #[tokio::test]
    async fn test_badge_ignores_other_users() {
        let bus = ChangeBus::new();
        let badge = CountBadge::spawn(&bus, UserId::new("u1"), BadgeCounts::default());
        let mut rx = badge.subscribe();

        bus.publish(StoreEvent::WishlistChanged {
            user: UserId::new("u2"),
            count: 9,
        });
        bus.publish(StoreEvent::WishlistChanged {
            user: UserId::new("u1"),
            count: 1,
        });
        rx.changed().await.unwrap();
        assert_eq!(badge.counts().wishlist, 1);
    }

    #[test]
    fn test_apply_reports_change() {
        let mut counts = BadgeCounts::default();
        let event = StoreEvent::WishlistChanged {
            user: UserId::new("u1"),
            count: 0,
        };
        assert!(!apply(&mut counts, &event));
    }
}

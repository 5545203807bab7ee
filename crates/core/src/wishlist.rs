//! Wishlist membership.

use crate::types::{ProductId, UserId, WishlistEntryId};

/// A saved-for-later product reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WishlistEntry {
    /// Entry id, used for removal.
    pub id: WishlistEntryId,
    /// Saved product.
    pub product_id: ProductId,
}

/// A user's wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wishlist {
    owner: Option<UserId>,
    entries: Vec<WishlistEntry>,
}

impl Wishlist {
    /// Create a wishlist from fetched entries.
    #[must_use]
    pub const fn new(owner: Option<UserId>, entries: Vec<WishlistEntry>) -> Self {
        Self { owner, entries }
    }

    /// Owning user.
    #[must_use]
    pub const fn owner(&self) -> Option<&UserId> {
        self.owner.as_ref()
    }

    /// Entries in server order.
    #[must_use]
    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the wishlist is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Membership by product id (heart-icon state).
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.entry_for(product_id).is_some()
    }

    /// Entry saving `product_id`, if any.
    #[must_use]
    pub fn entry_for(&self, product_id: &ProductId) -> Option<&WishlistEntry> {
        self.entries.iter().find(|e| &e.product_id == product_id)
    }

    /// Entry with the given id, if any.
    #[must_use]
    pub fn entry(&self, id: &WishlistEntryId) -> Option<&WishlistEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }
}

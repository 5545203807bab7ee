//! Wishlist synchronizer.
//!
//! Keeps the signed-in user's wishlist and tells every other consumer about
//! changes through the [`ChangeBus`]. After each successful add or remove the
//! list is re-fetched so the published count is the server's. If that
//! re-fetch fails the change is applied to the local list instead and the
//! list is marked stale, so the next operation loads it again first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use freshmart_core::{ProductId, UserId, Wishlist, WishlistEntry, WishlistEntryId};
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument, warn};

use crate::api::ApiClient;
use crate::bus::{ChangeBus, StoreEvent};
use crate::error::{ClientError, Result};
use crate::notice::NoticeBoard;

/// Shown when a product is saved.
pub const ADDED_NOTICE: &str = "Added to wishlist!";
/// Shown when a saved product is added again.
pub const ALREADY_PRESENT_NOTICE: &str = "Already in wishlist";
/// Shown when an entry is removed.
pub const REMOVED_NOTICE: &str = "Removed from wishlist";

/// Result of [`WishlistStore::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The product was saved.
    Added,
    /// The product was already saved; nothing was sent.
    AlreadyPresent,
}

/// Handle on one user's wishlist.
///
/// Cheaply cloneable; clones share the list.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistStoreInner>,
}

struct WishlistStoreInner {
    api: ApiClient,
    bus: ChangeBus,
    notices: NoticeBoard,
    state: watch::Sender<Wishlist>,
    queue: Mutex<()>,
    /// Whether `state` matches the server as of the last fetch.
    loaded: AtomicBool,
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("user_id", self.inner.api.user_id())
            .field("entries", &self.inner.state.borrow().len())
            .finish_non_exhaustive()
    }
}

impl WishlistStore {
    #[must_use]
    pub fn new(api: ApiClient, bus: ChangeBus, notices: NoticeBoard) -> Self {
        let owner = api.user_id().clone();
        let (state, _) = watch::channel(Wishlist::new(Some(owner), Vec::new()));
        Self {
            inner: Arc::new(WishlistStoreInner {
                api,
                bus,
                notices,
                state,
                queue: Mutex::new(()),
                loaded: AtomicBool::new(false),
            }),
        }
    }

    /// The signed-in user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        self.inner.api.user_id()
    }

    /// Current list.
    #[must_use]
    pub fn snapshot(&self) -> Wishlist {
        self.inner.state.borrow().clone()
    }

    /// Whether the list has been loaded and not gone stale since.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.inner.loaded.load(Ordering::Acquire)
    }

    /// Whether `product_id` is saved (heart-icon state).
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.inner.state.borrow().contains(product_id)
    }

    /// Watch the list as it changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Wishlist> {
        self.inner.state.subscribe()
    }

    /// Notices raised by wishlist operations.
    #[must_use]
    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }

    /// Load the wishlist from the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(user_id = %self.user_id()))]
    pub async fn fetch(&self) -> Result<Wishlist> {
        let _turn = self.inner.queue.lock().await;
        self.refresh().await.map_err(|err| self.fail("fetch", err))
    }

    /// Save a product.
    ///
    /// Saving a product that is already in the list reports
    /// [`AddOutcome::AlreadyPresent`] without saving it again. An unloaded
    /// or stale list is fetched before that check.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the list or the save fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: &ProductId) -> Result<AddOutcome> {
        if product_id.is_blank() {
            return Err(self.fail(
                "add",
                ClientError::Validation("Product id is required".to_string()),
            ));
        }

        let _turn = self.inner.queue.lock().await;
        self.ensure_loaded("add").await?;
        if self.contains(product_id) {
            debug!("Product already in wishlist");
            self.inner.notices.info(ALREADY_PRESENT_NOTICE);
            return Ok(AddOutcome::AlreadyPresent);
        }

        if let Err(err) = self.inner.api.add_to_wishlist(product_id).await {
            return Err(self.fail("add", err));
        }
        let product_id = product_id.clone();
        self.settle("add", |entries| {
            entries.push(WishlistEntry {
                id: WishlistEntryId::new(""),
                product_id,
            });
        })
        .await;
        self.inner.notices.success(ADDED_NOTICE);
        Ok(AddOutcome::Added)
    }

    /// Remove one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    #[instrument(skip(self), fields(entry_id = %entry_id))]
    pub async fn remove(&self, entry_id: &WishlistEntryId) -> Result<()> {
        let _turn = self.inner.queue.lock().await;
        self.remove_entry(entry_id).await
    }

    /// Remove the entry saving `product_id`, if there is one.
    ///
    /// Returns whether an entry was removed. An unloaded or stale list is
    /// fetched first so the entry id is the server's.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the list or the removal fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_product(&self, product_id: &ProductId) -> Result<bool> {
        let _turn = self.inner.queue.lock().await;
        self.ensure_loaded("remove").await?;
        let entry = self
            .inner
            .state
            .borrow()
            .entry_for(product_id)
            .map(|e| e.id.clone());
        match entry {
            Some(id) => self.remove_entry(&id).await.map(|()| true),
            None => Ok(false),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Delete an entry. The caller holds the queue.
    async fn remove_entry(&self, entry_id: &WishlistEntryId) -> Result<()> {
        if let Err(err) = self.inner.api.remove_from_wishlist(entry_id).await {
            return Err(self.fail("remove", err));
        }
        let entry_id = entry_id.clone();
        self.settle("remove", |entries| entries.retain(|e| e.id != entry_id))
            .await;
        self.inner.notices.success(REMOVED_NOTICE);
        Ok(())
    }

    async fn refresh(&self) -> Result<Wishlist> {
        let wishlist = self.inner.api.get_wishlist().await?;
        debug!(entries = wishlist.len(), "Applied wishlist");
        self.inner.state.send_replace(wishlist.clone());
        self.inner.loaded.store(true, Ordering::Release);
        Ok(wishlist)
    }

    async fn ensure_loaded(&self, operation: &'static str) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        self.refresh()
            .await
            .map(|_| ())
            .map_err(|err| self.fail(operation, err))
    }

    /// After a successful mutation: re-fetch, or apply `local` to the list
    /// and mark it stale when the re-fetch fails. Publishes either way.
    async fn settle<F>(&self, operation: &'static str, local: F)
    where
        F: FnOnce(&mut Vec<WishlistEntry>),
    {
        let count = match self.refresh().await {
            Ok(wishlist) => wishlist.len(),
            Err(err) => {
                warn!(
                    operation,
                    error = %err,
                    "Wishlist refresh failed after a saved change, applying it locally"
                );
                self.inner.loaded.store(false, Ordering::Release);
                let owner = self.user_id().clone();
                self.inner.state.send_modify(|wishlist| {
                    let mut entries = wishlist.entries().to_vec();
                    local(&mut entries);
                    *wishlist = Wishlist::new(Some(owner), entries);
                });
                self.inner.state.borrow().len()
            }
        };
        self.inner.bus.publish(StoreEvent::WishlistChanged {
            user: self.user_id().clone(),
            count,
        });
    }

    fn fail(&self, operation: &'static str, err: ClientError) -> ClientError {
        warn!(operation, error = %err, "Wishlist operation failed");
        self.inner.notices.error(err.user_message());
        err
    }
}

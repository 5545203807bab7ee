//! Wishlist synchronization and change propagation.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use freshmart_client::store::{ADDED_NOTICE, ALREADY_PRESENT_NOTICE};
use freshmart_client::{AddOutcome, ChangeBus, NoticeKind, StoreEvent};
use freshmart_core::{Price, ProductId, RateSelection};
use freshmart_integration_tests::{ALICE, BOB, FakeBackend};

/// Wait until `check` holds, polling every 10ms for up to a second.
async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(check(), "condition not reached within 1s");
}

#[tokio::test]
async fn test_add_is_idempotent() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    session.wishlist().fetch().await.unwrap();
    let apple = ProductId::new("apple");

    let first = session.wishlist().add(&apple).await.unwrap();
    assert_eq!(first, AddOutcome::Added);
    assert_eq!(
        session.wishlist().notices().current().unwrap().text,
        ADDED_NOTICE
    );

    let second = session.wishlist().add(&apple).await.unwrap();
    assert_eq!(second, AddOutcome::AlreadyPresent);
    let notice = session.wishlist().notices().current().unwrap();
    assert_eq!(notice.kind, NoticeKind::Info);
    assert_eq!(notice.text, ALREADY_PRESENT_NOTICE);

    assert_eq!(backend.hits("POST /wishlist"), 1);
    assert_eq!(backend.server_wishlist_len(ALICE), 1);
    assert_eq!(session.wishlist().snapshot().len(), 1);
}

#[tokio::test]
async fn test_blank_product_is_not_sent() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);

    assert!(session.wishlist().add(&ProductId::new("  ")).await.is_err());
    assert_eq!(backend.hits("POST /wishlist"), 0);
}

#[tokio::test]
async fn test_removal_reaches_every_subscriber() {
    let backend = FakeBackend::start().await;
    let bus = ChangeBus::new();
    let header = backend.session_on(ALICE, bus.clone());
    let page = backend.session_on(ALICE, bus.clone());
    let mut events = bus.subscribe();

    page.wishlist().add(&ProductId::new("apple")).await.unwrap();
    page.wishlist().add(&ProductId::new("milk")).await.unwrap();
    header.load().await.unwrap();
    let badge = header.badge();
    assert_eq!(badge.counts().wishlist, 2);

    assert!(page
        .wishlist()
        .remove_product(&ProductId::new("apple"))
        .await
        .unwrap());

    eventually(|| badge.counts().wishlist == 1).await;

    let mut last_count = None;
    while let Ok(event) = events.try_recv() {
        if let StoreEvent::WishlistChanged { count, .. } = event {
            last_count = Some(count);
        }
    }
    assert_eq!(last_count, Some(1));
}

#[tokio::test]
async fn test_badge_ignores_other_users() {
    let backend = FakeBackend::start().await;
    let bus = ChangeBus::new();
    let alice = backend.session_on(ALICE, bus.clone());
    let bob = backend.session_on(BOB, bus.clone());
    let badge = alice.badge();

    bob.wishlist().add(&ProductId::new("apple")).await.unwrap();
    let apple = alice
        .api()
        .get_product(&ProductId::new("apple"))
        .await
        .unwrap();
    alice
        .cart()
        .add(&apple, 2, &RateSelection::new("1kg", Price::from_rupees(50)))
        .await
        .unwrap();

    eventually(|| badge.counts().cart_items == 2).await;
    assert_eq!(badge.counts().wishlist, 0);
}

#[tokio::test]
async fn test_failed_add_leaves_list_unchanged() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    session.wishlist().fetch().await.unwrap();

    backend.fail_next(503, None);
    let err = session
        .wishlist()
        .add(&ProductId::new("apple"))
        .await
        .unwrap_err();
    assert!(err.is_status(503));
    assert!(session.wishlist().snapshot().is_empty());
    assert_eq!(
        session.wishlist().notices().current().unwrap().text,
        freshmart_client::GENERIC_FAILURE
    );
}

#[tokio::test]
async fn test_removing_unsaved_product_sends_nothing() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    session.wishlist().fetch().await.unwrap();

    let removed = session
        .wishlist()
        .remove_product(&ProductId::new("milk"))
        .await
        .unwrap();
    assert!(!removed);
    assert_eq!(backend.hits("DELETE /wishlist/:id"), 0);
}

#[tokio::test]
async fn test_saved_change_survives_failed_refresh() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    session.wishlist().fetch().await.unwrap();
    let mut changes = session.bus().subscribe();
    let apple = ProductId::new("apple");

    backend.fail_next_on("GET /wishlist/:userId", 503, None);
    let outcome = session.wishlist().add(&apple).await.unwrap();
    assert_eq!(outcome, AddOutcome::Added);
    assert!(session.wishlist().contains(&apple));
    assert!(!session.wishlist().is_loaded());
    assert!(matches!(
        changes.try_recv().unwrap(),
        StoreEvent::WishlistChanged { count: 1, .. }
    ));

    let again = session.wishlist().add(&apple).await.unwrap();
    assert_eq!(again, AddOutcome::AlreadyPresent);
    assert!(session.wishlist().is_loaded());
    assert_eq!(backend.hits("POST /wishlist"), 1);
    assert_eq!(backend.server_wishlist_len(ALICE), 1);

    backend.fail_next_on("GET /wishlist/:userId", 503, None);
    assert!(session.wishlist().remove_product(&apple).await.unwrap());
    assert!(session.wishlist().snapshot().is_empty());
    assert_eq!(backend.server_wishlist_len(ALICE), 0);
    assert!(matches!(
        changes.try_recv().unwrap(),
        StoreEvent::WishlistChanged { count: 0, .. }
    ));
}

#[tokio::test]
async fn test_add_before_first_fetch_loads_list() {
    let backend = FakeBackend::start().await;
    let other_window = backend.session(ALICE);
    other_window
        .wishlist()
        .add(&ProductId::new("apple"))
        .await
        .unwrap();

    let session = backend.session(ALICE);
    assert!(!session.wishlist().is_loaded());
    let outcome = session
        .wishlist()
        .add(&ProductId::new("apple"))
        .await
        .unwrap();
    assert_eq!(outcome, AddOutcome::AlreadyPresent);
    assert!(session.wishlist().is_loaded());
    assert_eq!(backend.hits("POST /wishlist"), 1);
    assert_eq!(backend.server_wishlist_len(ALICE), 1);
}

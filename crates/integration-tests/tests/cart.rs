//! Cart reconciliation against the fake backend.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use freshmart_client::{ClientError, NoticeKind, Session};
use freshmart_core::{LineKey, Price, Product, ProductId, RateSelection};
use freshmart_integration_tests::{ALICE, BOB, FakeBackend};

fn one_kg() -> RateSelection {
    RateSelection::new("1kg", Price::from_rupees(50))
}

fn half_kg() -> RateSelection {
    RateSelection::new("500g", Price::from_rupees(30))
}

async fn apple(session: &Session) -> Product {
    session
        .api()
        .get_product(&ProductId::new("apple"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_add_merges_same_unit_and_splits_units() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;

    session.cart().add(&apple, 1, &one_kg()).await.unwrap();
    let cart = session.cart().add(&apple, 1, &one_kg()).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.lines()[0].quantity, 2);
    assert_eq!(cart.lines_subtotal(), Price::from_rupees(100));

    let cart = session.cart().add(&apple, 1, &half_kg()).await.unwrap();
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.item_count(), 3);

    let cart = session
        .cart()
        .decrement(&LineKey::new("apple", "1kg"))
        .await
        .unwrap();
    assert_eq!(cart.item_count(), 2);
    session
        .cart()
        .decrement(&LineKey::new("apple", "1kg"))
        .await
        .unwrap();

    let cart = session.cart().snapshot();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.lines()[0].rate.key.as_str(), "500g");
    assert_eq!(backend.hits("DELETE /cart/remove"), 1);
}

#[tokio::test]
async fn test_totals_are_taken_from_server() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;

    let cart = session.cart().add(&apple, 3, &one_kg()).await.unwrap();
    let server = backend.server_cart(ALICE).unwrap();
    assert_eq!(cart.totals(), server.totals());
    assert_eq!(cart.totals().delivery_charge, Price::from_rupees(20));
    assert_eq!(cart.totals().grand_total, Price::parse("177.5").unwrap());
}

#[tokio::test]
async fn test_missing_cart_reads_as_empty() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);

    let cart = session.cart().fetch().await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.totals().grand_total, Price::ZERO);
    assert!(session.cart().state().loaded);
    assert!(session.cart().notices().current().is_none());
}

#[tokio::test]
async fn test_foreign_cart_is_not_shown() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;
    session.cart().add(&apple, 1, &one_kg()).await.unwrap();

    backend.report_cart_owner(BOB);
    let cart = session.cart().fetch().await.unwrap();
    assert!(cart.is_empty());
    assert!(session.cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_failure_keeps_snapshot_and_shows_server_message() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;
    let before = session.cart().add(&apple, 1, &one_kg()).await.unwrap();

    backend.fail_next(400, Some("Only 2 left in stock"));
    let err = session.cart().add(&apple, 5, &one_kg()).await.unwrap_err();
    assert!(err.is_status(400));
    assert_eq!(session.cart().snapshot(), before);

    let notice = session.cart().notices().current().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.text, "Only 2 left in stock");
}

#[tokio::test]
async fn test_garbled_response_is_a_parse_error() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;

    backend.garble_next();
    let err = session.cart().add(&apple, 1, &one_kg()).await.unwrap_err();
    assert!(matches!(err, ClientError::Parse(_)));
    assert!(session.cart().snapshot().is_empty());
    assert_eq!(
        session.cart().notices().current().unwrap().text,
        freshmart_client::GENERIC_FAILURE
    );
}

#[tokio::test]
async fn test_reply_without_cart_keeps_snapshot() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;
    let before = session.cart().add(&apple, 1, &one_kg()).await.unwrap();
    let mut changes = session.bus().subscribe();

    backend.fail_next(200, Some("Item added"));
    let err = session.cart().add(&apple, 1, &one_kg()).await.unwrap_err();
    assert!(matches!(err, ClientError::Parse(_)));

    assert_eq!(session.cart().snapshot(), before);
    assert_eq!(session.cart().snapshot().len(), 1);
    assert!(changes.try_recv().is_err());
    assert_eq!(
        session.cart().notices().current().unwrap().kind,
        NoticeKind::Error
    );
}

#[tokio::test]
async fn test_invalid_requests_are_not_sent() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;

    let err = session.cart().add(&apple, 0, &one_kg()).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let err = session
        .cart()
        .add(&apple, 1, &RateSelection::placeholder())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let err = session
        .cart()
        .remove(&apple.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MissingRate(_)));

    assert_eq!(backend.hits("POST /cart/add"), 0);
    assert_eq!(backend.hits("DELETE /cart/remove"), 0);
}

#[tokio::test]
async fn test_update_without_unit_is_refused_when_ambiguous() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;
    session.cart().add(&apple, 1, &one_kg()).await.unwrap();
    session.cart().add(&apple, 1, &half_kg()).await.unwrap();

    let err = session
        .cart()
        .update(&apple.id, 4, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MissingRate(_)));
    assert_eq!(backend.hits("POST /cart/update"), 0);
}

#[tokio::test]
async fn test_update_moves_line_to_new_unit() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;
    session.cart().add(&apple, 2, &one_kg()).await.unwrap();

    let cart = session
        .cart()
        .update(&apple.id, 3, Some(&one_kg()), Some(&half_kg()))
        .await
        .unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.lines()[0].rate, half_kg());
    assert_eq!(cart.lines()[0].quantity, 3);
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;
    session.cart().add(&apple, 2, &one_kg()).await.unwrap();

    let cart = session
        .cart()
        .update(&apple.id, 0, None, None)
        .await
        .unwrap();
    assert!(cart.is_empty());
    assert_eq!(backend.hits("POST /cart/update"), 0);
    assert_eq!(backend.hits("DELETE /cart/remove"), 1);
}

#[tokio::test]
async fn test_concurrent_increments_both_count() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;
    session.cart().add(&apple, 1, &one_kg()).await.unwrap();

    let key = LineKey::new("apple", "1kg");
    backend.delay_next(Duration::from_millis(150));
    let (a, b) = tokio::join!(session.cart().increment(&key), session.cart().increment(&key));
    a.unwrap();
    b.unwrap();

    assert_eq!(session.cart().snapshot().line(&key).unwrap().quantity, 3);
    assert_eq!(backend.server_cart(ALICE).unwrap().item_count(), 3);
}

#[tokio::test]
async fn test_slow_first_update_does_not_overwrite_second() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;
    session.cart().add(&apple, 1, &one_kg()).await.unwrap();

    backend.delay_next(Duration::from_millis(150));
    let unit = one_kg();
    let first = session.cart().update(&apple.id, 5, Some(&unit), None);
    let second = session.cart().update(&apple.id, 2, Some(&unit), None);
    let (first, second) = tokio::join!(first, second);
    first.unwrap();
    second.unwrap();

    let state = session.cart().state();
    assert_eq!(state.cart.lines()[0].quantity, 2);
    assert_eq!(backend.server_cart(ALICE).unwrap().lines()[0].quantity, 2);
}

#[tokio::test]
async fn test_resolver_follows_cart() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let apple = apple(&session).await;

    let fresh = session.cart().resolve(&apple);
    assert_eq!(fresh.selection.key.as_str(), "1kg");
    assert!(fresh.can_add);

    session.cart().add(&apple, 1, &half_kg()).await.unwrap();
    let resolved = session.cart().resolve(&apple);
    assert_eq!(resolved.selection, half_kg());
}

#[tokio::test]
async fn test_product_with_unusable_rates_cannot_be_added() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let saffron = session
        .api()
        .get_product(&ProductId::new("saffron"))
        .await
        .unwrap();

    assert!(saffron.rates.is_empty());
    let resolution = session.cart().resolve(&saffron);
    assert!(!resolution.can_add);
    assert!(resolution.selection.is_placeholder());
}

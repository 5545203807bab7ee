//! Checkout and the delivery-centre desk.

#![allow(clippy::unwrap_used)]

use freshmart_client::{ClientError, Session};
use freshmart_core::{
    CheckoutDetails, DeliveryAddress, DeliveryCentreId, DeliverySlot, LineKey, Order,
    OrderAction, OrderStatus, Price, ProductId, RateSelection,
};
use freshmart_integration_tests::{ALICE, FakeBackend};

fn details() -> CheckoutDetails {
    CheckoutDetails {
        address: DeliveryAddress {
            name: "Alice".to_string(),
            line1: "12 MG Road".to_string(),
            line2: None,
            city: "Pune".to_string(),
            pincode: "411001".to_string(),
            phone: "9876543210".to_string(),
        },
        slot: DeliverySlot {
            day: "Monday".to_string(),
            time: "9am-12pm".to_string(),
        },
        delivery_centre: DeliveryCentreId::new("dc-north"),
        notes: Some("Ring twice".to_string()),
    }
}

/// Two apples (1kg) and one milk: 160 + 8 GST + 20 delivery.
async fn place_order(session: &Session) -> Order {
    let api = session.api();
    let apple = api.get_product(&ProductId::new("apple")).await.unwrap();
    let milk = api.get_product(&ProductId::new("milk")).await.unwrap();
    session
        .cart()
        .add(&apple, 2, &RateSelection::new("1kg", Price::from_rupees(50)))
        .await
        .unwrap();
    session
        .cart()
        .add(&milk, 1, &RateSelection::new("1l", Price::from_rupees(60)))
        .await
        .unwrap();
    session.cart().checkout(&details()).await.unwrap()
}

#[tokio::test]
async fn test_checkout_clears_cart_and_creates_order() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);

    let order = place_order(&session).await;
    assert_eq!(order.status, OrderStatus::OrderPlaced);
    assert_eq!(order.lines.len(), 2);
    assert_eq!(order.totals.grand_total, Price::from_rupees(188));
    assert_eq!(order.notes.as_deref(), Some("Ring twice"));

    assert!(session.cart().snapshot().is_empty());
    assert!(backend.server_cart(ALICE).unwrap().is_empty());
    assert!(backend.server_order(&order.id).is_some());
    assert_eq!(
        session.cart().notices().current().unwrap().text,
        "Order placed successfully"
    );

    let history = session.orders().fetch().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, order.id);
}

#[tokio::test]
async fn test_checkout_rejects_bad_details_and_empty_cart() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);

    let err = session.cart().checkout(&details()).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let mut bad = details();
    bad.address.phone = "12345".to_string();
    let err = session.cart().checkout(&bad).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    assert_eq!(backend.hits("POST /createorder"), 0);
}

#[tokio::test]
async fn test_actual_quantities_recompute_and_save() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let order = place_order(&session).await;
    let desk = session.orders();
    desk.open(&order.id).await.unwrap();

    let apples = LineKey::new("apple", "1kg");
    let total = desk.set_actual_quantity(&order.id, &apples, 1).unwrap();
    assert_eq!(total, Price::from_rupees(138));
    assert_eq!(backend.hits("PUT /orders/:id/actual"), 0);

    let err = desk.set_actual_quantity(&order.id, &apples, 3).unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(
        desk.order(&order.id).unwrap().actual_grand_total,
        Some(Price::from_rupees(138))
    );

    let saved = desk.save_actual(&order.id).await.unwrap();
    assert_eq!(saved.actual_grand_total, Some(Price::from_rupees(138)));
    let server = backend.server_order(&order.id).unwrap();
    let line = server.lines.iter().find(|l| l.key() == apples).unwrap();
    assert_eq!(line.actual_quantity, Some(1));
    assert_eq!(line.actual_subtotal, Some(Price::from_rupees(50)));
}

#[tokio::test]
async fn test_clearing_actual_quantity_restores_quote() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let order = place_order(&session).await;
    let desk = session.orders();
    desk.open(&order.id).await.unwrap();

    let apples = LineKey::new("apple", "1kg");
    desk.set_actual_quantity(&order.id, &apples, 0).unwrap();
    let total = desk.clear_actual_quantity(&order.id, &apples).unwrap();
    assert_eq!(total, order.totals.grand_total);
    assert_eq!(desk.order(&order.id).unwrap().actual_grand_total, None);
}

#[tokio::test]
async fn test_status_actions_follow_the_machine() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let order = place_order(&session).await;
    let desk = session.orders();
    desk.open(&order.id).await.unwrap();

    let err = desk
        .apply_action(&order.id, OrderAction::Deliver)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidTransition(_)));
    assert_eq!(backend.hits("PUT /orders/:id/status"), 0);

    let confirmed = desk
        .apply_action(&order.id, OrderAction::Confirm)
        .await
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    assert_eq!(confirmed.actions(), &[OrderAction::Deliver]);

    let delivered = desk
        .apply_action(&order.id, OrderAction::Deliver)
        .await
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.status.is_terminal());
    assert_eq!(
        backend.server_order(&order.id).unwrap().status,
        OrderStatus::Delivered
    );

    let err = desk
        .apply_action(&order.id, OrderAction::Cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidTransition(_)));
    assert_eq!(backend.hits("PUT /orders/:id/status"), 2);
}

#[tokio::test]
async fn test_desk_requires_loaded_order() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let order = place_order(&session).await;

    let err = session
        .orders()
        .set_actual_quantity(&order.id, &LineKey::new("apple", "1kg"), 1)
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

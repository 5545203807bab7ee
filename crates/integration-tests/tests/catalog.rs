//! Catalog reads and their cache.

#![allow(clippy::unwrap_used)]

use freshmart_core::{CategoryId, ProductId};
use freshmart_integration_tests::{ALICE, FakeBackend};
use serde_json::json;

#[tokio::test]
async fn test_product_list_is_cached() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);

    let first = session.api().get_products(None).await.unwrap();
    let second = session.api().get_products(None).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(backend.hits("GET /products"), 1);

    session.api().invalidate_all().await;
    session.api().get_products(None).await.unwrap();
    assert_eq!(backend.hits("GET /products"), 2);
}

#[tokio::test]
async fn test_category_filter_has_its_own_entry() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);

    let fruits = session
        .api()
        .get_products(Some(&CategoryId::new("fruits")))
        .await
        .unwrap();
    assert_eq!(fruits.len(), 1);
    assert_eq!(fruits[0].id.as_str(), "apple");

    let all = session.api().get_products(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(backend.hits("GET /products"), 2);
}

#[tokio::test]
async fn test_invalidated_product_is_refetched() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);
    let id = ProductId::new("milk");

    let before = session.api().get_product(&id).await.unwrap();
    assert_eq!(before.rates.len(), 1);

    backend.replace_product(json!({
        "_id": "milk",
        "prod_Name": "Milk",
        "prod_category": {"_id": "dairy", "name": "Dairy"},
        "prod_Rate": [{"1l": 60}, {"500ml": 32}],
        "isActive": true,
        "images": ["milk.jpg"]
    }));

    let cached = session.api().get_product(&id).await.unwrap();
    assert_eq!(cached.rates.len(), 1);

    session.api().invalidate_product(&id).await;
    let fresh = session.api().get_product(&id).await.unwrap();
    assert_eq!(fresh.rates.len(), 2);
    assert_eq!(backend.hits("GET /products/:id"), 2);
}

#[tokio::test]
async fn test_inactive_centres_are_hidden() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);

    let centres = session.delivery_centres().await.unwrap();
    assert_eq!(centres.len(), 1);
    assert_eq!(centres[0].name, "North Hub");

    let categories = session.categories().await.unwrap();
    assert_eq!(categories.len(), 3);
    assert!(categories.iter().any(|c| !c.active));
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let backend = FakeBackend::start().await;
    let session = backend.session(ALICE);

    let err = session
        .api()
        .get_product(&ProductId::new("durian"))
        .await
        .unwrap_err();
    assert!(err.is_status(404));
}

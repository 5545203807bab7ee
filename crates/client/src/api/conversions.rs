//! Wire to domain conversions.
//!
//! Malformed documents are rejected here with [`ClientError::Malformed`]
//! instead of leaking zero quantities, missing units or unparseable prices
//! into the stores.

use freshmart_core::{
    Cart, CartLine, CartTotals, Category, CategoryId, CategoryRef, DeliveryAddress,
    DeliveryCentre, DeliveryCentreId, DeliverySlot, LineDisplay, Order, OrderId, OrderLine,
    OrderStatus, Product, ProductId, RateSelection, UserId, Wishlist, WishlistEntry,
    WishlistEntryId, parse_rates,
};
use serde_json::Value;
use tracing::warn;

use super::wire::{
    AddressWire, CartItemWire, CartWire, CategoryWire, DeliveryCentreWire, OrderItemWire,
    OrderWire, ProductWire, WishlistEntryWire,
};
use crate::error::{ClientError, Result};

// =============================================================================
// Helpers
// =============================================================================

/// Label of a category field that is either a plain string or a populated
/// category document.
fn category_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => ["name", "category_Name", "title"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Id of a reference field that is either a plain id or a populated document.
fn reference_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn positive_quantity(raw: i64, what: &str) -> Result<u32> {
    u32::try_from(raw)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| ClientError::Malformed(format!("{what} has quantity {raw}")))
}

fn required_rate(rate: Option<RateSelection>, product: &str) -> Result<RateSelection> {
    rate.filter(|r| !r.is_placeholder())
        .ok_or_else(|| ClientError::Malformed(format!("line for product {product} has no unit")))
}

// =============================================================================
// Cart
// =============================================================================

/// Convert a cart snapshot.
pub fn convert_cart(wire: CartWire) -> Result<Cart> {
    let lines = wire
        .items
        .into_iter()
        .map(convert_cart_line)
        .collect::<Result<Vec<_>>>()?;
    let totals = CartTotals {
        total: wire.total,
        gst: wire.gst,
        delivery_charge: wire.delivery_charge,
        discount: wire.discount,
        grand_total: wire.grand_total,
    };
    let owner = wire.user_id.filter(|u| !u.trim().is_empty()).map(UserId::new);
    Ok(Cart::from_parts(owner, lines, totals)?)
}

fn convert_cart_line(item: CartItemWire) -> Result<CartLine> {
    if item.prod_id.trim().is_empty() {
        return Err(ClientError::Malformed("cart line without prod_ID".to_string()));
    }
    let rate = required_rate(item.selected_rate, &item.prod_id)?;
    let quantity = positive_quantity(item.quantity, &format!("cart line {}", item.prod_id))?;
    Ok(CartLine {
        product_id: ProductId::new(item.prod_id),
        rate,
        quantity,
        display: LineDisplay {
            name: item.prod_name,
            image: item.image,
            category: category_label(&item.prod_category),
        },
        rates: parse_rates(&item.prod_rate),
    })
}

/// Cart line as an order line for `POST /createorder`.
pub fn order_item_from_line(line: &CartLine) -> OrderItemWire {
    OrderItemWire {
        prod_id: line.product_id.to_string(),
        prod_name: line.display.name.clone(),
        image: line.display.image.clone(),
        prod_category: Value::String(line.display.category.clone()),
        selected_rate: Some(line.rate.clone()),
        quantity: Some(i64::from(line.quantity)),
        order_quantity: Some(i64::from(line.quantity)),
        subtotal: Some(line.subtotal()),
        actual_quantity: None,
        actual_subtotal: None,
    }
}

// =============================================================================
// Orders
// =============================================================================

fn parse_status(raw: Option<&str>) -> Result<OrderStatus> {
    let Some(raw) = raw else {
        return Ok(OrderStatus::default());
    };
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|_| ClientError::Malformed(format!("unknown order status {raw:?}")))
}

/// Convert an order document.
pub fn convert_order(wire: OrderWire) -> Result<Order> {
    let status = parse_status(wire.status.as_deref())?;
    let lines = wire
        .items
        .into_iter()
        .map(convert_order_line)
        .collect::<Result<Vec<_>>>()?;

    let mut order = Order {
        id: OrderId::new(wire.id),
        user_id: UserId::new(wire.user_id),
        lines,
        totals: CartTotals {
            total: wire.total,
            gst: wire.gst,
            delivery_charge: wire.delivery_charge,
            discount: wire.discount,
            grand_total: wire.grand_total,
        },
        actual_grand_total: wire.actual_grand_total,
        status,
        address: convert_address(wire.address),
        slot: DeliverySlot {
            day: wire.delivery_day,
            time: wire.delivery_time,
        },
        delivery_centre: wire
            .delivery_centre
            .filter(|c| !c.trim().is_empty())
            .map(DeliveryCentreId::new),
        notes: wire.notes,
        created_at: wire.created_at,
    };

    // The stored total is only a cache of the formula; trust the lines.
    if order.lines.iter().any(|l| l.actual_subtotal.is_some()) {
        let computed = order.compute_actual_grand_total();
        if order.actual_grand_total.is_some_and(|stored| stored != computed) {
            warn!(
                order_id = %order.id,
                stored = %order.actual_grand_total.unwrap_or_default(),
                computed = %computed,
                "Stored actual grand total disagrees with lines, using computed"
            );
        }
        order.actual_grand_total = Some(computed);
    }

    Ok(order)
}

fn convert_order_line(item: OrderItemWire) -> Result<OrderLine> {
    let rate = required_rate(item.selected_rate, &item.prod_id)?;
    let what = format!("order line {}", item.prod_id);
    let raw_quantity = item.order_quantity.or(item.quantity).unwrap_or(0);
    let quantity = positive_quantity(raw_quantity, &what)?;
    let actual_quantity = item
        .actual_quantity
        .map(|q| {
            u32::try_from(q)
                .map_err(|_| ClientError::Malformed(format!("{what} has actual quantity {q}")))
        })
        .transpose()?;
    let actual_subtotal = match (item.actual_subtotal, actual_quantity) {
        (Some(subtotal), _) => Some(subtotal),
        (None, Some(q)) => Some(rate.value.times(q)),
        (None, None) => None,
    };

    Ok(OrderLine {
        product_id: ProductId::new(item.prod_id),
        subtotal: item.subtotal.unwrap_or_else(|| rate.value.times(quantity)),
        rate,
        quantity,
        display: LineDisplay {
            name: item.prod_name,
            image: item.image,
            category: category_label(&item.prod_category),
        },
        actual_quantity,
        actual_subtotal,
    })
}

fn convert_address(wire: AddressWire) -> DeliveryAddress {
    DeliveryAddress {
        name: wire.name,
        line1: wire.line1,
        line2: wire.line2,
        city: wire.city,
        pincode: wire.pincode,
        phone: wire.phone,
    }
}

/// Address as sent with a new order.
pub fn address_to_wire(address: &DeliveryAddress) -> AddressWire {
    AddressWire {
        name: address.name.clone(),
        line1: address.line1.clone(),
        line2: address.line2.clone(),
        city: address.city.clone(),
        pincode: address.pincode.clone(),
        phone: address.phone.clone(),
    }
}

// =============================================================================
// Wishlist
// =============================================================================

/// Convert a fetched wishlist.
pub fn convert_wishlist(owner: &UserId, entries: Vec<WishlistEntryWire>) -> Result<Wishlist> {
    let entries = entries
        .into_iter()
        .map(|e| {
            let product_id = reference_id(&e.prod_id).ok_or_else(|| {
                ClientError::Malformed(format!("wishlist entry {} has no product", e.id))
            })?;
            Ok(WishlistEntry {
                id: WishlistEntryId::new(e.id),
                product_id: ProductId::new(product_id),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Wishlist::new(Some(owner.clone()), entries))
}

// =============================================================================
// Catalog
// =============================================================================

/// Convert a product. Invalid rate entries are dropped, not fatal.
pub fn convert_product(wire: ProductWire) -> Product {
    let rates = parse_rates(&wire.rates);
    if rates.len() != wire.rates.len() {
        warn!(
            product_id = %wire.id,
            dropped = wire.rates.len() - rates.len(),
            "Dropped invalid rate options"
        );
    }
    let mut images = wire.images;
    if let Some(image) = wire.image
        && !images.contains(&image)
    {
        images.insert(0, image);
    }
    Product {
        id: ProductId::new(wire.id),
        name: wire.name,
        category: CategoryRef {
            id: reference_id(&wire.category).map(CategoryId::new),
            name: category_label(&wire.category),
        },
        rates,
        stock: wire.stock,
        active: wire.active,
        images,
    }
}

/// Convert a category.
pub fn convert_category(wire: CategoryWire) -> Category {
    Category {
        id: CategoryId::new(wire.id),
        name: wire.name,
        image: wire.image,
        active: wire.active,
    }
}

/// Convert a delivery centre.
pub fn convert_delivery_centre(wire: DeliveryCentreWire) -> DeliveryCentre {
    DeliveryCentre {
        id: DeliveryCentreId::new(wire.id),
        name: wire.name,
        address: wire.address,
        active: wire.active,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use freshmart_core::{LineKey, Price};
    use serde_json::json;

    use super::*;
    use crate::api::wire::CartEnvelope;

    fn cart_from(value: Value) -> Result<Cart> {
        let wire: CartEnvelope = serde_json::from_value(value).unwrap();
        convert_cart(wire.into_inner())
    }

    #[test]
    fn test_convert_cart() {
        let cart = cart_from(json!({
            "user_id": "u1",
            "items": [{
                "prod_ID": "A",
                "prod_Name": "Apple",
                "image": "apple.jpg",
                "selectedRate": {"key": "1kg", "value": 50},
                "quantity": 2,
                "prod_Rate": [{"1kg": 50}, {"500g": 30}],
                "prod_category": {"_id": "c1", "name": "Fruits"}
            }],
            "total": 100, "gst": 5, "deliveryCharge": 20, "discount": 0, "grandTotal": 125
        }))
        .unwrap();

        assert!(cart.is_owned_by(&UserId::new("u1")));
        let line = cart.line(&LineKey::new("A", "1kg")).unwrap();
        assert_eq!(line.subtotal(), Price::from_rupees(100));
        assert_eq!(line.display.category, "Fruits");
        assert_eq!(line.rates.len(), 2);
        assert_eq!(cart.totals().grand_total, Price::from_rupees(125));
    }

    #[test]
    fn test_reject_zero_quantity_line() {
        let err = cart_from(json!({
            "user_id": "u1",
            "items": [{"prod_ID": "A", "selectedRate": {"key": "1kg", "value": 50}, "quantity": 0}]
        }))
        .unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));
    }

    #[test]
    fn test_reject_line_without_unit() {
        let err = cart_from(json!({
            "user_id": "u1",
            "items": [{"prod_ID": "A", "selectedRate": null, "quantity": 1}]
        }))
        .unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));
    }

    #[test]
    fn test_reject_duplicate_lines() {
        let item = json!({"prod_ID": "A", "selectedRate": {"key": "1kg", "value": 50}, "quantity": 1});
        let err = cart_from(json!({"user_id": "u1", "items": [item.clone(), item]})).unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));
    }

    #[test]
    fn test_convert_order_recomputes_actual_total() {
        let wire: OrderWire = serde_json::from_value(json!({
            "_id": "o1",
            "user_id": "u1",
            "items": [
                {"prod_ID": "A", "selectedRate": {"key": "1kg", "value": 50},
                 "quantity": 2, "order_quantity": 2, "subtotal": 100, "actual_quantity": 1},
                {"prod_ID": "B", "selectedRate": {"key": "500g", "value": 30},
                 "order_quantity": 1, "subtotal": 30}
            ],
            "total": 130, "gst": 0, "deliveryCharge": 20, "discount": 10, "grandTotal": 140,
            "actual_grandTotal": 999,
            "status": "Confirmed"
        }))
        .unwrap();
        let order = convert_order(wire).unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        // 50 + 30 + 0 + 20 - 10
        assert_eq!(order.actual_grand_total, Some(Price::from_rupees(90)));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let wire: OrderWire =
            serde_json::from_value(json!({"_id": "o1", "status": "Shipped"})).unwrap();
        assert!(matches!(convert_order(wire), Err(ClientError::Malformed(_))));
    }

    #[test]
    fn test_convert_product_drops_invalid_rates() {
        let wire: ProductWire = serde_json::from_value(json!({
            "_id": "p1",
            "prod_Name": "Onion",
            "prod_category": "c9",
            "prod_Rate": [{"1kg": "abc"}, {"2kg": 70}],
            "stock": 4,
            "image": "onion.jpg"
        }))
        .unwrap();
        let product = convert_product(wire);
        assert_eq!(product.rates.len(), 1);
        assert_eq!(product.category.id, Some(CategoryId::new("c9")));
        assert_eq!(product.primary_image(), Some("onion.jpg"));
        assert!(product.active);
    }

    #[test]
    fn test_wishlist_populated_product() {
        let entries: Vec<WishlistEntryWire> = serde_json::from_value(json!([
            {"_id": "w1", "prod_ID": "p1"},
            {"_id": "w2", "prod_ID": {"_id": "p2", "prod_Name": "Milk"}}
        ]))
        .unwrap();
        let w = convert_wishlist(&UserId::new("u1"), entries).unwrap();
        assert!(w.contains(&ProductId::new("p2")));
        assert_eq!(w.len(), 2);
    }
}

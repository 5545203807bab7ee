//! Checkout, order history and the delivery-centre desk.
//!
//! # Usage
//!
//! ```bash
//! fm-cli checkout --name "A. Kumar" --line1 "12 MG Road" --city Pune \
//!     --pincode 411001 --phone 9876543210 --day Monday --time "9am-12pm" \
//!     --centre dc1
//! fm-cli orders list
//! fm-cli desk actual <order-id> <product-id> <unit> <quantity>
//! fm-cli desk action <order-id> confirm
//! ```

use freshmart_client::Session;
use freshmart_core::{
    CheckoutDetails, DeliveryAddress, DeliveryCentreId, DeliverySlot, LineKey, OrderAction,
    OrderId,
};

use super::{CommandResult, print_order};

/// Delivery details collected at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutArgs {
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub pincode: String,
    pub phone: String,
    pub day: String,
    pub time: String,
    pub centre: String,
    pub notes: Option<String>,
}

impl From<CheckoutArgs> for CheckoutDetails {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            address: DeliveryAddress {
                name: args.name,
                line1: args.line1,
                line2: args.line2,
                city: args.city,
                pincode: args.pincode,
                phone: args.phone,
            },
            slot: DeliverySlot {
                day: args.day,
                time: args.time,
            },
            delivery_centre: DeliveryCentreId::new(args.centre),
            notes: args.notes,
        }
    }
}

/// Place an order for the current cart.
pub async fn checkout(session: &Session, args: CheckoutArgs) -> CommandResult {
    session.cart().fetch().await?;
    let order = session.cart().checkout(&args.into()).await?;
    tracing::info!("Order placed");
    print_order(&order);
    Ok(())
}

/// List orders.
pub async fn list(session: &Session) -> CommandResult {
    let orders = session.orders().fetch().await?;
    if orders.is_empty() {
        tracing::info!("No orders yet");
    }
    for order in &orders {
        tracing::info!(
            "{:<26} {:<14} {:>10} {}",
            order.id.to_string(),
            order.status.to_string(),
            order.totals.grand_total.to_string(),
            order
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// Show one order.
pub async fn show(session: &Session, order_id: &str) -> CommandResult {
    let order = session.orders().open(&OrderId::new(order_id)).await?;
    print_order(&order);
    Ok(())
}

/// Record and save the delivered quantity of one line.
pub async fn record_actual(
    session: &Session,
    order_id: &str,
    product_id: &str,
    unit: &str,
    quantity: u32,
) -> CommandResult {
    let order_id = OrderId::new(order_id);
    let desk = session.orders();
    desk.open(&order_id).await?;
    let total = desk.set_actual_quantity(&order_id, &LineKey::new(product_id, unit), quantity)?;
    tracing::info!("Actual grand total is now {total}");
    let saved = desk.save_actual(&order_id).await?;
    print_order(&saved);
    Ok(())
}

/// Take a status action on an order.
pub async fn action(session: &Session, order_id: &str, action: OrderAction) -> CommandResult {
    let order_id = OrderId::new(order_id);
    let desk = session.orders();
    desk.open(&order_id).await?;
    let order = desk.apply_action(&order_id, action).await?;
    print_order(&order);
    Ok(())
}

//! Command implementations.
//!
//! Output goes through `tracing` like every other message, so `--quiet`
//! style control is just `RUST_LOG`.

pub mod cart;
pub mod catalog;
pub mod orders;
pub mod wishlist;

use freshmart_client::ClientError;
use freshmart_core::{Cart, Order, Product, RateSelection};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The client rejected or failed the operation.
    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),

    /// The product does not offer the requested unit.
    #[error("Product {product} has no unit {unit}")]
    UnknownUnit { product: String, unit: String },

    /// No cart line for the product in the requested unit.
    #[error("{product} ({unit}) is not in the cart")]
    NotInCart { product: String, unit: String },
}

/// Result type alias for commands.
pub type CommandResult<T = ()> = Result<T, CommandError>;

/// Selection for `unit` of `product`, at the product's current price.
fn product_unit(product: &Product, unit: &str) -> CommandResult<RateSelection> {
    product
        .rate_for(unit)
        .map(freshmart_core::RateOption::selection)
        .ok_or_else(|| CommandError::UnknownUnit {
            product: product.id.to_string(),
            unit: unit.to_string(),
        })
}

/// Log a cart the way the cart page lays it out.
fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        tracing::info!("Your cart is empty");
        return;
    }
    for line in cart.lines() {
        tracing::info!(
            "{:<24} {:>6} x {:<8} {:>10}  {}",
            line.display.name,
            line.quantity,
            line.rate.key,
            line.subtotal().to_string(),
            line.product_id
        );
    }
    let totals = cart.totals();
    tracing::info!("{:>52}", format!("Total       {}", totals.total));
    tracing::info!("{:>52}", format!("GST         {}", totals.gst));
    tracing::info!("{:>52}", format!("Delivery    {}", totals.delivery_charge));
    tracing::info!("{:>52}", format!("Discount    {}", totals.discount));
    tracing::info!("{:>52}", format!("Grand total {}", totals.grand_total));
}

/// Log an order with its fulfilled quantities.
fn print_order(order: &Order) {
    tracing::info!(
        "Order {} - {} - {} {}",
        order.id,
        order.status,
        order.slot.day,
        order.slot.time
    );
    for line in &order.lines {
        let actual = line
            .actual_quantity
            .map_or_else(String::new, |q| format!(" (delivered {q})"));
        tracing::info!(
            "  {:<24} {:>4} x {:<8} {:>10}{}",
            line.display.name,
            line.quantity,
            line.rate.key,
            line.effective_subtotal().to_string(),
            actual
        );
    }
    tracing::info!("  Grand total {}", order.totals.grand_total);
    if let Some(actual) = order.actual_grand_total {
        tracing::info!("  Actual grand total {actual}");
    }
    let actions = order.actions();
    if !actions.is_empty() {
        let names: Vec<String> = actions.iter().map(|a| format!("{a:?}").to_lowercase()).collect();
        tracing::info!("  Available actions: {}", names.join(", "));
    }
}

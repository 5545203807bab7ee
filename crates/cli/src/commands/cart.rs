//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! fm-cli cart show
//! fm-cli cart add <product-id> --unit 1kg --quantity 2
//! fm-cli cart update <product-id> 3 --unit 1kg --new-unit 500g
//! fm-cli cart inc <product-id> --unit 1kg
//! fm-cli cart dec <product-id> --unit 1kg
//! fm-cli cart remove <product-id> --unit 500g
//! ```

use freshmart_client::Session;
use freshmart_core::{LineKey, ProductId, RateSelection};

use super::{CommandError, CommandResult, print_cart, product_unit};

/// Show the cart.
pub async fn show(session: &Session) -> CommandResult {
    let cart = session.cart().fetch().await?;
    print_cart(&cart);
    Ok(())
}

/// Add a product. Without `--unit` the unit the product page would show is
/// used.
pub async fn add(
    session: &Session,
    product_id: &str,
    unit: Option<&str>,
    quantity: u32,
) -> CommandResult {
    session.cart().fetch().await?;
    let product = session.api().get_product(&ProductId::new(product_id)).await?;

    let selection = match unit {
        Some(unit) => product_unit(&product, unit)?,
        None => session.cart().resolve(&product).selection,
    };
    let cart = session.cart().add(&product, quantity, &selection).await?;
    tracing::info!("Added {} x {} {}", quantity, selection.key, product.name);
    print_cart(&cart);
    Ok(())
}

/// Set a line's quantity, optionally moving it to another unit.
pub async fn update(
    session: &Session,
    product_id: &str,
    quantity: u32,
    unit: Option<&str>,
    new_unit: Option<&str>,
) -> CommandResult {
    let product_id = ProductId::new(product_id);
    session.cart().fetch().await?;

    let current = unit
        .map(|u| line_rate(session, &product_id, u))
        .transpose()?;
    let new_rate = match new_unit {
        Some(u) => {
            let product = session.api().get_product(&product_id).await?;
            Some(product_unit(&product, u)?)
        }
        None => None,
    };

    let cart = session
        .cart()
        .update(&product_id, quantity, current.as_ref(), new_rate.as_ref())
        .await?;
    print_cart(&cart);
    Ok(())
}

/// Increase a line by one.
pub async fn increment(session: &Session, product_id: &str, unit: &str) -> CommandResult {
    session.cart().fetch().await?;
    let cart = session
        .cart()
        .increment(&LineKey::new(product_id, unit))
        .await?;
    print_cart(&cart);
    Ok(())
}

/// Decrease a line by one, removing it at zero.
pub async fn decrement(session: &Session, product_id: &str, unit: &str) -> CommandResult {
    session.cart().fetch().await?;
    let cart = session
        .cart()
        .decrement(&LineKey::new(product_id, unit))
        .await?;
    print_cart(&cart);
    Ok(())
}

/// Remove a line.
pub async fn remove(session: &Session, product_id: &str, unit: Option<&str>) -> CommandResult {
    let product_id = ProductId::new(product_id);
    session.cart().fetch().await?;
    let rate = unit
        .map(|u| line_rate(session, &product_id, u))
        .transpose()?;
    let cart = session.cart().remove(&product_id, rate.as_ref()).await?;
    print_cart(&cart);
    Ok(())
}

/// Rate of the cart line for `product_id` in `unit`.
fn line_rate(session: &Session, product_id: &ProductId, unit: &str) -> CommandResult<RateSelection> {
    session
        .cart()
        .snapshot()
        .line(&LineKey::new(product_id.clone(), unit))
        .map(|line| line.rate.clone())
        .ok_or_else(|| CommandError::NotInCart {
            product: product_id.to_string(),
            unit: unit.to_string(),
        })
}

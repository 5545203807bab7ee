//! Catalog browsing.

use freshmart_client::Session;
use freshmart_core::CategoryId;

use super::CommandResult;

/// List products, optionally within a category, with the unit a product
/// card would preselect.
pub async fn products(session: &Session, category: Option<&str>) -> CommandResult {
    let category = category.map(CategoryId::new);
    session.cart().fetch().await?;
    let products = session.api().get_products(category.as_ref()).await?;

    for product in products.iter().filter(|p| p.active) {
        let resolution = session.cart().resolve(product);
        let units: Vec<String> = product
            .rates
            .iter()
            .map(|r| format!("{} {}", r.unit, r.price))
            .collect();
        let marker = if resolution.can_add { "" } else { "  [unavailable]" };
        tracing::info!(
            "{:<24} {:<12} selected {:<8} {}{}",
            product.name,
            product.id,
            resolution.selection.key,
            units.join(", "),
            marker
        );
    }
    Ok(())
}

/// List categories.
pub async fn categories(session: &Session) -> CommandResult {
    for category in session.categories().await?.iter().filter(|c| c.active) {
        tracing::info!("{:<24} {}", category.name, category.id);
    }
    Ok(())
}

/// List delivery centres.
pub async fn centres(session: &Session) -> CommandResult {
    for centre in session.delivery_centres().await? {
        tracing::info!("{:<24} {:<12} {}", centre.name, centre.id, centre.address);
    }
    Ok(())
}

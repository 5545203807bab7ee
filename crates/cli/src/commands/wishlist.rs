//! Wishlist commands.

use freshmart_client::{AddOutcome, Session};
use freshmart_core::ProductId;

use super::CommandResult;

/// List saved products.
pub async fn show(session: &Session) -> CommandResult {
    let wishlist = session.wishlist().fetch().await?;
    if wishlist.is_empty() {
        tracing::info!("Your wishlist is empty");
        return Ok(());
    }
    for entry in wishlist.entries() {
        tracing::info!("{}  (entry {})", entry.product_id, entry.id);
    }
    tracing::info!("{} saved", wishlist.len());
    Ok(())
}

/// Save a product.
pub async fn add(session: &Session, product_id: &str) -> CommandResult {
    session.wishlist().fetch().await?;
    match session.wishlist().add(&ProductId::new(product_id)).await? {
        AddOutcome::Added => tracing::info!("{}", freshmart_client::store::ADDED_NOTICE),
        AddOutcome::AlreadyPresent => {
            tracing::info!("{}", freshmart_client::store::ALREADY_PRESENT_NOTICE);
        }
    }
    tracing::info!("{} saved", session.wishlist().snapshot().len());
    Ok(())
}

/// Remove a saved product.
pub async fn remove(session: &Session, product_id: &str) -> CommandResult {
    session.wishlist().fetch().await?;
    if session
        .wishlist()
        .remove_product(&ProductId::new(product_id))
        .await?
    {
        tracing::info!("{}", freshmart_client::store::REMOVED_NOTICE);
    } else {
        tracing::info!("{product_id} is not in your wishlist");
    }
    tracing::info!("{} saved", session.wishlist().snapshot().len());
    Ok(())
}

//! Delete a product.

use anyhow::{Context, Result};
use hub_client::{EntityId, HubRegistry};

use crate::product::Product;

/// Run the delete command.
pub async fn run(registry: &HubRegistry, id: &str) -> Result<bool> {
    let id: EntityId = id.parse().context("Invalid product id")?;

    let product = registry.handle(Product {
        id: id.clone(),
        ..Product::default()
    });
    let deleted = product
        .delete()
        .await
        .with_context(|| format!("Failed to delete product {}", id))?;

    println!("Deleted product {}", id);
    Ok(deleted)
}

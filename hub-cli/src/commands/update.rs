//! Replace a product with edited values.

use anyhow::{Context, Result};
use hub_client::{EntityId, FetchStrategy, HubRegistry};

use crate::product::{Product, ProductFields};

/// Run the update command: read, apply `fields`, PUT the whole product.
pub async fn run(registry: &HubRegistry, id: &str, fields: &ProductFields) -> Result<Product> {
    let id: EntityId = id.parse().context("Invalid product id")?;

    let mut product = registry.handle(Product::default());
    product
        .read(id.clone(), FetchStrategy::StoreThenApi)
        .await
        .with_context(|| format!("Failed to read product {}", id))?;

    fields.apply_to(product.value_mut());
    product
        .update()
        .await
        .with_context(|| format!("Failed to update product {}", id))?;

    println!("Updated:");
    println!("{}", *product);
    Ok(product.into_inner())
}

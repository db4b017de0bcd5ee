//! Send only the edited fields of a product.

use anyhow::{Context, Result};
use hub_client::{EntityId, FetchStrategy, HubRegistry};

use crate::product::{Product, ProductFields};

/// Run the patch command.
///
/// Reads the product, applies `fields`, and PATCHes the fields that now
/// differ from the cached copy.
pub async fn run(registry: &HubRegistry, id: &str, fields: &ProductFields) -> Result<Product> {
    let id: EntityId = id.parse().context("Invalid product id")?;

    let mut product = registry.handle(Product::default());
    product
        .read(id.clone(), FetchStrategy::StoreThenApi)
        .await
        .with_context(|| format!("Failed to read product {}", id))?;

    fields.apply_to(product.value_mut());
    let changed = product.changed_fields()?;
    if changed.is_empty() {
        println!("Nothing changed.");
        return Ok(product.into_inner());
    }

    tracing::debug!(%id, ?changed, "patching product");
    let names: Vec<&str> = changed.iter().map(String::as_str).collect();
    product
        .patch(&names)
        .await
        .with_context(|| format!("Failed to patch product {}", id))?;

    println!("Patched {}:", changed.join(", "));
    println!("{}", *product);
    Ok(product.into_inner())
}

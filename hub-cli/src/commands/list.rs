//! List every product.

use anyhow::{Context, Result};
use hub_client::HubRegistry;

use crate::product::Product;

/// Run the list command.
pub async fn run(registry: &HubRegistry) -> Result<Vec<Product>> {
    let products = registry
        .handle(Product::default())
        .list()
        .await
        .context("Failed to list products")?;

    if products.is_empty() {
        println!("No products.");
        return Ok(products);
    }

    for product in &products {
        println!("{}", product);
    }
    println!();
    println!("{} product(s)", products.len());

    Ok(products)
}

//! Show one product.

use anyhow::{Context, Result};
use hub_client::{EntityId, FetchStrategy, HubRegistry};

use crate::product::Product;

/// Run the get command.
pub async fn run(registry: &HubRegistry, id: &str, strategy: FetchStrategy) -> Result<Product> {
    let id: EntityId = id.parse().context("Invalid product id")?;

    // Nothing else writes to this process's cache, so waiting would never end.
    if strategy == FetchStrategy::FetchFromStore && !registry.cache::<Product>()?.contains(&id) {
        anyhow::bail!("Product {} is not cached", id);
    }

    let mut product = registry.handle(Product::default());
    product
        .read(id.clone(), strategy)
        .await
        .with_context(|| format!("Failed to read product {}", id))?;

    println!("{}", *product);
    Ok(product.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::mock_registry;
    use hub_client::Request;
    use serde_json::json;

    #[tokio::test]
    async fn get_reads_by_id() {
        let (registry, transport) = mock_registry();
        transport.queue_json(json!({"id": 5, "name": "a", "availability": true}));

        let product = run(&registry, "5", FetchStrategy::StoreThenApi).await.unwrap();

        assert_eq!(product.availability, Some(true));
        assert_eq!(
            transport.requests(),
            vec![Request::get("http://api.test/products/5")]
        );
    }

    #[tokio::test]
    async fn get_accepts_text_ids() {
        let (registry, transport) = mock_registry();
        transport.queue_json(json!({"id": "sku-9", "name": "b"}));

        let product = run(&registry, "sku-9", FetchStrategy::FetchFromApi).await.unwrap();

        assert_eq!(product.id, EntityId::Text("sku-9".into()));
        assert_eq!(transport.last_request().unwrap().uri, "http://api.test/products/sku-9");
    }

    #[tokio::test]
    async fn get_rejects_blank_id() {
        let (registry, transport) = mock_registry();

        assert!(run(&registry, "  ", FetchStrategy::StoreThenApi).await.is_err());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn get_from_store_needs_a_cached_copy() {
        let (registry, transport) = mock_registry();

        let err = run(&registry, "4", FetchStrategy::FetchFromStore).await.unwrap_err();

        assert_eq!(err.to_string(), "Product 4 is not cached");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn get_surfaces_not_found() {
        let (registry, transport) = mock_registry();
        transport.queue_status(404, "not found");

        let err = run(&registry, "8", FetchStrategy::StoreThenApi).await.unwrap_err();

        assert!(err.to_string().contains("Failed to read product 8"));
    }
}

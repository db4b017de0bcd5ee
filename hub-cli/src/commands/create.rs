//! Create a product.

use anyhow::{Context, Result};
use hub_client::HubRegistry;

use crate::product::{Product, ProductFields};

/// Run the create command.
pub async fn run(registry: &HubRegistry, fields: &ProductFields) -> Result<Product> {
    if fields.name.is_none() {
        anyhow::bail!("A new product needs --name");
    }

    let mut draft = Product::default();
    fields.apply_to(&mut draft);

    let mut product = registry.handle(draft);
    product.create().await.context("Failed to create product")?;

    println!("Created:");
    println!("{}", *product);
    Ok(product.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_client::{EntityId, Method};
    use crate::commands::mock_registry;
    use serde_json::json;

    #[tokio::test]
    async fn create_posts_without_id() {
        let (registry, transport) = mock_registry();
        transport.queue_json(json!({"id": 12, "name": "chair", "quantity": 4}));
        let fields = ProductFields {
            name: Some("chair".into()),
            quantity: Some(4),
            ..ProductFields::default()
        };

        let product = run(&registry, &fields).await.unwrap();

        assert_eq!(product.id, EntityId::Number(12));
        let sent = transport.last_request().unwrap();
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.uri, "http://api.test/products");
        let body = sent.body.unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["name"], json!("chair"));
    }

    #[tokio::test]
    async fn create_requires_a_name() {
        let (registry, transport) = mock_registry();

        assert!(run(&registry, &ProductFields::default()).await.is_err());
        assert_eq!(transport.request_count(), 0);
    }
}

//! Canned catalogue served by `--mock`.
//!
//! Queues on a [`MockTransport`] exactly the responses the chosen command
//! will ask for, as a small REST server holding [`catalogue`] would answer.

use anyhow::Result;
use hub_client::{EntityId, MockTransport};

use crate::product::{Product, ProductFields};
use crate::Commands;

/// The demo catalogue.
pub fn catalogue() -> Vec<Product> {
    vec![
        Product {
            id: EntityId::Number(1),
            name: Some("Desk lamp".into()),
            description: Some("Adjustable arm, warm white".into()),
            price: Some(39.9),
            availability: Some(true),
            quantity: Some(12),
        },
        Product {
            id: EntityId::Number(2),
            name: Some("Standing desk".into()),
            description: None,
            price: Some(420.0),
            availability: Some(false),
            quantity: Some(0),
        },
        Product {
            id: EntityId::Number(3),
            name: Some("Office chair".into()),
            description: Some("Mesh back".into()),
            price: Some(189.0),
            availability: Some(true),
            quantity: Some(4),
        },
    ]
}

fn find(id: &str) -> Option<Product> {
    let id: EntityId = id.parse().ok()?;
    catalogue().into_iter().find(|p| p.id == id)
}

fn edited(id: &str, fields: &ProductFields, transport: &MockTransport) -> Result<()> {
    let Some(mut product) = find(id) else {
        transport.queue_status(404, "not found");
        return Ok(());
    };
    transport.queue_json(serde_json::to_value(&product)?);
    fields.apply_to(&mut product);
    transport.queue_json(serde_json::to_value(&product)?);
    Ok(())
}

/// Queue the responses `command` needs.
pub fn seed(transport: &MockTransport, command: &Commands) -> Result<()> {
    match command {
        Commands::List => transport.queue_json(serde_json::to_value(catalogue())?),
        Commands::Get { id, .. } => match find(id) {
            Some(product) => transport.queue_json(serde_json::to_value(product)?),
            None => transport.queue_status(404, "not found"),
        },
        Commands::Create { fields } => {
            let mut product = Product {
                id: EntityId::Number(catalogue().len() as i64 + 1),
                ..Product::default()
            };
            fields.apply_to(&mut product);
            transport.queue_json(serde_json::to_value(product)?);
        }
        Commands::Update { id, fields } | Commands::Patch { id, fields } => {
            edited(id, fields, transport)?;
        }
        Commands::Delete { id } => match find(id) {
            Some(_) => transport.queue_json(serde_json::Value::Null),
            None => transport.queue_status(404, "not found"),
        },
    }
    Ok(())
}

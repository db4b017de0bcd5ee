//! The product entity managed by the CLI.

use std::fmt;

use clap::Args;
use hub_types::{Entity, EntityId, FieldDescriptor};
use serde::{Deserialize, Serialize};

/// A catalogue product as served by `/products`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub availability: Option<bool>,
    pub quantity: Option<i64>,
}

impl Entity for Product {
    const RESOURCE: &'static str = "products";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::scalar("name"),
        FieldDescriptor::scalar("description"),
        FieldDescriptor::scalar("price"),
        FieldDescriptor::scalar("availability"),
        FieldDescriptor::scalar("quantity"),
    ];

    fn id(&self) -> EntityId {
        self.id.clone()
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show<T: fmt::Display>(value: &Option<T>) -> String {
            value.as_ref().map_or_else(|| "-".to_string(), T::to_string)
        }

        write!(
            f,
            "#{:<6} {:<24} price={:<8} qty={:<5} available={}",
            self.id.to_string(),
            show(&self.name),
            show(&self.price),
            show(&self.quantity),
            show(&self.availability),
        )?;
        if let Some(description) = &self.description {
            write!(f, "\n        {}", description)?;
        }
        Ok(())
    }
}

/// Field values given on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct ProductFields {
    /// Product name
    #[arg(long)]
    pub name: Option<String>,

    /// Free-text description
    #[arg(long)]
    pub description: Option<String>,

    /// Unit price
    #[arg(long)]
    pub price: Option<f64>,

    /// Whether the product can be ordered
    #[arg(long)]
    pub available: Option<bool>,

    /// Units in stock
    #[arg(long)]
    pub quantity: Option<i64>,
}

impl ProductFields {
    /// Overwrite every field of `product` that was given.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = Some(name.clone());
        }
        if let Some(description) = &self.description {
            product.description = Some(description.clone());
        }
        if self.price.is_some() {
            product.price = self.price;
        }
        if self.available.is_some() {
            product.availability = self.available;
        }
        if self.quantity.is_some() {
            product.quantity = self.quantity;
        }
    }

    /// Whether no field was given.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.available.is_none()
            && self.quantity.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_to_only_touches_given_fields() {
        let mut product = Product {
            id: EntityId::Number(1),
            name: Some("lamp".into()),
            price: Some(10.0),
            ..Product::default()
        };
        let fields = ProductFields {
            price: Some(12.5),
            available: Some(true),
            ..ProductFields::default()
        };

        fields.apply_to(&mut product);

        assert_eq!(product.name.as_deref(), Some("lamp"));
        assert_eq!(product.price, Some(12.5));
        assert_eq!(product.availability, Some(true));
        assert!(!fields.is_empty());
        assert!(ProductFields::default().is_empty());
    }

    #[test]
    fn display_marks_missing_values() {
        let product = Product {
            id: EntityId::Number(3),
            name: Some("desk".into()),
            ..Product::default()
        };
        let line = product.to_string();
        assert!(line.starts_with("#3"));
        assert!(line.contains("price=-"));
    }

    #[test]
    fn record_uses_wire_field_names() {
        let record = Product::default().to_record().unwrap();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        for field in Product::FIELDS {
            assert!(keys.contains(&field.name));
        }
    }
}

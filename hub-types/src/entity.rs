//! The [`Entity`] trait.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{EntityId, FieldDescriptor, TypesError};

/// A JSON object view of an entity, keyed by field name.
pub type Record = Map<String, Value>;

/// A uniquely identified record synchronized between cache and remote resource.
///
/// # Example
///
/// ```
/// use model_hub_types::{Entity, EntityId, FieldDescriptor};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Item {
///     id: EntityId,
///     name: Option<String>,
/// }
///
/// impl Entity for Item {
///     const RESOURCE: &'static str = "items";
///     const FIELDS: &'static [FieldDescriptor] = &[FieldDescriptor::scalar("name")];
///
///     fn id(&self) -> EntityId {
///         self.id.clone()
///     }
/// }
///
/// let item = Item { id: EntityId::Number(3), name: Some("a".into()) };
/// assert_eq!(item.to_record().unwrap()["name"], "a");
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Path segment of the REST collection, e.g. `"products"`.
    const RESOURCE: &'static str;

    /// Field semantics for the non-id fields. Undeclared fields are scalars.
    const FIELDS: &'static [FieldDescriptor];

    /// The entity's identifier.
    fn id(&self) -> EntityId;

    /// Short type name used in error messages.
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Serialize into a [`Record`].
    fn to_record(&self) -> Result<Record, TypesError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(TypesError::NotAnObject {
                entity: Self::type_name(),
            }),
        }
    }

    /// Rebuild a typed entity from a [`Record`].
    fn from_record(record: Record) -> Result<Self, TypesError> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }
}

//! Per-type bindings shared by every handle.
//!
//! A [`HubRegistry`] owns one transport and, for each registered entity
//! type, exactly one [`EntityCache`] and one [`RemoteGateway`]. Handles
//! created from the same registry therefore share cache state, loading
//! marks and live views.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use hub_core::EntityCache;
use hub_types::Entity;

use crate::config::HubConfig;
use crate::error::HubError;
use crate::gateway::RemoteGateway;
use crate::handle::EntityHandle;
use crate::transport::{HttpTransport, Transport, TransportError};

/// The cache and gateway for one entity type.
pub struct Binding<T: Entity> {
    /// Shared cache.
    pub cache: Arc<EntityCache<T>>,
    /// Gateway writing into `cache`.
    pub gateway: RemoteGateway<T>,
}

impl<T: Entity> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            gateway: self.gateway.clone(),
        }
    }
}

impl<T: Entity> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("cache", &self.cache)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Registry of entity bindings over one transport.
pub struct HubRegistry {
    config: HubConfig,
    transport: Arc<dyn Transport>,
    bindings: DashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl HubRegistry {
    /// Create a registry using `transport`.
    pub fn new(config: HubConfig, transport: impl Transport + 'static) -> Self {
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a registry from an already shared transport.
    pub fn with_transport(config: HubConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            bindings: DashMap::new(),
        }
    }

    /// Create a registry talking HTTP to `config.api.base_url`.
    pub fn http(config: HubConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.api)?;
        Ok(Self::new(config, transport))
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Create the binding for `T`. Registering twice keeps the first one.
    pub fn register<T: Entity>(&self) -> Binding<T> {
        let entry = self.bindings.entry(TypeId::of::<T>()).or_insert_with(|| {
            let cache = Arc::new(EntityCache::<T>::new());
            let gateway = RemoteGateway::new(
                &self.config.api.base_url,
                Arc::clone(&cache),
                Arc::clone(&self.transport),
            );
            tracing::debug!(entity = T::type_name(), resource = T::RESOURCE, "registered entity");
            Box::new(Binding { cache, gateway })
        });

        entry
            .downcast_ref::<Binding<T>>()
            .expect("bindings are keyed by their own TypeId")
            .clone()
    }

    /// The binding for `T`.
    ///
    /// # Errors
    ///
    /// [`HubError::MissingDependency`] if `T` was never registered.
    pub fn binding<T: Entity>(&self) -> Result<Binding<T>, HubError> {
        self.bindings
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Binding<T>>().cloned())
            .ok_or(HubError::MissingDependency {
                dependency: "registry binding",
                entity: T::type_name(),
            })
    }

    /// The shared cache for `T`.
    pub fn cache<T: Entity>(&self) -> Result<Arc<EntityCache<T>>, HubError> {
        Ok(self.binding::<T>()?.cache)
    }

    /// The gateway for `T`.
    pub fn gateway<T: Entity>(&self) -> Result<RemoteGateway<T>, HubError> {
        Ok(self.binding::<T>()?.gateway)
    }

    /// Wrap `value` in a handle bound to this registry.
    ///
    /// Unregistered types produce an unbound handle whose operations fail
    /// with [`HubError::MissingDependency`].
    pub fn handle<T: Entity>(&self, value: T) -> EntityHandle<T> {
        match self.binding::<T>() {
            Ok(binding) => EntityHandle::bound(value, &binding),
            Err(_) => EntityHandle::new(value),
        }
    }

    /// Number of registered entity types.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no entity type is registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for HubRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubRegistry")
            .field("base_url", &self.config.api.base_url)
            .field("entities", &self.bindings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use hub_types::{EntityId, FieldDescriptor};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Item {
        id: EntityId,
        name: Option<String>,
    }

    impl Entity for Item {
        const RESOURCE: &'static str = "items";
        const FIELDS: &'static [FieldDescriptor] = &[FieldDescriptor::scalar("name")];

        fn id(&self) -> EntityId {
            self.id.clone()
        }
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Order {
        id: EntityId,
    }

    impl Entity for Order {
        const RESOURCE: &'static str = "orders";
        const FIELDS: &'static [FieldDescriptor] = &[];

        fn id(&self) -> EntityId {
            self.id.clone()
        }
    }

    fn registry() -> HubRegistry {
        HubRegistry::new(
            HubConfig::default().with_base_url("http://api.test/"),
            MockTransport::new(),
        )
    }

    #[test]
    fn register_is_idempotent() {
        let registry = registry();
        let first = registry.register::<Item>();
        let second = registry.register::<Item>();

        assert!(Arc::ptr_eq(&first.cache, &second.cache));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn types_get_separate_bindings() {
        let registry = registry();
        registry.register::<Item>();
        registry.register::<Order>();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.gateway::<Item>().unwrap().collection_uri(),
            "http://api.test/items"
        );
        assert_eq!(
            registry.gateway::<Order>().unwrap().collection_uri(),
            "http://api.test/orders"
        );
    }

    #[test]
    fn unregistered_type_is_missing_dependency() {
        let registry = registry();
        let err = registry.cache::<Order>().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "registry binding is missing from the model Order");
    }

    #[test]
    fn handle_for_unregistered_type_is_unbound() {
        let registry = registry();
        let handle = registry.handle(Order::default());
        assert!(handle.list_cached().unwrap_err().is_configuration());
    }

    #[test]
    fn handles_share_one_cache() {
        let registry = registry();
        registry.register::<Item>();
        let cache = registry.cache::<Item>().unwrap();
        cache.upsert(
            &EntityId::Number(1),
            Item {
                id: EntityId::Number(1),
                name: Some("shared".into()),
            },
        );

        let a = registry.handle(Item::default());
        let b = registry.handle(Item::default());

        assert_eq!(a.list_cached().unwrap().len(), 1);
        assert_eq!(b.list_cached().unwrap().len(), 1);
    }

    #[test]
    fn http_registry_uses_configured_base_url() {
        let registry = HubRegistry::http(HubConfig::default()).unwrap();
        registry.register::<Item>();
        assert_eq!(
            registry.gateway::<Item>().unwrap().item_uri(&EntityId::Number(2)),
            "http://localhost:3000/items/2"
        );
    }
}

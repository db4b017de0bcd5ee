//! EntityHandle - the façade applications use for one entity instance.
//!
//! A handle owns one entity's field values and is bound to the shared
//! [`EntityCache`] and [`RemoteGateway`] of its type. Every operation that
//! returns an entity copies the authoritative result onto the handle with
//! [`ValueComparator::apply_into`] and hands back the updated value.
//!
//! ```text
//! EntityHandle.op() → RemoteGateway.op() → EntityCache.upsert()
//!        ↑                                        │
//!        └──────── apply_into(result) ←───────────┘
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::Arc;

use hub_core::{EntityCache, FetchClaim, Subscription, ValueComparator};
use hub_types::{Entity, EntityId};

use crate::error::HubError;
use crate::gateway::RemoteGateway;
use crate::registry::{Binding, HubRegistry};

/// Where a read looks for its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStrategy {
    /// Use the cache if the id is cached or already loading, else fetch once.
    #[default]
    StoreThenApi,
    /// Wait on the cache only; never touches the network.
    FetchFromStore,
    /// Always fetch, bypassing coalescing.
    FetchFromApi,
}

impl FromStr for FetchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "store-then-api" => Ok(Self::StoreThenApi),
            "fetch-from-store" | "store" => Ok(Self::FetchFromStore),
            "fetch-from-api" | "api" => Ok(Self::FetchFromApi),
            other => Err(format!("unknown fetch strategy: {}", other)),
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StoreThenApi => "STORE_THEN_API",
            Self::FetchFromStore => "FETCH_FROM_STORE",
            Self::FetchFromApi => "FETCH_FROM_API",
        };
        f.write_str(name)
    }
}

/// One entity's values plus the bindings needed to synchronize them.
pub struct EntityHandle<T: Entity> {
    value: T,
    cache: Option<Arc<EntityCache<T>>>,
    gateway: Option<RemoteGateway<T>>,
}

impl<T: Entity> EntityHandle<T> {
    /// An unbound handle. Operations fail until a binding is attached.
    pub fn new(value: T) -> Self {
        Self {
            value,
            cache: None,
            gateway: None,
        }
    }

    /// A handle bound to `binding`.
    pub fn bound(value: T, binding: &Binding<T>) -> Self {
        Self {
            value,
            cache: Some(Arc::clone(&binding.cache)),
            gateway: Some(binding.gateway.clone()),
        }
    }

    /// Resolve this type's binding from `registry`.
    ///
    /// Fails with a configuration error, leaving the handle as it was, if the
    /// type is not registered.
    pub fn attach(&mut self, registry: &HubRegistry) -> Result<&mut Self, HubError> {
        let binding = registry.binding::<T>()?;
        self.cache = Some(binding.cache);
        self.gateway = Some(binding.gateway);
        Ok(self)
    }

    /// Bind a cache.
    pub fn set_cache(&mut self, cache: Arc<EntityCache<T>>) {
        self.cache = Some(cache);
    }

    /// Bind a gateway.
    pub fn set_gateway(&mut self, gateway: RemoteGateway<T>) {
        self.gateway = Some(gateway);
    }

    /// The entity values.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Mutable access to the entity values.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Consume the handle, keeping the values.
    pub fn into_inner(self) -> T {
        self.value
    }

    fn cache(&self) -> Result<&Arc<EntityCache<T>>, HubError> {
        self.cache.as_ref().ok_or(HubError::MissingDependency {
            dependency: "entity cache",
            entity: T::type_name(),
        })
    }

    fn gateway(&self) -> Result<&RemoteGateway<T>, HubError> {
        self.gateway.as_ref().ok_or(HubError::MissingDependency {
            dependency: "remote gateway",
            entity: T::type_name(),
        })
    }

    fn validate(&self) -> Result<(&Arc<EntityCache<T>>, &RemoteGateway<T>), HubError> {
        Ok((self.cache()?, self.gateway()?))
    }

    /// Copy `incoming` onto self field by field.
    fn absorb(&mut self, incoming: &T) -> Result<&T, HubError> {
        let mut target = self.value.to_record()?;
        let source = incoming.to_record()?;
        ValueComparator::for_entity::<T>().apply_into(&mut target, &source);
        self.value = T::from_record(target)?;
        Ok(&self.value)
    }

    // ===========================================
    // Operations
    // ===========================================

    /// Create the entity remotely and take on the server's values.
    pub async fn create(&mut self) -> Result<&T, HubError> {
        let (_, gateway) = self.validate()?;
        let created = gateway.create(&self.value).await?;
        self.absorb(&created)
    }

    /// Load `id` into this handle using `strategy`.
    ///
    /// With [`FetchStrategy::FetchFromStore`] this waits until the id is
    /// written to the cache by someone else.
    pub async fn read(&mut self, id: impl Into<EntityId>, strategy: FetchStrategy) -> Result<&T, HubError> {
        let (cache, gateway) = self.validate()?;
        let id = id.into();

        let entity = match strategy {
            FetchStrategy::StoreThenApi => loop {
                match cache.claim(&id) {
                    FetchClaim::Claimed(ticket) => break gateway.read_claimed(&id, ticket).await?,
                    FetchClaim::Available => {
                        tracing::debug!(entity = T::type_name(), %id, "resolving from cache");
                        let subscription = cache.subscribe_while_loading(&id).await?;
                        if let Some(entity) = subscription.current() {
                            break entity;
                        }
                        // The load finished without caching anything; claim again.
                    }
                }
            },
            FetchStrategy::FetchFromStore => cache.subscribe(&id).next_entity().await?,
            FetchStrategy::FetchFromApi => gateway.read(&id).await?,
        };

        self.absorb(&entity)
    }

    /// Replace the remote entity with this handle's values.
    pub async fn update(&mut self) -> Result<&T, HubError> {
        let (_, gateway) = self.validate()?;
        let updated = gateway.update(&self.value).await?;
        self.absorb(&updated)
    }

    /// Send only `fields` to the server.
    pub async fn patch(&mut self, fields: &[&str]) -> Result<&T, HubError> {
        let (_, gateway) = self.validate()?;
        let patched = gateway.patch(&self.value, fields).await?;
        self.absorb(&patched)
    }

    /// Delete the remote entity. The handle keeps its values.
    pub async fn delete(&self) -> Result<bool, HubError> {
        let (_, gateway) = self.validate()?;
        gateway.delete(&self.value.id()).await
    }

    /// Fetch the whole collection. The handle itself is not modified.
    pub async fn list(&self) -> Result<Vec<T>, HubError> {
        let (_, gateway) = self.validate()?;
        gateway.list().await
    }

    /// Every cached entity of this type, without a network call.
    pub fn list_cached(&self) -> Result<Vec<T>, HubError> {
        Ok(self.cache()?.all())
    }

    /// Live view of this handle's id in the cache.
    pub fn watch(&self) -> Result<Subscription<T>, HubError> {
        Ok(self.cache()?.subscribe(&self.value.id()))
    }

    // ===========================================
    // Comparison
    // ===========================================

    /// Independent copy of the current values.
    pub fn snapshot(&self) -> T {
        self.value.clone()
    }

    /// Top-level scalar fields that differ between self and `other`.
    pub fn diff(&self, other: &T) -> Result<Vec<String>, HubError> {
        let cmp = ValueComparator::for_entity::<T>();
        Ok(cmp.diff(&self.value.to_record()?, &other.to_record()?))
    }

    /// Structural equality ignoring `id` and `exclude`.
    pub fn equals(&self, other: &T, exclude: &[&str]) -> Result<bool, HubError> {
        let cmp = ValueComparator::for_entity::<T>();
        Ok(cmp.equals(&self.value.to_record()?, &other.to_record()?, exclude))
    }

    /// Fields changed locally relative to the cached copy of this id.
    pub fn changed_fields(&self) -> Result<Vec<String>, HubError> {
        let id = self.value.id();
        let cached = self.cache()?.get(&id).ok_or_else(|| HubError::NotCached {
            entity: T::type_name(),
            id,
        })?;
        self.diff(&cached)
    }
}

impl<T: Entity> Deref for EntityHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Entity> DerefMut for EntityHandle<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Entity + fmt::Debug> fmt::Debug for EntityHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHandle")
            .field("value", &self.value)
            .field("cache", &self.cache.is_some())
            .field("gateway", &self.gateway.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::transport::{Method, MockTransport, Request};
    use hub_types::FieldDescriptor;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    const SUPPLIER_FIELDS: &[FieldDescriptor] = &[FieldDescriptor::scalar("name")];

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Supplier {
        name: Option<String>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Item {
        id: EntityId,
        name: Option<String>,
        price: Option<i64>,
        release_date: Option<String>,
        supplier: Supplier,
        tags: Vec<String>,
    }

    impl Entity for Item {
        const RESOURCE: &'static str = "items";
        const FIELDS: &'static [FieldDescriptor] = &[
            FieldDescriptor::scalar("name"),
            FieldDescriptor::scalar("price"),
            FieldDescriptor::date("releaseDate"),
            FieldDescriptor::nested("supplier", SUPPLIER_FIELDS),
            FieldDescriptor::sequence("tags"),
        ];

        fn id(&self) -> EntityId {
            self.id.clone()
        }
    }

    fn registry() -> (HubRegistry, MockTransport) {
        let transport = MockTransport::new();
        let registry = HubRegistry::new(
            HubConfig::default().with_base_url("http://api.test"),
            transport.clone(),
        );
        registry.register::<Item>();
        (registry, transport)
    }

    // ===========================================
    // Binding
    // ===========================================

    #[tokio::test]
    async fn unbound_handle_reports_missing_dependency() {
        let mut handle = EntityHandle::new(Item::default());

        let err = handle.create().await.unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "entity cache is missing from the model Item");
    }

    #[tokio::test]
    async fn missing_gateway_is_named() {
        let mut handle = EntityHandle::new(Item::default());
        handle.set_cache(Arc::new(EntityCache::new()));

        let err = handle.read(1, FetchStrategy::FetchFromApi).await.unwrap_err();

        assert!(matches!(
            err,
            HubError::MissingDependency {
                dependency: "remote gateway",
                entity: "Item"
            }
        ));
    }

    #[tokio::test]
    async fn attach_to_unregistered_type_fails_and_stays_unbound() {
        let registry = HubRegistry::new(HubConfig::default(), MockTransport::new());
        let mut handle = EntityHandle::new(Item::default());

        assert!(handle.attach(&registry).unwrap_err().is_configuration());
        assert!(handle.list().await.unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn attach_binds_registered_type() {
        let (registry, transport) = registry();
        transport.queue_json(json!([]));
        let mut handle = EntityHandle::new(Item::default());

        handle.attach(&registry).unwrap();

        assert!(handle.list().await.unwrap().is_empty());
    }

    // ===========================================
    // Operations copy results onto self
    // ===========================================

    #[tokio::test]
    async fn create_takes_server_values() {
        let (registry, transport) = registry();
        transport.queue_json(json!({
            "id": 42, "name": "lamp", "price": 15,
            "releaseDate": "2024-05-01", "supplier": {"name": "acme"}, "tags": ["new"]
        }));

        let mut handle = registry.handle(Item {
            name: Some("lamp".into()),
            price: Some(15),
            ..Item::default()
        });
        handle.create().await.unwrap();

        assert_eq!(handle.id, EntityId::Number(42));
        assert_eq!(handle.release_date.as_deref(), Some("2024-05-01T00:00:00Z"));
        assert_eq!(handle.supplier.name.as_deref(), Some("acme"));
        assert_eq!(handle.tags, vec!["new".to_string()]);
    }

    #[tokio::test]
    async fn read_from_api_coerces_bad_dates_to_none() {
        let (registry, transport) = registry();
        transport.queue_json(json!({
            "id": 1, "name": "a", "price": 1,
            "releaseDate": "0000-00-00", "supplier": {"name": null}, "tags": []
        }));

        let mut handle = registry.handle(Item::default());
        handle.read(1, FetchStrategy::FetchFromApi).await.unwrap();

        assert_eq!(handle.name.as_deref(), Some("a"));
        assert_eq!(handle.release_date, None);
    }

    #[tokio::test]
    async fn update_and_patch_apply_results() {
        let (registry, transport) = registry();
        transport.queue_json(json!({"id": 3, "name": "b", "price": 2, "supplier": {}, "tags": []}));
        transport.queue_json(json!({"id": 3, "name": "c", "price": 2, "supplier": {}, "tags": []}));

        let mut handle = registry.handle(Item {
            id: EntityId::Number(3),
            name: Some("b".into()),
            price: Some(2),
            ..Item::default()
        });
        handle.update().await.unwrap();
        handle.name = Some("c".into());
        let patched = handle.patch(&["name"]).await.unwrap().clone();

        assert_eq!(patched.name.as_deref(), Some("c"));
        let sent = transport.last_request().unwrap();
        assert_eq!(sent.method, Method::Patch);
        assert_eq!(sent.body, Some(json!({"name": "c"})));
    }

    #[tokio::test]
    async fn patch_with_no_fields_is_validation_error() {
        let (registry, transport) = registry();
        let mut handle = registry.handle(Item {
            id: EntityId::Number(3),
            ..Item::default()
        });

        let err = handle.patch(&[]).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn delete_and_list_leave_handle_untouched() {
        let (registry, transport) = registry();
        transport.queue_json(json!([{"id": 1, "name": "a", "supplier": {}, "tags": []}]));
        transport.queue_json(json!({}));

        let handle = registry.handle(Item {
            id: EntityId::Number(1),
            name: Some("local".into()),
            ..Item::default()
        });
        let listed = handle.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(handle.list_cached().unwrap(), listed);

        assert!(handle.delete().await.unwrap());
        assert_eq!(handle.name.as_deref(), Some("local"));
        assert!(handle.list_cached().unwrap().is_empty());
        assert_eq!(
            transport.last_request().unwrap(),
            Request::delete("http://api.test/items/1")
        );
    }

    // ===========================================
    // Fetch strategies
    // ===========================================

    #[tokio::test]
    async fn store_then_api_uses_cache_when_present() {
        let (registry, transport) = registry();
        let cache = registry.cache::<Item>().unwrap();
        cache.upsert(
            &EntityId::Number(8),
            Item {
                id: EntityId::Number(8),
                name: Some("cached".into()),
                ..Item::default()
            },
        );

        let mut handle = registry.handle(Item::default());
        handle.read(8, FetchStrategy::StoreThenApi).await.unwrap();

        assert_eq!(handle.name.as_deref(), Some("cached"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn fetch_from_api_bypasses_cache() {
        let (registry, transport) = registry();
        let cache = registry.cache::<Item>().unwrap();
        cache.upsert(&EntityId::Number(8), Item::default());
        transport.queue_json(json!({"id": 8, "name": "fresh", "supplier": {}, "tags": []}));

        let mut handle = registry.handle(Item::default());
        handle.read(8, FetchStrategy::FetchFromApi).await.unwrap();

        assert_eq!(handle.name.as_deref(), Some("fresh"));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn fetch_from_store_waits_for_a_write() {
        let (registry, transport) = registry();
        let cache = registry.cache::<Item>().unwrap();

        let writer = Arc::clone(&cache);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            writer.upsert(
                &EntityId::Number(9),
                Item {
                    id: EntityId::Number(9),
                    name: Some("pushed".into()),
                    ..Item::default()
                },
            );
        });

        let mut handle = registry.handle(Item::default());
        handle.read(9, FetchStrategy::FetchFromStore).await.unwrap();

        assert_eq!(handle.name.as_deref(), Some("pushed"));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("STORE_THEN_API".parse(), Ok(FetchStrategy::StoreThenApi));
        assert_eq!("fetch-from-store".parse(), Ok(FetchStrategy::FetchFromStore));
        assert_eq!("api".parse(), Ok(FetchStrategy::FetchFromApi));
        assert!("cache".parse::<FetchStrategy>().is_err());
        assert_eq!(FetchStrategy::default().to_string(), "STORE_THEN_API");
    }

    // ===========================================
    // Comparison helpers
    // ===========================================

    #[tokio::test]
    async fn changed_fields_diffs_against_cache() {
        let (registry, _) = registry();
        let original = Item {
            id: EntityId::Number(7),
            name: Some("x".into()),
            price: Some(10),
            ..Item::default()
        };
        registry
            .cache::<Item>()
            .unwrap()
            .upsert(&EntityId::Number(7), original.clone());

        let mut handle = registry.handle(original);
        handle.name = Some("y".into());
        handle.supplier.name = Some("nested changes are not reported".into());

        assert_eq!(handle.changed_fields().unwrap(), vec!["name".to_string()]);
    }

    #[test]
    fn changed_fields_needs_cached_copy() {
        let (registry, _) = registry();
        let handle = registry.handle(Item {
            id: EntityId::Number(70),
            ..Item::default()
        });
        assert!(matches!(
            handle.changed_fields(),
            Err(HubError::NotCached { .. })
        ));
    }

    #[test]
    fn equals_ignores_id_and_exclusions() {
        let handle = EntityHandle::new(Item {
            id: EntityId::Number(1),
            name: Some("a".into()),
            ..Item::default()
        });
        let mut other = handle.snapshot();
        other.id = EntityId::Number(2);
        assert!(handle.equals(&other, &[]).unwrap());

        other.name = Some("b".into());
        assert!(!handle.equals(&other, &[]).unwrap());
        assert!(handle.equals(&other, &["name"]).unwrap());
        assert_eq!(handle.diff(&other).unwrap(), vec!["name".to_string()]);
    }

    #[tokio::test]
    async fn watch_follows_cache_writes() {
        let (registry, transport) = registry();
        transport.queue_json(json!({"id": 4, "name": "v1", "supplier": {}, "tags": []}));

        let mut handle = registry.handle(Item::default());
        handle.read(4, FetchStrategy::FetchFromApi).await.unwrap();
        let mut watch = handle.watch().unwrap();
        assert_eq!(watch.next().await.unwrap().unwrap().name.as_deref(), Some("v1"));

        registry
            .cache::<Item>()
            .unwrap()
            .patch_local(&EntityId::Number(4), json!({"name": "v2"}).as_object().unwrap())
            .unwrap();
        assert_eq!(watch.next().await.unwrap().unwrap().name.as_deref(), Some("v2"));
    }
}

//! RemoteGateway - REST calls for one entity type.
//!
//! The gateway builds URIs from the configured base URL and the entity's
//! resource segment, executes calls through a [`Transport`], and on success
//! writes the result into the shared [`EntityCache`].
//!
//! | Operation | Method | Path |
//! |---|---|---|
//! | create | POST | `/{resource}` |
//! | read | GET | `/{resource}/{id}` |
//! | update | PUT | `/{resource}/{id}` |
//! | patch | PATCH | `/{resource}/{id}` |
//! | delete | DELETE | `/{resource}/{id}` |
//! | list | GET | `/{resource}` |
//!
//! Each call runs on its own tokio task. Dropping the caller's future stops
//! the caller waiting but the call still completes and still updates the
//! cache, so other readers coalesced onto it are never stranded.

use std::future::Future;
use std::sync::Arc;

use hub_core::{EntityCache, LoadTicket};
use hub_types::{Entity, EntityId, Record};
use serde_json::Value;

use crate::error::HubError;
use crate::transport::{Method, Request, Transport};

/// Executes CRUD calls for entity type `T` and keeps its cache current.
pub struct RemoteGateway<T: Entity> {
    base_url: Arc<str>,
    cache: Arc<EntityCache<T>>,
    transport: Arc<dyn Transport>,
}

impl<T: Entity> Clone for RemoteGateway<T> {
    fn clone(&self) -> Self {
        Self {
            base_url: Arc::clone(&self.base_url),
            cache: Arc::clone(&self.cache),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Entity> std::fmt::Debug for RemoteGateway<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteGateway")
            .field("entity", &T::type_name())
            .field("collection", &self.collection_uri())
            .finish()
    }
}

impl<T: Entity> RemoteGateway<T> {
    /// Create a gateway rooted at `base_url` writing into `cache`.
    pub fn new(base_url: &str, cache: Arc<EntityCache<T>>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: Arc::from(base_url.trim_end_matches('/')),
            cache,
            transport,
        }
    }

    /// The cache this gateway writes into.
    pub fn cache(&self) -> &Arc<EntityCache<T>> {
        &self.cache
    }

    /// `{base}/{resource}`.
    pub fn collection_uri(&self) -> String {
        format!("{}/{}", self.base_url, T::RESOURCE)
    }

    /// `{base}/{resource}/{id}`.
    pub fn item_uri(&self, id: &EntityId) -> String {
        format!("{}/{}/{}", self.base_url, T::RESOURCE, id)
    }

    // ===========================================
    // Operations
    // ===========================================

    /// POST `entity` (without its id) and cache the created result.
    pub async fn create(&self, entity: &T) -> Result<T, HubError> {
        let mut body = entity.to_record()?;
        body.remove("id");
        let request = Request::new(Method::Post, self.collection_uri()).with_body(Value::Object(body));

        let gateway = self.clone();
        detached(async move {
            let created: T = gateway.send(request).await?;
            let id = created.id();
            if id.is_unassigned() {
                tracing::warn!(entity = T::type_name(), "create returned no id, not caching");
            } else {
                gateway.cache.upsert(&id, created.clone());
            }
            Ok(created)
        })
        .await
    }

    /// GET `id` and cache the result.
    ///
    /// If no other read of `id` is in flight this one takes the loading mark:
    /// on failure the mark is cleared and coalesced waiters are rejected. If
    /// another read already holds the mark, the result is cached but the mark
    /// and its waiters are left to that read. The cached entry (if any) is
    /// never touched on failure.
    pub async fn read(&self, id: &EntityId) -> Result<T, HubError> {
        match self.cache.mark_loading(id) {
            Some(ticket) => self.read_claimed(id, ticket).await,
            None => self.read_unowned(id).await,
        }
    }

    /// GET `id` as the holder of `ticket`.
    pub(crate) async fn read_claimed(&self, id: &EntityId, ticket: LoadTicket) -> Result<T, HubError> {
        let request = Request::get(self.item_uri(id));
        let gateway = self.clone();
        let task_id = id.clone();

        let result = detached(async move {
            match gateway.send::<T>(request).await {
                Ok(entity) => {
                    gateway.cache.resolve_fetch(&task_id, ticket, entity.clone());
                    Ok(entity)
                }
                Err(err) => {
                    gateway.cache.reject_fetch(&task_id, ticket, &err.to_string());
                    Err(err)
                }
            }
        })
        .await;

        if let Err(HubError::Task(reason)) = &result {
            self.cache.reject_fetch(id, ticket, reason);
        }
        result
    }

    /// GET `id` while another read owns its loading mark.
    async fn read_unowned(&self, id: &EntityId) -> Result<T, HubError> {
        tracing::debug!(entity = T::type_name(), %id, "read already in flight, fetching alongside");
        let request = Request::get(self.item_uri(id));
        let gateway = self.clone();
        let task_id = id.clone();

        detached(async move {
            let entity: T = gateway.send(request).await?;
            gateway.cache.store(&task_id, entity.clone());
            Ok(entity)
        })
        .await
    }

    /// PUT the full entity and cache the result.
    pub async fn update(&self, entity: &T) -> Result<T, HubError> {
        let id = entity.id();
        let body = serde_json::to_value(entity)?;
        let request = Request::new(Method::Put, self.item_uri(&id)).with_body(body);

        let gateway = self.clone();
        detached(async move {
            let updated: T = gateway.send(request).await?;
            gateway.cache.upsert(&id, updated.clone());
            Ok(updated)
        })
        .await
    }

    /// PATCH only `fields` of `entity` and cache the result.
    ///
    /// Fails before any network call if `fields` is empty or names a field
    /// the entity does not have.
    pub async fn patch(&self, entity: &T, fields: &[&str]) -> Result<T, HubError> {
        let body = project::<T>(&entity.to_record()?, fields)?;
        let id = entity.id();
        let request = Request::new(Method::Patch, self.item_uri(&id)).with_body(Value::Object(body));

        let gateway = self.clone();
        detached(async move {
            let patched: T = gateway.send(request).await?;
            gateway.cache.upsert(&id, patched.clone());
            Ok(patched)
        })
        .await
    }

    /// DELETE `id` and drop it from the cache.
    ///
    /// Returns `true` on success. On failure the cache is untouched.
    pub async fn delete(&self, id: &EntityId) -> Result<bool, HubError> {
        let request = Request::delete(self.item_uri(id));
        let gateway = self.clone();
        let id = id.clone();

        detached(async move {
            gateway.transport_call(request).await?;
            gateway.cache.remove(&id);
            Ok(true)
        })
        .await
    }

    /// GET the whole collection and replace the cache with it.
    pub async fn list(&self) -> Result<Vec<T>, HubError> {
        let request = Request::get(self.collection_uri());
        let gateway = self.clone();

        detached(async move {
            let items: Vec<T> = gateway.send(request).await?;
            gateway.cache.replace_all(items.clone());
            Ok(items)
        })
        .await
    }

    // ===========================================
    // Internals
    // ===========================================

    async fn transport_call(&self, request: Request) -> Result<Value, HubError> {
        tracing::debug!(
            entity = T::type_name(),
            method = %request.method,
            uri = %request.uri,
            "sending request"
        );
        let method = request.method;
        let body = self.transport.execute(request).await.map_err(|e| {
            tracing::debug!(entity = T::type_name(), %method, error = %e, "request failed");
            e
        })?;
        Ok(body)
    }

    async fn send<R: serde::de::DeserializeOwned>(&self, request: Request) -> Result<R, HubError> {
        let body = self.transport_call(request).await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Run `fut` on its own task so the caller can stop waiting without
/// cancelling it.
async fn detached<R, F>(fut: F) -> Result<R, HubError>
where
    F: Future<Output = Result<R, HubError>> + Send + 'static,
    R: Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| HubError::Task(e.to_string()))?
}

/// Key-filtered projection of `record` used as a PATCH body.
fn project<T: Entity>(record: &Record, fields: &[&str]) -> Result<Record, HubError> {
    if fields.is_empty() {
        return Err(HubError::EmptyPatch {
            entity: T::type_name(),
        });
    }

    fields
        .iter()
        .map(|name| {
            record
                .get(*name)
                .map(|value| (name.to_string(), value.clone()))
                .ok_or_else(|| HubError::UnknownField {
                    field: name.to_string(),
                    entity: T::type_name(),
                })
        })
        .collect()
}

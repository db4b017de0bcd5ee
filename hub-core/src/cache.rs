//! In-memory entity cache, one instance per entity type.
//!
//! The cache holds three pieces of state:
//! - resolved entities keyed by [`EntityId`]
//! - the set of ids whose read is currently in flight
//! - an optional "active" id for presentation layers
//!
//! Every id gets a `watch` channel carrying its latest value. Subscribers see
//! the current value immediately and then every later write in issue order.
//! A slow subscriber may skip intermediate values but never sees them out of
//! order. A removal is delivered as `None`.
//!
//! In-flight reads carry their own completion signal. Waiters parked in
//! [`EntityCache::subscribe_while_loading`] wake once the read resolves and
//! are rejected with [`CacheError::FetchFailed`] if it fails, so one network
//! call can serve any number of concurrent readers.
//!
//! All state sits behind one mutex per cache. No lock is held across an
//! await point.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hub_types::{Entity, EntityId, Record};
use tokio::sync::watch;

use crate::CacheError;

/// Ownership of one in-flight read of an id.
///
/// Returned by [`EntityCache::claim`] and [`EntityCache::mark_loading`]. Only
/// the holder's [`resolve_fetch`](EntityCache::resolve_fetch) or
/// [`reject_fetch`](EntityCache::reject_fetch) clears the mark it was issued
/// for; a stale ticket leaves a newer mark alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Outcome of a [`EntityCache::claim`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchClaim {
    /// The id is cached or already being fetched; wait on the cache.
    Available,
    /// The caller now owns the loading mark and must perform the fetch.
    Claimed(LoadTicket),
}

#[derive(Debug, Clone)]
enum FetchOutcome {
    Resolved,
    Failed(Arc<str>),
}

struct LoadingMark {
    ticket: LoadTicket,
    tx: watch::Sender<Option<FetchOutcome>>,
}

struct CacheState<T> {
    entities: HashMap<EntityId, T>,
    channels: HashMap<EntityId, watch::Sender<Option<T>>>,
    loading: HashMap<EntityId, LoadingMark>,
    next_ticket: u64,
    active: Option<EntityId>,
}

impl<T: Clone> CacheState<T> {
    /// Push `value` to the subscribers of `id`, if it has any channel.
    fn publish(&mut self, id: &EntityId, value: Option<T>) {
        if let Some(tx) = self.channels.get(id) {
            tx.send_replace(value);
        }
    }

    fn channel(&mut self, id: &EntityId) -> &watch::Sender<Option<T>> {
        let current = self.entities.get(id).cloned();
        self.channels
            .entry(id.clone())
            .or_insert_with(|| watch::channel(current).0)
    }

    /// Drop the channel of `id` once it is uncached and unobserved.
    fn prune(&mut self, id: &EntityId) {
        let idle = !self.entities.contains_key(id)
            && self.channels.get(id).is_some_and(|tx| tx.receiver_count() == 0);
        if idle {
            self.channels.remove(id);
        }
    }

    /// Drop every channel of an uncached id whose subscribers are all gone.
    fn sweep(&mut self) {
        let entities = &self.entities;
        self.channels
            .retain(|id, tx| entities.contains_key(id) || tx.receiver_count() > 0);
    }

    fn insert_mark(&mut self, id: &EntityId) -> LoadTicket {
        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        let (tx, _) = watch::channel(None);
        self.loading.insert(id.clone(), LoadingMark { ticket, tx });
        ticket
    }

    fn owns(&self, id: &EntityId, ticket: LoadTicket) -> bool {
        self.loading.get(id).is_some_and(|mark| mark.ticket == ticket)
    }

    fn loading_snapshot(&self) -> BTreeSet<EntityId> {
        self.loading.keys().cloned().collect()
    }
}

/// Shared in-memory store for one entity type.
///
/// Create one per type at startup and share it behind an [`Arc`]; handles and
/// gateways never own it.
pub struct EntityCache<T: Entity> {
    state: Mutex<CacheState<T>>,
    loading_tx: watch::Sender<BTreeSet<EntityId>>,
}

impl<T: Entity> EntityCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        let (loading_tx, _) = watch::channel(BTreeSet::new());
        Self {
            state: Mutex::new(CacheState {
                entities: HashMap::new(),
                channels: HashMap::new(),
                loading: HashMap::new(),
                next_ticket: 0,
                active: None,
            }),
            loading_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===========================================
    // Reads
    // ===========================================

    /// Point lookup.
    pub fn get(&self, id: &EntityId) -> Option<T> {
        self.lock().entities.get(id).cloned()
    }

    /// Whether `id` is cached.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.lock().entities.contains_key(id)
    }

    /// Snapshot of every cached entity, ordered by id.
    pub fn all(&self) -> Vec<T> {
        let state = self.lock();
        let mut ids: Vec<&EntityId> = state.entities.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| state.entities.get(id).cloned())
            .collect()
    }

    /// Number of cached entities.
    pub fn len(&self) -> usize {
        self.lock().entities.len()
    }

    /// Whether the cache holds no entities.
    pub fn is_empty(&self) -> bool {
        self.lock().entities.is_empty()
    }

    // ===========================================
    // Loading set
    // ===========================================

    /// Whether a read for `id` is in flight.
    pub fn is_loading(&self, id: &EntityId) -> bool {
        self.lock().loading.contains_key(id)
    }

    /// Mark `id` as in flight. Returns `None` if it already was.
    pub fn mark_loading(&self, id: &EntityId) -> Option<LoadTicket> {
        let mut state = self.lock();
        if state.loading.contains_key(id) {
            return None;
        }
        let ticket = state.insert_mark(id);
        self.loading_tx.send_replace(state.loading_snapshot());
        tracing::trace!(entity = T::type_name(), %id, "marked loading");
        Some(ticket)
    }

    /// Atomically decide whether the caller should wait on the cache or fetch.
    ///
    /// Returns [`FetchClaim::Available`] when `id` is cached or already in
    /// flight. Otherwise marks `id` as loading and returns
    /// [`FetchClaim::Claimed`]; the caller must then settle the mark with
    /// [`resolve_fetch`](Self::resolve_fetch) or
    /// [`reject_fetch`](Self::reject_fetch).
    pub fn claim(&self, id: &EntityId) -> FetchClaim {
        let mut state = self.lock();
        if state.entities.contains_key(id) || state.loading.contains_key(id) {
            return FetchClaim::Available;
        }
        let ticket = state.insert_mark(id);
        self.loading_tx.send_replace(state.loading_snapshot());
        tracing::trace!(entity = T::type_name(), %id, "claimed fetch");
        FetchClaim::Claimed(ticket)
    }

    /// Clear the loading mark for `id` and release its waiters.
    ///
    /// Idempotent. Always broadcasts the current loading set.
    pub fn unmark_loading(&self, id: &EntityId) {
        let mut state = self.lock();
        self.finish_loading(&mut state, id, FetchOutcome::Resolved);
    }

    /// Clear the loading mark for `id` and reject its waiters with `reason`.
    pub fn fail_loading(&self, id: &EntityId, reason: &str) {
        let mut state = self.lock();
        if state.loading.contains_key(id) {
            tracing::warn!(entity = T::type_name(), %id, reason, "fetch failed, rejecting waiters");
        }
        self.finish_loading(&mut state, id, FetchOutcome::Failed(Arc::from(reason)));
    }

    /// Store the result of the read holding `ticket`.
    ///
    /// The entity is always written. The loading mark is cleared only if it
    /// is still the one `ticket` was issued for.
    pub fn resolve_fetch(&self, id: &EntityId, ticket: LoadTicket, entity: T) {
        let mut state = self.lock();
        self.write(&mut state, id, entity);
        if state.owns(id, ticket) {
            self.finish_loading(&mut state, id, FetchOutcome::Resolved);
        }
    }

    /// Reject the waiters of the read holding `ticket`.
    ///
    /// No-op if the mark has since been cleared or reissued.
    pub fn reject_fetch(&self, id: &EntityId, ticket: LoadTicket, reason: &str) {
        let mut state = self.lock();
        if !state.owns(id, ticket) {
            tracing::trace!(entity = T::type_name(), %id, "stale fetch failure ignored");
            return;
        }
        tracing::warn!(entity = T::type_name(), %id, reason, "fetch failed, rejecting waiters");
        self.finish_loading(&mut state, id, FetchOutcome::Failed(Arc::from(reason)));
    }

    fn finish_loading(&self, state: &mut CacheState<T>, id: &EntityId, outcome: FetchOutcome) {
        if let Some(mark) = state.loading.remove(id) {
            mark.tx.send_replace(Some(outcome));
        }
        self.loading_tx.send_replace(state.loading_snapshot());
    }

    /// Receiver of loading-set snapshots. Starts at the current set.
    pub fn subscribe_loading(&self) -> watch::Receiver<BTreeSet<EntityId>> {
        self.loading_tx.subscribe()
    }

    // ===========================================
    // Writes
    // ===========================================

    /// Insert or replace `id`, notify its subscribers, then clear its loading mark.
    ///
    /// This is the write path used after every successful remote mutation.
    pub fn upsert(&self, id: &EntityId, entity: T) {
        let mut state = self.lock();
        self.write(&mut state, id, entity);
        self.finish_loading(&mut state, id, FetchOutcome::Resolved);
    }

    /// Insert or replace `id` and notify its subscribers. Leaves the loading
    /// set untouched.
    pub fn store(&self, id: &EntityId, entity: T) {
        let mut state = self.lock();
        self.write(&mut state, id, entity);
    }

    fn write(&self, state: &mut CacheState<T>, id: &EntityId, entity: T) {
        let replaced = state.entities.insert(id.clone(), entity.clone()).is_some();
        state.publish(id, Some(entity));
        tracing::trace!(entity = T::type_name(), %id, replaced, "stored");
    }

    /// Shallow-merge `partial` into the cached entry for `id`.
    ///
    /// Leaves the loading set untouched. Returns `Ok(false)` if `id` is not
    /// cached. If the merged record no longer fits `T` the entry is unchanged
    /// and an error is returned.
    pub fn patch_local(&self, id: &EntityId, partial: &Record) -> Result<bool, CacheError> {
        let mut state = self.lock();
        let Some(existing) = state.entities.get(id) else {
            return Ok(false);
        };

        let mut record = existing.to_record()?;
        for (key, value) in partial {
            record.insert(key.clone(), value.clone());
        }
        let merged = T::from_record(record)?;

        state.entities.insert(id.clone(), merged.clone());
        state.publish(id, Some(merged));
        tracing::trace!(entity = T::type_name(), %id, fields = partial.len(), "patched locally");
        Ok(true)
    }

    /// Remove `id` if present. Returns whether an entry was removed.
    pub fn remove(&self, id: &EntityId) -> bool {
        let mut state = self.lock();
        if state.entities.remove(id).is_none() {
            return false;
        }
        state.publish(id, None);
        state.prune(id);
        if state.active.as_ref() == Some(id) {
            state.active = None;
        }
        tracing::trace!(entity = T::type_name(), %id, "removed");
        true
    }

    /// Replace the whole cache with `list`.
    ///
    /// Ids missing from `list` are removed and their subscribers see `None`.
    pub fn replace_all(&self, list: Vec<T>) {
        let mut state = self.lock();
        let incoming: HashMap<EntityId, T> =
            list.into_iter().map(|entity| (entity.id(), entity)).collect();

        let dropped: Vec<EntityId> = state
            .entities
            .keys()
            .filter(|id| !incoming.contains_key(*id))
            .cloned()
            .collect();
        for (id, entity) in &incoming {
            state.publish(id, Some(entity.clone()));
        }
        state.entities = incoming;
        for id in &dropped {
            state.publish(id, None);
        }
        state.sweep();
        if let Some(active) = state.active.clone() {
            if !state.entities.contains_key(&active) {
                state.active = None;
            }
        }

        tracing::trace!(
            entity = T::type_name(),
            count = state.entities.len(),
            dropped = dropped.len(),
            "replaced all"
        );
    }

    /// Remove every entity.
    pub fn clear(&self) {
        self.replace_all(Vec::new());
    }

    // ===========================================
    // Active id
    // ===========================================

    /// Mark `id` as the currently selected entity.
    pub fn set_active(&self, id: EntityId) {
        self.lock().active = Some(id);
    }

    /// The currently selected id.
    pub fn active_id(&self) -> Option<EntityId> {
        self.lock().active.clone()
    }

    /// The currently selected entity, if it is cached.
    pub fn active(&self) -> Option<T> {
        let state = self.lock();
        state
            .active
            .as_ref()
            .and_then(|id| state.entities.get(id).cloned())
    }

    /// Clear the selection.
    pub fn clear_active(&self) {
        self.lock().active = None;
    }

    // ===========================================
    // Subscriptions
    // ===========================================

    /// Live stream of the values written to `id`.
    pub fn subscribe(&self, id: &EntityId) -> Subscription<T> {
        let mut state = self.lock();
        state.sweep();
        let rx = state.channel(id).subscribe();
        Subscription {
            id: id.clone(),
            rx,
            primed: false,
        }
    }

    /// Wait for any in-flight read of `id`, then subscribe to it.
    ///
    /// If `id` is not loading this is [`subscribe`](Self::subscribe). If the
    /// in-flight read fails, every waiter gets [`CacheError::FetchFailed`].
    pub async fn subscribe_while_loading(&self, id: &EntityId) -> Result<Subscription<T>, CacheError> {
        let pending = self.lock().loading.get(id).map(|mark| mark.tx.subscribe());

        if let Some(mut rx) = pending {
            let outcome = match rx.wait_for(Option::is_some).await {
                Ok(outcome) => outcome.clone(),
                Err(_) => Some(FetchOutcome::Failed(Arc::from("fetch abandoned"))),
            };
            if let Some(FetchOutcome::Failed(reason)) = outcome {
                return Err(CacheError::FetchFailed {
                    id: id.clone(),
                    reason: reason.to_string(),
                });
            }
        }

        Ok(self.subscribe(id))
    }
}

impl<T: Entity> Default for EntityCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> std::fmt::Debug for EntityCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("EntityCache")
            .field("entity", &T::type_name())
            .field("len", &state.entities.len())
            .field("loading", &state.loading.len())
            .field("active", &state.active)
            .finish()
    }
}

/// A live view of one cached id.
///
/// The first call to [`next`](Self::next) yields the current value if there
/// is one; later calls wait for the next write. The stream only ends if the
/// cache itself is dropped.
#[derive(Debug)]
pub struct Subscription<T> {
    id: EntityId,
    rx: watch::Receiver<Option<T>>,
    primed: bool,
}

impl<T: Clone> Subscription<T> {
    /// The subscribed id.
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// The latest value without waiting.
    pub fn current(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Next value for this id. `None` means the entity was removed.
    pub async fn next(&mut self) -> Result<Option<T>, CacheError> {
        if !self.primed {
            self.primed = true;
            let current = self.rx.borrow_and_update().clone();
            if current.is_some() {
                return Ok(current);
            }
        }
        self.rx.changed().await.map_err(|_| CacheError::Closed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Next value that is present, skipping removals.
    pub async fn next_entity(&mut self) -> Result<T, CacheError> {
        loop {
            if let Some(entity) = self.next().await? {
                return Ok(entity);
            }
        }
    }
}

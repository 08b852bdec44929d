//! EntityCache - in-memory collection shared by every context
//!
//! State machine: `Uninitialized -> Loading -> Ready | Error`, and back to
//! `Loading` on refresh. Subscribers watch `CacheStatus` (state + version).
//!
//! # Loads
//!
//! [`EntityCache::begin_load`] hands out a [`LoadTicket`]. Its result is
//! applied by [`EntityCache::finish_load`] only if nothing else touched the
//! cache in between (no newer load, no mutation); otherwise it is dropped
//! and the caller decides whether to fetch again. A failed load keeps the
//! previous items.
//!
//! [`EntityCache::load_shared`] runs one load at a time; callers that arrive
//! while a load is running wait for it and get its outcome.
//!
//! # Mutations
//!
//! Three phases: `apply_*` changes the items immediately and returns a
//! [`Pending`] holding the pre-image, then exactly one of
//! [`EntityCache::commit`] (merge the canonical row) or
//! [`EntityCache::rollback`] (restore the pre-image) settles it.
//!
//! The item lock is never held across an `.await`; only the load gate is.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared::models::{Artwork, ContactMessage, Rating, Review};
use tokio::sync::watch;

use crate::error::{ClientError, ClientResult};

/// Entities that can live in an [`EntityCache`]
pub trait CacheEntity: Clone + Send + Sync + 'static {
    fn entity_id(&self) -> &str;
}

impl CacheEntity for Artwork {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl CacheEntity for Review {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl CacheEntity for Rating {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl CacheEntity for ContactMessage {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// Id given to a created entity until the store assigns the real one
pub fn provisional_id() -> String {
    format!("pending-{}", uuid::Uuid::new_v4())
}

pub fn is_provisional(id: &str) -> bool {
    id.starts_with("pending-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
    Error,
}

/// What subscribers observe
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub state: LoadState,
    /// Bumped on every visible change of the items
    pub version: u64,
    pub last_error: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl CacheStatus {
    fn initial() -> Self {
        Self {
            state: LoadState::Uninitialized,
            version: 0,
            last_error: None,
            loaded_at: None,
        }
    }
}

/// Proof that a load was started; see [`EntityCache::finish_load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// What [`EntityCache::finish_load`] did with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was started; its result wins
    Superseded,
    /// A mutation landed while loading; the result may predate it
    Overtaken,
}

/// A mutation applied to the cache but not yet settled
#[must_use = "a pending mutation must be committed or rolled back"]
#[derive(Debug)]
pub struct Pending<T> {
    /// Id of the entity as it currently sits in the cache
    id: String,
    /// Entity and position before the change; `None` if it was absent
    pre_image: Option<(usize, T)>,
    /// Whether the apply step changed the items at all
    changed: bool,
}

impl<T> Pending<T> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

struct Inner<T> {
    items: Vec<T>,
    state: LoadState,
    version: u64,
    /// Bumped by every load start and every mutation phase
    generation: u64,
    load_in_flight: Option<u64>,
    last_error: Option<String>,
    loaded_at: Option<Instant>,
    loaded_at_utc: Option<DateTime<Utc>>,
    /// Loads run through `load_shared` so far, and how the last one ended
    loads_run: u64,
    last_load_error: Option<ClientError>,
}

impl<T> Inner<T> {
    fn status(&self) -> CacheStatus {
        CacheStatus {
            state: self.state,
            version: self.version,
            last_error: self.last_error.clone(),
            loaded_at: self.loaded_at_utc,
        }
    }

    fn position(&self, id: &str) -> Option<usize>
    where
        T: CacheEntity,
    {
        self.items.iter().position(|item| item.entity_id() == id)
    }

    fn settled_state(&self) -> LoadState {
        if self.loaded_at.is_some() {
            LoadState::Ready
        } else {
            LoadState::Uninitialized
        }
    }
}

pub struct EntityCache<T> {
    name: &'static str,
    stale_after: Duration,
    inner: RwLock<Inner<T>>,
    load_gate: tokio::sync::Mutex<()>,
    status_tx: watch::Sender<CacheStatus>,
}

impl<T> std::fmt::Debug for EntityCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("EntityCache")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("items", &inner.items.len())
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: CacheEntity> EntityCache<T> {
    pub fn new(name: &'static str, stale_after: Duration) -> Self {
        let (status_tx, _) = watch::channel(CacheStatus::initial());
        Self {
            name,
            stale_after,
            inner: RwLock::new(Inner {
                items: Vec::new(),
                state: LoadState::Uninitialized,
                version: 0,
                generation: 0,
                load_in_flight: None,
                last_error: None,
                loaded_at: None,
                loaded_at_utc: None,
                loads_run: 0,
                last_load_error: None,
            }),
            load_gate: tokio::sync::Mutex::new(()),
            status_tx,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    // ========== Reads ==========

    pub fn subscribe(&self) -> watch::Receiver<CacheStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> CacheStatus {
        self.inner.read().status()
    }

    pub fn state(&self) -> LoadState {
        self.inner.read().state
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.inner.read().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.inner
            .read()
            .items
            .iter()
            .find(|item| item.entity_id() == id)
            .cloned()
    }

    /// Run `f` over the current items without cloning them
    pub fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.read().items)
    }

    /// Like [`read`](Self::read), with the version the items belong to
    pub fn read_versioned<R>(&self, f: impl FnOnce(&[T], u64) -> R) -> R {
        let inner = self.inner.read();
        f(&inner.items, inner.version)
    }

    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    /// Never loaded, or last successful load older than the staleness window.
    /// A cache that is loading right now is not stale.
    pub fn is_stale(&self) -> bool {
        let inner = self.inner.read();
        if inner.state == LoadState::Loading {
            return false;
        }
        match inner.loaded_at {
            Some(at) => at.elapsed() >= self.stale_after,
            None => true,
        }
    }

    /// Force the next freshness check to reload
    pub fn invalidate(&self) {
        let mut inner = self.inner.write();
        inner.loaded_at = None;
        tracing::debug!(cache = self.name, "Cache invalidated");
    }

    // ========== Loads ==========

    /// Run `load`, or join the one already running.
    ///
    /// A caller that has to wait for the gate returns the outcome of the load
    /// that finished meanwhile instead of fetching again.
    pub async fn load_shared<F, Fut>(&self, load: F) -> ClientResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<()>>,
    {
        let seen = self.inner.read().loads_run;
        let _gate = self.load_gate.lock().await;

        {
            let inner = self.inner.read();
            if inner.loads_run != seen {
                tracing::debug!(cache = self.name, "Joined a load already in flight");
                return match &inner.last_load_error {
                    Some(e) => Err(e.duplicate()),
                    None => Ok(()),
                };
            }
        }

        let result = load().await;

        let mut inner = self.inner.write();
        inner.loads_run += 1;
        inner.last_load_error = result.as_ref().err().map(ClientError::duplicate);
        result
    }

    pub fn begin_load(&self) -> LoadTicket {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.load_in_flight = Some(inner.generation);
        inner.state = LoadState::Loading;
        self.publish(&inner);
        LoadTicket {
            generation: inner.generation,
        }
    }

    /// Apply a load result if it is still relevant
    pub fn finish_load(&self, ticket: LoadTicket, result: Result<Vec<T>, String>) -> LoadOutcome {
        let mut inner = self.inner.write();

        if inner.load_in_flight != Some(ticket.generation) {
            tracing::debug!(cache = self.name, "Dropping result of a superseded load");
            return LoadOutcome::Superseded;
        }
        inner.load_in_flight = None;

        if inner.generation != ticket.generation {
            // a mutation landed while loading; the result may predate it
            tracing::debug!(cache = self.name, "Dropping load result overtaken by a mutation");
            inner.state = inner.settled_state();
            inner.loaded_at = None;
            self.publish(&inner);
            return LoadOutcome::Overtaken;
        }

        match result {
            Ok(items) => {
                inner.items = items;
                inner.state = LoadState::Ready;
                inner.last_error = None;
                inner.loaded_at = Some(Instant::now());
                inner.loaded_at_utc = Some(Utc::now());
                inner.version += 1;
            }
            Err(message) => {
                inner.state = LoadState::Error;
                inner.last_error = Some(message);
            }
        }
        self.publish(&inner);
        LoadOutcome::Applied
    }

    // ========== Mutations ==========

    /// Insert at the front (newest first)
    pub fn apply_insert(&self, item: T) -> Pending<T> {
        let mut inner = self.inner.write();
        let id = item.entity_id().to_string();
        let pre_image = inner
            .position(&id)
            .map(|idx| (idx, inner.items.remove(idx)));
        inner.items.insert(0, item);
        self.touch(&mut inner);
        Pending {
            id,
            pre_image,
            changed: true,
        }
    }

    /// Change an entity in place; a missing id applies nothing
    pub fn apply_update(&self, id: &str, f: impl FnOnce(&mut T)) -> Pending<T> {
        let mut inner = self.inner.write();
        let pre_image = match inner.position(id) {
            Some(idx) => {
                let before = inner.items[idx].clone();
                f(&mut inner.items[idx]);
                Some((idx, before))
            }
            None => None,
        };
        let changed = pre_image.is_some();
        if changed {
            self.touch(&mut inner);
        }
        Pending {
            id: id.to_string(),
            pre_image,
            changed,
        }
    }

    /// Change every entity matching `filter`; one pending per changed entity
    pub fn apply_update_where(
        &self,
        filter: impl Fn(&T) -> bool,
        f: impl Fn(&mut T),
    ) -> Vec<Pending<T>> {
        let mut inner = self.inner.write();
        let mut pending = Vec::new();
        for (idx, item) in inner.items.iter_mut().enumerate() {
            if filter(item) {
                let before = item.clone();
                f(item);
                pending.push(Pending {
                    id: before.entity_id().to_string(),
                    pre_image: Some((idx, before)),
                    changed: true,
                });
            }
        }
        if !pending.is_empty() {
            self.touch(&mut inner);
        }
        pending
    }

    pub fn apply_remove(&self, id: &str) -> Pending<T> {
        let mut inner = self.inner.write();
        let pre_image = inner
            .position(id)
            .map(|idx| (idx, inner.items.remove(idx)));
        let changed = pre_image.is_some();
        if changed {
            self.touch(&mut inner);
        }
        Pending {
            id: id.to_string(),
            pre_image,
            changed,
        }
    }

    /// Settle a mutation with the store's canonical row.
    ///
    /// `None` keeps the optimistic state as final (deletes, counters).
    /// A provisional entry is replaced by the canonical one, never duplicated.
    pub fn commit(&self, pending: Pending<T>, canonical: Option<T>) {
        if canonical.is_none() && !pending.changed {
            return;
        }
        let mut inner = self.inner.write();
        if let Some(item) = canonical {
            let canonical_id = item.entity_id().to_string();
            match inner.position(&pending.id) {
                Some(idx) => {
                    inner.items[idx] = item;
                    if canonical_id != pending.id {
                        let mut position = 0;
                        inner.items.retain(|other| {
                            let keep = position == idx || other.entity_id() != canonical_id;
                            position += 1;
                            keep
                        });
                    }
                }
                None => match inner.position(&canonical_id) {
                    Some(idx) => inner.items[idx] = item,
                    None => {
                        let idx = pending
                            .pre_image
                            .as_ref()
                            .map_or(0, |(idx, _)| (*idx).min(inner.items.len()));
                        inner.items.insert(idx, item);
                    }
                },
            }
        }
        self.touch(&mut inner);
    }

    /// Restore the pre-image exactly
    pub fn rollback(&self, pending: Pending<T>) {
        if !pending.changed {
            return;
        }
        let mut inner = self.inner.write();
        if let Some(idx) = inner.position(&pending.id) {
            inner.items.remove(idx);
        }
        if let Some((idx, item)) = pending.pre_image {
            let idx = idx.min(inner.items.len());
            inner.items.insert(idx, item);
        }
        self.touch(&mut inner);
        tracing::debug!(cache = self.name, id = %pending.id, "Optimistic change rolled back");
    }

    /// Await the store call for `pending`, then commit or roll back.
    ///
    /// `reconcile` picks the canonical row out of the call's result.
    pub async fn run<R, F>(
        &self,
        pending: Pending<T>,
        call: F,
        reconcile: impl FnOnce(&R) -> Option<T>,
    ) -> ClientResult<R>
    where
        F: Future<Output = ClientResult<R>>,
    {
        match call.await {
            Ok(result) => {
                self.commit(pending, reconcile(&result));
                Ok(result)
            }
            Err(e) => {
                self.rollback(pending);
                self.record_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Remember the error of a failed action for subscribers
    pub fn record_error(&self, message: String) {
        let mut inner = self.inner.write();
        tracing::warn!(cache = self.name, error = %message, "Cache operation failed");
        inner.last_error = Some(message);
        self.publish(&inner);
    }

    /// Any visible change: new version, in-flight loads become irrelevant
    fn touch(&self, inner: &mut Inner<T>) {
        inner.version += 1;
        inner.generation += 1;
        self.publish(inner);
    }

    fn publish(&self, inner: &Inner<T>) {
        self.status_tx.send_replace(inner.status());
    }
}

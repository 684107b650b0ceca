//! In-process implementations of the store, media and registry traits.
//!
//! A [`MemoryNetwork`] plays the role of the shared backend: every
//! [`MemoryStore`] connected to it sees the same objects and blobs, which
//! lets tests and the demo binary run several actors against one world.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chatcore::types::{ActorId, ObjectId, RawObject};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::debug;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, watch};

use crate::collection::{ObjectCollection, Snapshot};
use crate::store::error::{Result, StoreError};
use crate::store::traits::{ClaimOutcome, MediaStore, NameRegistry, ObjectStore};

const MAGNET_PREFIX: &str = "magnet:?xt=urn:sha256:";

/// Whole milliseconds of `delay`, saturating at `u64::MAX`.
fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

struct Subscription {
    contexts: Vec<String>,
    tx: watch::Sender<Snapshot>,
}

#[derive(Default)]
struct NetworkState {
    objects: Vec<RawObject>,
    subscriptions: Vec<Subscription>,
}

impl NetworkState {
    fn matching(&self, contexts: &[String]) -> Vec<RawObject> {
        self.objects
            .iter()
            .filter(|o| o.in_any_context(contexts))
            .cloned()
            .collect()
    }

    /// Pushes fresh snapshots to subscribers whose view actually changed and
    /// forgets subscribers that went away.
    fn publish(&mut self) {
        self.subscriptions.retain(|s| !s.tx.is_closed());
        for i in 0..self.subscriptions.len() {
            let next = self.matching(&self.subscriptions[i].contexts);
            self.subscriptions[i].tx.send_if_modified(|current| {
                if current.as_slice() == next.as_slice() {
                    false
                } else {
                    *current = Arc::new(next);
                    true
                }
            });
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.id() == Some(id))
    }
}

/// Shared in-memory backend.
pub struct MemoryNetwork {
    state: Mutex<NetworkState>,
    media: DashMap<String, Bytes>,
    registry: Arc<MemoryRegistry>,
    epoch: DateTime<Utc>,
    seq: AtomicU64,
    fetches: AtomicUsize,
    fetch_delay_ms: AtomicU64,
    fail_writes: AtomicBool,
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self {
            state: Mutex::new(NetworkState::default()),
            media: DashMap::new(),
            registry: Arc::new(MemoryRegistry::new()),
            epoch: Utc::now(),
            seq: AtomicU64::new(0),
            fetches: AtomicUsize::new(0),
            fetch_delay_ms: AtomicU64::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A client of this network acting as `actor`.
    pub fn connect_as(self: &Arc<Self>, actor: impl Into<ActorId>) -> MemoryStore {
        MemoryStore {
            network: self.clone(),
            me: actor.into(),
        }
    }

    pub fn registry(&self) -> Arc<MemoryRegistry> {
        self.registry.clone()
    }

    /// Content address of `data`.
    pub fn magnet_for(data: &[u8]) -> String {
        format!("{MAGNET_PREFIX}{}", hex::encode(Sha256::digest(data)))
    }

    /// Inserts an object exactly as given, without stamping. Stands in for
    /// objects written by other, possibly misbehaving, clients.
    pub async fn deliver(&self, object: RawObject) {
        let mut state = self.state.lock().await;
        state.objects.push(object);
        state.publish();
    }

    pub async fn object_count(&self) -> usize {
        self.state.lock().await.objects.len()
    }

    /// Number of media fetches served so far, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        self.fetch_delay_ms
            .store(millis(delay), Ordering::SeqCst);
    }

    /// Makes every subsequent write fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("network unavailable".into()));
        }
        Ok(())
    }

    /// Monotonic timestamps so posts from one run order deterministically.
    fn next_stamp(&self, actor: &str) -> (ObjectId, String) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let published = (self.epoch + TimeDelta::milliseconds(seq as i64))
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let id = hex::encode(Sha256::digest(format!("{actor}:{seq}:{published}")));
        (id, published)
    }
}

/// One actor's connection to a [`MemoryNetwork`].
#[derive(Clone)]
pub struct MemoryStore {
    network: Arc<MemoryNetwork>,
    me: ActorId,
}

impl MemoryStore {
    pub fn network(&self) -> &Arc<MemoryNetwork> {
        &self.network
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn me(&self) -> &str {
        &self.me
    }

    async fn subscribe(&self, contexts: &[String]) -> Result<ObjectCollection> {
        let mut state = self.network.state.lock().await;
        let (tx, rx) = watch::channel(Arc::new(state.matching(contexts)));
        state.subscriptions.push(Subscription {
            contexts: contexts.to_vec(),
            tx,
        });
        Ok(ObjectCollection::new(rx))
    }

    async fn post(&self, mut object: RawObject) -> Result<RawObject> {
        self.network.check_writable()?;
        let (id, published) = self.network.next_stamp(&self.me);
        object.set("id", id.clone());
        object.set("actor", self.me.clone());
        object.set("published", published);

        let mut state = self.network.state.lock().await;
        state.objects.push(object.clone());
        state.publish();
        debug!("{} posted {}", self.me, id);
        Ok(object)
    }

    async fn replace(&self, object: RawObject) -> Result<()> {
        self.network.check_writable()?;
        let id = object.id().ok_or(StoreError::MissingId)?.to_string();

        let mut state = self.network.state.lock().await;
        let index = state
            .position(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let existing = &state.objects[index];
        if existing.actor() != Some(self.me.as_str()) {
            return Err(StoreError::NotOwner(id));
        }

        // Store-owned stamps survive the edit.
        let mut updated = object;
        updated.set("actor", self.me.clone());
        if let Some(published) = existing.get("published").cloned() {
            updated.set("published", published);
        }
        state.objects[index] = updated;
        state.publish();
        Ok(())
    }

    async fn remove(&self, ids: &[ObjectId]) -> Result<()> {
        self.network.check_writable()?;
        let mut state = self.network.state.lock().await;

        // Validate everything first so a bad id removes nothing.
        for id in ids {
            let index = state
                .position(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            if state.objects[index].actor() != Some(self.me.as_str()) {
                return Err(StoreError::NotOwner(id.clone()));
            }
        }
        state
            .objects
            .retain(|o| !o.id().is_some_and(|id| ids.iter().any(|r| r == id)));
        state.publish();
        Ok(())
    }
}

#[async_trait]
impl MediaStore for MemoryStore {
    async fn fetch(&self, magnet: &str) -> Result<Bytes> {
        self.network.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = self.network.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.network
            .media
            .get(magnet)
            .map(|data| data.clone())
            .ok_or_else(|| StoreError::ContentNotFound(magnet.to_string()))
    }

    async fn store(&self, data: Bytes) -> Result<String> {
        self.network.check_writable()?;
        let magnet = MemoryNetwork::magnet_for(&data);
        self.network.media.insert(magnet.clone(), data);
        Ok(magnet)
    }
}

/// Username registry backed by two maps kept in step.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    by_actor: DashMap<ActorId, String>,
    by_name: DashMap<String, ActorId>,
    queries: AtomicUsize,
    delay_ms: AtomicU64,
    offline: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a username directly, bypassing the claim rules.
    pub fn insert(&self, actor: impl Into<ActorId>, username: impl Into<String>) {
        let (actor, username) = (actor.into(), username.into());
        self.by_name.insert(username.clone(), actor.clone());
        self.by_actor.insert(actor, username);
    }

    /// Number of lookups served in either direction.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(millis(delay), Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    async fn begin_query(&self) -> Result<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("registry unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl NameRegistry for MemoryRegistry {
    async fn actor_to_username(&self, actor: &str) -> Result<Option<String>> {
        self.begin_query().await?;
        Ok(self.by_actor.get(actor).map(|name| name.clone()))
    }

    async fn username_to_actor(&self, username: &str) -> Result<Option<ActorId>> {
        self.begin_query().await?;
        Ok(self.by_name.get(username).map(|actor| actor.clone()))
    }

    async fn request_username(&self, actor: &str, username: &str) -> Result<ClaimOutcome> {
        self.begin_query().await?;
        match self.by_name.entry(username.to_string()) {
            Entry::Occupied(holder) if holder.get() == actor => {
                return Ok(ClaimOutcome::AlreadyOwned);
            }
            Entry::Occupied(_) => return Ok(ClaimOutcome::Taken),
            Entry::Vacant(slot) => {
                slot.insert(actor.to_string());
            }
        }
        // The entry guard is released before touching other shards.
        if let Some(previous) = self.by_actor.insert(actor.to_string(), username.to_string()) {
            self.by_name.remove(&previous);
        }
        Ok(ClaimOutcome::Claimed)
    }
}

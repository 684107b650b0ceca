//! Actor id ↔ username resolution.
//!
//! Forward resolution (`resolve`) is memoized and never blocks: the first
//! call for an actor seeds the cache with the raw id and starts one registry
//! lookup in the background. When the lookup settles the entry is upgraded
//! and a [`UsernameResolved`] event goes out on the bus, so renderers can swap
//! the fallback for the name. A failed or empty lookup leaves the raw id as
//! the permanent value for the session.
//!
//! Reverse resolution (`lookup`) is rare (starting a private conversation),
//! so it is not cached and its errors are returned to the caller.

use std::sync::Arc;

use chatcore::types::ActorId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, warn};
use thiserror::Error;
use tokio::sync::{broadcast, watch};

use crate::store::error::StoreError;
use crate::store::traits::{ClaimOutcome, NameRegistry};
use crate::types::events::{EventBus, UsernameResolved};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("registry lookup failed: {0}")]
    Registry(#[from] StoreError),
}

/// State of one cached actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A lookup is in flight; the raw id is shown meanwhile.
    Pending,
    Resolved(String),
    /// The lookup failed or found nothing. The raw id stays.
    Unresolved,
}

impl Resolution {
    fn display(&self, actor: &str) -> String {
        match self {
            Resolution::Resolved(username) => username.clone(),
            Resolution::Pending | Resolution::Unresolved => actor.to_string(),
        }
    }
}

type ResolverCache = DashMap<ActorId, watch::Sender<Resolution>>;

pub struct IdentifierResolver {
    registry: Arc<dyn NameRegistry>,
    events: Arc<EventBus>,
    cache: Arc<ResolverCache>,
}

impl IdentifierResolver {
    pub fn new(registry: Arc<dyn NameRegistry>, events: Arc<EventBus>) -> Self {
        Self {
            registry,
            events,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Display value for `actor`: the username if known, otherwise the raw id.
    ///
    /// Must be called from within a Tokio runtime; the first call for an
    /// actor spawns its lookup.
    pub fn resolve(&self, actor: &str) -> String {
        match self.cache.entry(actor.to_string()) {
            Entry::Occupied(entry) => return entry.get().borrow().display(actor),
            Entry::Vacant(slot) => {
                slot.insert(watch::channel(Resolution::Pending).0);
            }
        }
        self.spawn_lookup(actor.to_string());
        actor.to_string()
    }

    /// Like [`resolve`](Self::resolve), but waits for a pending lookup to
    /// settle. Never starts more than one lookup per actor either.
    pub async fn resolve_now(&self, actor: &str) -> String {
        self.resolve(actor);
        let rx = self.cache.get(actor).map(|tx| tx.subscribe());
        let Some(mut rx) = rx else {
            return actor.to_string();
        };
        match rx
            .wait_for(|state| !matches!(state, Resolution::Pending))
            .await
        {
            Ok(state) => state.display(actor),
            Err(_) => actor.to_string(),
        }
    }

    fn spawn_lookup(&self, actor: ActorId) {
        let registry = self.registry.clone();
        let events = self.events.clone();
        let cache = self.cache.clone();

        tokio::spawn(async move {
            let outcome = match registry.actor_to_username(&actor).await {
                Ok(Some(username)) if !username.is_empty() => Resolution::Resolved(username),
                Ok(_) => {
                    debug!("No username registered for {actor}");
                    Resolution::Unresolved
                }
                Err(e) => {
                    warn!("Username lookup for {actor} failed: {e}");
                    Resolution::Unresolved
                }
            };

            // A claim may have resolved the entry while we were waiting.
            let applied = cache.get(&actor).is_some_and(|tx| {
                tx.send_if_modified(|state| {
                    if *state == Resolution::Pending {
                        *state = outcome.clone();
                        true
                    } else {
                        false
                    }
                })
            });

            if applied && let Resolution::Resolved(username) = outcome {
                let _ = events
                    .username_resolved
                    .send(Arc::new(UsernameResolved { actor, username }));
            }
        });
    }

    /// Actor holding `username`, straight from the registry.
    pub async fn lookup(&self, username: &str) -> Result<Option<ActorId>, ResolverError> {
        Ok(self.registry.username_to_actor(username).await?)
    }

    /// Asks the registry to give `username` to `actor`. On success the cache
    /// is updated at once.
    pub async fn claim(&self, actor: &str, username: &str) -> Result<ClaimOutcome, ResolverError> {
        let outcome = self.registry.request_username(actor, username).await?;
        if outcome != ClaimOutcome::Taken {
            self.store_resolved(actor, username);
        }
        Ok(outcome)
    }

    fn store_resolved(&self, actor: &str, username: &str) {
        let resolved = Resolution::Resolved(username.to_string());
        let changed = match self.cache.entry(actor.to_string()) {
            Entry::Occupied(entry) => entry.get().send_if_modified(|state| {
                if *state == resolved {
                    false
                } else {
                    *state = resolved.clone();
                    true
                }
            }),
            Entry::Vacant(slot) => {
                slot.insert(watch::channel(resolved).0);
                true
            }
        };
        if changed {
            let _ = self.events.username_resolved.send(Arc::new(UsernameResolved {
                actor: actor.to_string(),
                username: username.to_string(),
            }));
        }
    }

    pub fn state(&self, actor: &str) -> Option<Resolution> {
        self.cache.get(actor).map(|tx| tx.borrow().clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<UsernameResolved>> {
        self.events.username_resolved.subscribe()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drops every entry. Used at session teardown.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRegistry;
    use std::time::Duration;

    fn resolver_with(registry: Arc<MemoryRegistry>) -> IdentifierResolver {
        IdentifierResolver::new(registry, Arc::new(EventBus::new()))
    }

    #[tokio::test]
    async fn test_fallback_then_single_lookup() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert("a1", "ada");
        registry.set_delay(Duration::from_millis(20));
        let resolver = resolver_with(registry.clone());

        assert_eq!(resolver.resolve("a1"), "a1");
        assert_eq!(resolver.resolve("a1"), "a1");
        assert_eq!(resolver.state("a1"), Some(Resolution::Pending));

        assert_eq!(resolver.resolve_now("a1").await, "ada");
        assert_eq!(resolver.resolve("a1"), "ada");
        assert_eq!(registry.query_count(), 1);
    }

    #[tokio::test]
    async fn test_resolution_publishes_event() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert("a1", "ada");
        let resolver = resolver_with(registry);
        let mut events = resolver.subscribe();

        resolver.resolve("a1");
        let event = events.recv().await.unwrap();
        assert_eq!(*event, UsernameResolved {
            actor: "a1".into(),
            username: "ada".into(),
        });
    }

    #[tokio::test]
    async fn test_failure_keeps_fallback_without_retry() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert("a1", "ada");
        registry.set_offline(true);
        let resolver = resolver_with(registry.clone());

        assert_eq!(resolver.resolve_now("a1").await, "a1");
        assert_eq!(resolver.state("a1"), Some(Resolution::Unresolved));

        registry.set_offline(false);
        assert_eq!(resolver.resolve("a1"), "a1");
        assert_eq!(resolver.resolve_now("a1").await, "a1");
        assert_eq!(registry.query_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_actor_is_unresolved() {
        let resolver = resolver_with(Arc::new(MemoryRegistry::new()));
        assert_eq!(resolver.resolve_now("ghost").await, "ghost");
        assert_eq!(resolver.state("ghost"), Some(Resolution::Unresolved));
    }

    #[tokio::test]
    async fn test_lookup_is_uncached_and_surfaces_errors() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert("a1", "ada");
        let resolver = resolver_with(registry.clone());

        assert_eq!(resolver.lookup("ada").await, Ok(Some("a1".to_string())));
        assert_eq!(resolver.lookup("ada").await, Ok(Some("a1".to_string())));
        assert_eq!(resolver.lookup("nobody").await, Ok(None));
        assert_eq!(registry.query_count(), 3);
        assert!(resolver.is_empty());

        registry.set_offline(true);
        assert!(matches!(
            resolver.lookup("ada").await,
            Err(ResolverError::Registry(_))
        ));
    }

    /// Registry whose forward lookups hang until released, then find nothing.
    struct StaleRegistry {
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl NameRegistry for StaleRegistry {
        async fn actor_to_username(&self, _actor: &str) -> crate::store::error::Result<Option<String>> {
            self.release.notified().await;
            Ok(None)
        }

        async fn username_to_actor(&self, _username: &str) -> crate::store::error::Result<Option<ActorId>> {
            Ok(None)
        }

        async fn request_username(
            &self,
            _actor: &str,
            _username: &str,
        ) -> crate::store::error::Result<ClaimOutcome> {
            Ok(ClaimOutcome::Claimed)
        }
    }

    #[tokio::test]
    async fn test_claim_is_never_downgraded_by_stale_lookup() {
        let registry = Arc::new(StaleRegistry {
            release: tokio::sync::Notify::new(),
        });
        let resolver = IdentifierResolver::new(registry.clone(), Arc::new(EventBus::new()));

        assert_eq!(resolver.resolve("me"), "me");
        tokio::task::yield_now().await;

        assert_eq!(resolver.claim("me", "grace").await, Ok(ClaimOutcome::Claimed));
        assert_eq!(resolver.resolve("me"), "grace");

        // The lookup started before the claim now settles with nothing.
        registry.release.notify_one();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            resolver.state("me"),
            Some(Resolution::Resolved("grace".into()))
        );
    }

    #[tokio::test]
    async fn test_taken_claim_leaves_cache_alone() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert("bob", "grace");
        let resolver = resolver_with(registry);

        assert_eq!(resolver.claim("me", "grace").await, Ok(ClaimOutcome::Taken));
        assert_eq!(resolver.state("me"), None);
    }
}

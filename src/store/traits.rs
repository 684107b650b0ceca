//! Interfaces of the external collaborators: the object store, the media
//! transport and the username registry. The session talks to them only
//! through these traits.

use async_trait::async_trait;
use bytes::Bytes;
use chatcore::types::{ActorId, ObjectId, RawObject};

use crate::collection::ObjectCollection;
use crate::store::error::Result;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// The viewer's own actor id.
    fn me(&self) -> &str;

    /// Resolves once the client is connected. Raised once per session.
    async fn ready(&self) -> Result<()> {
        Ok(())
    }

    /// Live collection of every object tagged with any of `contexts`.
    async fn subscribe(&self, contexts: &[String]) -> Result<ObjectCollection>;

    /// Writes a new object. The returned copy carries the `id`, `actor` and
    /// `published` stamped by the store.
    async fn post(&self, object: RawObject) -> Result<RawObject>;

    /// Replaces a previously posted object with the same `id`.
    async fn replace(&self, object: RawObject) -> Result<()>;

    /// Deletes previously posted objects. Only their original actor may.
    async fn remove(&self, ids: &[ObjectId]) -> Result<()>;
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn fetch(&self, magnet: &str) -> Result<Bytes>;

    /// Uploads bytes and returns their content address.
    async fn store(&self, data: Bytes) -> Result<String>;
}

/// Outcome of asking the registry for a username.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    AlreadyOwned,
    Taken,
}

#[async_trait]
pub trait NameRegistry: Send + Sync {
    /// `Ok(None)` when the actor has no username.
    async fn actor_to_username(&self, actor: &str) -> Result<Option<String>>;

    /// `Ok(None)` when nobody holds the username.
    async fn username_to_actor(&self, username: &str) -> Result<Option<ActorId>>;

    /// Assigns `username` to `actor` if nobody else holds it.
    async fn request_username(&self, actor: &str, username: &str) -> Result<ClaimOutcome>;
}

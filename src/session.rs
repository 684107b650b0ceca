use std::sync::Arc;

use bytes::Bytes;
use chatcore::DraftError;
use chatcore::types::{ActorId, ImageAttachment};
use log::info;
use thiserror::Error;

use crate::collection::ObjectCollection;
use crate::config::SessionConfig;
use crate::content::{ContentCache, ContentError};
use crate::resolver::{IdentifierResolver, ResolverError};
use crate::store::error::StoreError;
use crate::store::traits::{ClaimOutcome, MediaStore, NameRegistry, ObjectStore};
use crate::types::events::{Connected, EventBus};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid draft: {0}")]
    Draft(#[from] DraftError),
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),
    #[error("object has no id")]
    MissingId,
    #[error("session is missing its {0}")]
    MissingComponent(&'static str),
}

/// One viewer's connection to the object store, with the caches shared by
/// every view the presentation layer builds from it.
pub struct Session {
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) media: Arc<dyn MediaStore>,
    pub(crate) resolver: Arc<IdentifierResolver>,
    pub(crate) content: Arc<ContentCache>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) config: SessionConfig,
    me: ActorId,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    pub fn content(&self) -> &ContentCache {
        &self.content
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Waits for the store to come up, then resolves the viewer's own name.
    /// Returns that name (or the raw id when the viewer has none).
    pub async fn connect(&self) -> Result<String, ClientError> {
        self.store.ready().await?;
        let display_name = self.resolver.resolve_now(&self.me).await;
        info!("Connected as {display_name} ({})", self.me);
        let _ = self.events.connected.send(Arc::new(Connected {
            actor: self.me.clone(),
            display_name: display_name.clone(),
        }));
        Ok(display_name)
    }

    /// Name to show for `actor` right now. See [`IdentifierResolver::resolve`].
    pub fn display_name(&self, actor: &str) -> String {
        self.resolver.resolve(actor)
    }

    /// Actor behind a username, e.g. to start a private conversation.
    pub async fn find_actor(&self, username: &str) -> Result<Option<ActorId>, ClientError> {
        Ok(self.resolver.lookup(username).await?)
    }

    pub async fn claim_username(&self, username: &str) -> Result<ClaimOutcome, ClientError> {
        Ok(self.resolver.claim(&self.me, username).await?)
    }

    /// Uploads image bytes and returns the attachment that references them.
    pub async fn upload_image(&self, data: Bytes) -> Result<ImageAttachment, ClientError> {
        let magnet = self.media.store(data).await?;
        Ok(ImageAttachment::new(magnet))
    }

    pub(crate) async fn subscribe(&self, contexts: &[String]) -> Result<ObjectCollection, ClientError> {
        Ok(self.store.subscribe(contexts).await?)
    }
}

#[derive(Default)]
pub struct SessionBuilder {
    store: Option<Arc<dyn ObjectStore>>,
    media: Option<Arc<dyn MediaStore>>,
    registry: Option<Arc<dyn NameRegistry>>,
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_media(mut self, media: Arc<dyn MediaStore>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn NameRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Session, ClientError> {
        let store = self.store.ok_or(ClientError::MissingComponent("object store"))?;
        let media = self.media.ok_or(ClientError::MissingComponent("media store"))?;
        let registry = self
            .registry
            .ok_or(ClientError::MissingComponent("name registry"))?;

        let events = Arc::new(EventBus::new());
        Ok(Session {
            me: store.me().to_string(),
            resolver: Arc::new(IdentifierResolver::new(registry, events.clone())),
            content: Arc::new(ContentCache::new(media.clone(), events.clone())),
            store,
            media,
            events,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryNetwork;

    #[test]
    fn test_builder_requires_every_collaborator() {
        let network = MemoryNetwork::new();
        let store = Arc::new(network.connect_as("me"));
        let result = Session::builder().with_store(store.clone()).build();
        assert!(matches!(result, Err(ClientError::MissingComponent("media store"))));

        let session = Session::builder()
            .with_store(store.clone())
            .with_media(store)
            .with_registry(network.registry())
            .build()
            .unwrap();
        assert_eq!(session.me(), "me");
        assert_eq!(session.config().channel, "general");
    }

    #[tokio::test]
    async fn test_connect_resolves_own_name() {
        let network = MemoryNetwork::new();
        network.registry().insert("me", "grace");
        let store = Arc::new(network.connect_as("me"));
        let session = Session::builder()
            .with_store(store.clone())
            .with_media(store)
            .with_registry(network.registry())
            .build()
            .unwrap();
        let mut connected = session.events().connected.subscribe();

        assert_eq!(session.connect().await.unwrap(), "grace");
        assert_eq!(connected.recv().await.unwrap().display_name, "grace");
        assert_eq!(session.display_name("me"), "grace");
    }
}

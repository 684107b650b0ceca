//! Message feeds, replies and the mutations behind the composer.

use bytes::Bytes;
use chatcore::DraftError;
use chatcore::filter::{self, FeedFilter, FeedScope};
use chatcore::outgoing::{self, MessageDraft};
use chatcore::types::{Note, RawObject};
use log::debug;

use crate::collection::View;
use crate::session::{ClientError, Session};

/// Feature handle for message operations.
pub struct Messages<'a> {
    session: &'a Session,
}

impl<'a> Messages<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// The configured public channel.
    pub fn channel(&self) -> FeedScope {
        FeedScope::channel(self.session.config.channel.clone())
    }

    /// The private conversation between the viewer and `partner`.
    pub fn private_with(&self, partner: &str) -> FeedScope {
        FeedScope::private(self.session.me(), partner)
    }

    /// Live feed for `scope`, newest first, limited per the session config.
    pub async fn feed(&self, scope: FeedScope) -> Result<View<Vec<Note>>, ClientError> {
        let config = &self.session.config;
        let feed_filter = FeedFilter::new(scope)
            .with_limit(config.feed_limit)
            .with_require_content(config.require_content);
        let collection = self.session.subscribe(&feed_filter.scope.contexts()).await?;
        Ok(collection.view(move |objects| feed_filter.apply(objects)))
    }

    /// Starts downloading every image in `feed` so it is ready when rendered.
    pub fn prefetch_images(&self, feed: &[Note]) {
        let images = filter::feed_images(feed);
        self.session
            .content
            .prefetch(images.iter().map(|image| image.magnet.as_str()));
    }

    /// Replies to `message_id`, in collection order.
    pub async fn replies(&self, message_id: &str) -> Result<View<Vec<Note>>, ClientError> {
        let collection = self.session.subscribe(&[message_id.to_string()]).await?;
        Ok(collection.view(filter::replies))
    }

    /// Posts a message. Returns the object as stamped by the store.
    pub async fn send(
        &self,
        draft: MessageDraft,
        scope: &FeedScope,
    ) -> Result<RawObject, ClientError> {
        let object = outgoing::note(&draft, scope)?;
        let posted = self.session.store.post(object).await?;
        debug!(target: "Messages", "Sent {:?} to {:?}", posted.id(), scope);
        Ok(posted)
    }

    /// Uploads `image` first, then posts the message carrying it.
    pub async fn send_with_image(
        &self,
        draft: MessageDraft,
        image: Bytes,
        scope: &FeedScope,
    ) -> Result<RawObject, ClientError> {
        let attachment = self.session.upload_image(image).await?;
        self.send(draft.with_image(attachment), scope).await
    }

    pub async fn reply(
        &self,
        parent_id: &str,
        draft: MessageDraft,
    ) -> Result<RawObject, ClientError> {
        let object = outgoing::reply(&draft, parent_id)?;
        Ok(self.session.store.post(object).await?)
    }

    /// Replaces the text of one of the viewer's messages.
    pub async fn edit(&self, note: &Note, content: &str) -> Result<(), ClientError> {
        if note.id.is_none() {
            return Err(ClientError::MissingId);
        }
        let mut updated = note.raw.clone();
        updated.set("content", content);
        if Note::from_raw(&updated).is_none_or(|n| !n.has_body()) {
            return Err(DraftError::EmptyMessage.into());
        }
        self.session.store.replace(updated).await?;
        Ok(())
    }

    pub async fn remove(&self, note: &Note) -> Result<(), ClientError> {
        let id = note.id.clone().ok_or(ClientError::MissingId)?;
        self.session.store.remove(&[id]).await?;
        Ok(())
    }
}

impl Session {
    /// Access message operations.
    pub fn messages(&self) -> Messages<'_> {
        Messages::new(self)
    }
}

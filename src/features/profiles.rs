//! Profile names and pictures.
//!
//! A profile is a plain object in its owner's context. Saving edits the
//! owner's current profile of that kind in place, or posts the first one.

use bytes::Bytes;
use chatcore::aggregate;
use chatcore::outgoing;
use chatcore::types::{ImageAttachment, Profile, RawObject};
use log::{debug, warn};

use crate::collection::View;
use crate::content::ContentHandle;
use crate::session::{ClientError, Session};

pub struct Profiles<'a> {
    session: &'a Session,
}

impl<'a> Profiles<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// The actor's current display name, if they set one.
    pub async fn name(&self, actor: &str) -> Result<View<Option<String>>, ClientError> {
        let collection = self.session.subscribe(&[actor.to_string()]).await?;
        Ok(collection.view(|objects| aggregate::profile_name(objects).and_then(|p| p.name)))
    }

    /// The actor's current profile picture, if they set one.
    pub async fn picture(
        &self,
        actor: &str,
    ) -> Result<View<Option<ImageAttachment>>, ClientError> {
        let collection = self.session.subscribe(&[actor.to_string()]).await?;
        Ok(collection.view(aggregate::profile_icon))
    }

    /// Downloads the actor's current picture through the content cache.
    /// A picture that cannot be fetched is treated as no picture.
    pub async fn picture_content(&self, actor: &str) -> Result<Option<ContentHandle>, ClientError> {
        let Some(icon) = self.picture(actor).await?.get() else {
            return Ok(None);
        };
        match self.session.content.get_or_fetch(&icon.magnet).await {
            Ok(handle) => Ok(Some(handle)),
            Err(e) => {
                warn!(target: "Profiles", "Picture of {actor} unavailable: {e}");
                Ok(None)
            }
        }
    }

    pub async fn save_name(&self, name: &str) -> Result<(), ClientError> {
        let me = self.session.me();
        let draft = outgoing::profile_name(me, name)?;
        let current = self.current(aggregate::profile_name).await?;
        self.save(current, draft, "name", name.into()).await
    }

    /// Uploads `image` and makes it the viewer's picture.
    pub async fn save_picture(&self, image: Bytes) -> Result<ImageAttachment, ClientError> {
        let icon = self.session.upload_image(image).await?;
        let draft = outgoing::profile_picture(self.session.me(), &icon);
        let current = self.current(aggregate::profile_picture).await?;
        self.save(current, draft, "icon", icon.to_value()).await?;
        Ok(icon)
    }

    /// The viewer's own current profile of one kind.
    async fn current(
        &self,
        reduce: fn(&[RawObject]) -> Option<Profile>,
    ) -> Result<Option<Profile>, ClientError> {
        let me = self.session.me();
        let collection = self.session.subscribe(&[me.to_string()]).await?;
        Ok(reduce(&collection.snapshot()).filter(|p| p.actor.as_deref() == Some(me)))
    }

    async fn save(
        &self,
        current: Option<Profile>,
        draft: RawObject,
        field: &str,
        value: serde_json::Value,
    ) -> Result<(), ClientError> {
        match current {
            Some(profile) if profile.id.is_some() => {
                let mut updated = profile.raw;
                updated.set(field, value);
                self.session.store.replace(updated).await?;
                debug!(target: "Profiles", "Updated profile {field}");
            }
            _ => {
                self.session.store.post(draft).await?;
                debug!(target: "Profiles", "Created profile with {field}");
            }
        }
        Ok(())
    }
}

impl Session {
    /// Access profile operations.
    pub fn profiles(&self) -> Profiles<'_> {
        Profiles::new(self)
    }
}

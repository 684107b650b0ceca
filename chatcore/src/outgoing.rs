//! Builders for objects this client posts.
//!
//! The store stamps `id`, `actor` and `published` on acceptance, so drafts
//! carry only the type, the payload and the `context` that scopes who sees
//! them.

use serde_json::json;

use crate::error::DraftError;
use crate::filter::FeedScope;
use crate::types::object::{KIND_LIKE, KIND_NOTE, KIND_PROFILE, KIND_READ};
use crate::types::{ImageAttachment, RawObject};

/// A message the user is composing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageDraft {
    pub content: String,
    pub location: Option<String>,
    pub image: Option<ImageAttachment>,
}

impl MessageDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Empty locations are dropped.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        self.location = (!location.is_empty()).then_some(location);
        self
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    fn has_body(&self) -> bool {
        !self.content.is_empty() || self.location.is_some() || self.image.is_some()
    }

    fn to_object(&self) -> RawObject {
        let mut object = RawObject::new()
            .with("type", KIND_NOTE)
            .with("content", self.content.clone());
        if let Some(location) = &self.location {
            object.set("location", location.clone());
        }
        if let Some(image) = &self.image {
            object.set("attachment", image.to_value());
        }
        object
    }
}

/// A feed message. Private messages go to the partner via `bto` and are
/// filed under both participants' contexts.
pub fn note(draft: &MessageDraft, scope: &FeedScope) -> Result<RawObject, DraftError> {
    if !draft.has_body() {
        return Err(DraftError::EmptyMessage);
    }
    let mut object = draft.to_object();
    match scope {
        FeedScope::Channel(channel) => {
            object.set("context", json!([channel]));
        }
        FeedScope::Private { viewer, partner } => {
            object.set("bto", json!([partner]));
            object.set("context", json!([viewer, partner]));
        }
    }
    Ok(object)
}

/// A reply, filed under the parent message's context.
pub fn reply(draft: &MessageDraft, parent: &str) -> Result<RawObject, DraftError> {
    if draft.content.is_empty() {
        return Err(DraftError::EmptyReply);
    }
    Ok(draft
        .to_object()
        .with("inReplyTo", parent)
        .with("context", json!([parent])))
}

pub fn like(target: &str) -> RawObject {
    RawObject::new()
        .with("type", KIND_LIKE)
        .with("object", target)
        .with("context", json!([target]))
}

pub fn read(target: &str) -> RawObject {
    RawObject::new()
        .with("type", KIND_READ)
        .with("object", target)
        .with("context", json!([target]))
}

/// A new profile carrying a display name, filed under the owner's context.
pub fn profile_name(owner: &str, name: &str) -> Result<RawObject, DraftError> {
    if name.is_empty() {
        return Err(DraftError::EmptyProfileName);
    }
    Ok(RawObject::new()
        .with("type", KIND_PROFILE)
        .with("name", name)
        .with("context", json!([owner])))
}

pub fn profile_picture(owner: &str, icon: &ImageAttachment) -> RawObject {
    RawObject::new()
        .with("type", KIND_PROFILE)
        .with("icon", icon.to_value())
        .with("context", json!([owner]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FeedFilter;
    use crate::types::Note;

    #[test]
    fn test_channel_note_lands_in_channel() {
        let scope = FeedScope::channel("general");
        let object = note(&MessageDraft::text("hello"), &scope).unwrap();
        assert!(object.has_context("general"));
        assert!(object.get("bto").is_none());
        assert!(object.get("location").is_none());
    }

    #[test]
    fn test_private_note_is_visible_to_both_participants() {
        let scope = FeedScope::private("me", "bob");
        let mut object = note(&MessageDraft::text("psst"), &scope).unwrap();
        assert!(object.has_context("me") && object.has_context("bob"));

        // Once stamped by the store it passes both participants' private feeds.
        object.set("actor", "me");
        let sent = Note::from_raw(&object).unwrap();
        assert!(FeedFilter::new(scope).accepts(&sent));
        assert!(FeedFilter::new(FeedScope::private("bob", "me")).accepts(&sent));
    }

    #[test]
    fn test_empty_message_is_rejected() {
        let scope = FeedScope::channel("general");
        assert_eq!(
            note(&MessageDraft::text("").with_location(""), &scope),
            Err(DraftError::EmptyMessage)
        );
        let image_only = MessageDraft::text("").with_image(ImageAttachment::new("m"));
        assert!(note(&image_only, &scope).is_ok());
    }

    #[test]
    fn test_reply_links_parent() {
        let object = reply(&MessageDraft::text("agreed"), "parent-1").unwrap();
        assert_eq!(object.str_field("inReplyTo"), Some("parent-1"));
        assert!(object.has_context("parent-1"));
        assert_eq!(
            reply(&MessageDraft::text(""), "parent-1"),
            Err(DraftError::EmptyReply)
        );
    }

    #[test]
    fn test_profile_drafts() {
        assert_eq!(profile_name("me", ""), Err(DraftError::EmptyProfileName));
        let named = profile_name("me", "Ada").unwrap();
        assert_eq!(named.str_field("name"), Some("Ada"));
        assert!(named.has_context("me"));

        let pictured = profile_picture("me", &ImageAttachment::new("pic"));
        let icon = pictured.get("icon").and_then(ImageAttachment::from_value);
        assert_eq!(icon, Some(ImageAttachment::new("pic")));
    }
}

//! Typed views over [`RawObject`]s.
//!
//! Each `from_raw` constructor checks only the shape needed to build the type.
//! Policy (private scopes, non-empty content, target ids) lives in the filters.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use super::object::{
    ActorId, KIND_IMAGE, KIND_LIKE, KIND_NOTE, KIND_PROFILE, KIND_READ, ObjectId, Published,
    RawObject,
};

/// `{ type: "Image", magnet }`. The magnet is a content address, not a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageAttachment {
    pub magnet: String,
}

impl ImageAttachment {
    pub fn new(magnet: impl Into<String>) -> Self {
        Self {
            magnet: magnet.into(),
        }
    }

    /// Accepts only objects with `type == "Image"` and a non-empty string magnet.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.get("type").and_then(Value::as_str) != Some(KIND_IMAGE) {
            return None;
        }
        match map.get("magnet").and_then(Value::as_str) {
            Some(magnet) if !magnet.is_empty() => Some(Self::new(magnet)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "type": KIND_IMAGE, "magnet": self.magnet })
    }
}

/// A message.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: Option<ObjectId>,
    pub actor: Option<ActorId>,
    pub content: String,
    pub location: Option<String>,
    /// Set only when the attachment is a well-formed image.
    pub image: Option<ImageAttachment>,
    pub bto: Option<Vec<ActorId>>,
    pub in_reply_to: Option<ObjectId>,
    pub published: Option<DateTime<Utc>>,
    pub raw: RawObject,
}

impl Note {
    /// Requires `type == "Note"` and a string `content`.
    pub fn from_raw(raw: &RawObject) -> Option<Self> {
        if !raw.is_kind(KIND_NOTE) {
            return None;
        }
        let content = raw.str_field("content")?.to_string();

        let bto = raw.get("bto").and_then(Value::as_array).and_then(|entries| {
            entries
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        });

        Some(Self {
            id: raw.id().map(str::to_string),
            actor: raw.actor().map(str::to_string),
            content,
            location: raw
                .str_field("location")
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            image: raw.get("attachment").and_then(ImageAttachment::from_value),
            bto,
            in_reply_to: raw
                .str_field("inReplyTo")
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            published: raw.published(),
            raw: raw.clone(),
        })
    }

    /// `content || location || attachment`, with truthy presence semantics.
    pub fn has_body(&self) -> bool {
        self.raw.is_present("content")
            || self.raw.is_present("location")
            || self.raw.is_present("attachment")
    }

    /// The single recipient of a private message.
    pub fn private_recipient(&self) -> Option<&str> {
        match self.bto.as_deref() {
            Some([recipient]) => Some(recipient.as_str()),
            _ => None,
        }
    }
}

impl Published for Note {
    fn published(&self) -> Option<DateTime<Utc>> {
        self.published
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: Option<ObjectId>,
    pub actor: Option<ActorId>,
    /// Non-empty when set.
    pub name: Option<String>,
    pub icon: Option<ImageAttachment>,
    pub published: Option<DateTime<Utc>>,
    pub raw: RawObject,
}

impl Profile {
    pub fn from_raw(raw: &RawObject) -> Option<Self> {
        if !raw.is_kind(KIND_PROFILE) {
            return None;
        }
        Some(Self {
            id: raw.id().map(str::to_string),
            actor: raw.actor().map(str::to_string),
            name: raw
                .str_field("name")
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            icon: raw.get("icon").and_then(ImageAttachment::from_value),
            published: raw.published(),
            raw: raw.clone(),
        })
    }
}

impl Published for Profile {
    fn published(&self) -> Option<DateTime<Utc>> {
        self.published
    }
}

// Like and Read share one shape: an actor pointing at a target object.
macro_rules! define_marker {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            pub id: Option<ObjectId>,
            pub actor: Option<ActorId>,
            pub object: ObjectId,
            pub published: Option<DateTime<Utc>>,
            pub raw: RawObject,
        }

        impl $name {
            pub fn from_raw(raw: &RawObject) -> Option<Self> {
                if !raw.is_kind($kind) {
                    return None;
                }
                Some(Self {
                    id: raw.id().map(str::to_string),
                    actor: raw.actor().map(str::to_string),
                    object: raw.str_field("object")?.to_string(),
                    published: raw.published(),
                    raw: raw.clone(),
                })
            }

            pub fn is_by(&self, actor: &str) -> bool {
                self.actor.as_deref() == Some(actor)
            }
        }

        impl Published for $name {
            fn published(&self) -> Option<DateTime<Utc>> {
                self.published
            }
        }
    };
}

define_marker!(
    /// A like on a message.
    Like,
    KIND_LIKE
);
define_marker!(
    /// A read receipt for a message.
    Read,
    KIND_READ
);

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(value: Value) -> RawObject {
        RawObject::from_value(value).expect("object")
    }

    #[test]
    fn test_note_requires_string_content() {
        assert!(Note::from_raw(&raw(json!({"type": "Note", "content": "hi"}))).is_some());
        assert!(Note::from_raw(&raw(json!({"type": "Note", "content": 3}))).is_none());
        assert!(Note::from_raw(&raw(json!({"type": "Note"}))).is_none());
        assert!(Note::from_raw(&raw(json!({"type": "Like", "content": "hi"}))).is_none());
    }

    #[test]
    fn test_note_body_presence() {
        let empty = Note::from_raw(&raw(json!({"type": "Note", "content": ""}))).unwrap();
        assert!(!empty.has_body());

        let located = Note::from_raw(&raw(
            json!({"type": "Note", "content": "", "location": "stata"}),
        ))
        .unwrap();
        assert!(located.has_body());
        assert_eq!(located.location.as_deref(), Some("stata"));

        // A malformed attachment still counts as present, but exposes no image.
        let odd = Note::from_raw(&raw(
            json!({"type": "Note", "content": "", "attachment": {"type": "Video"}}),
        ))
        .unwrap();
        assert!(odd.has_body());
        assert!(odd.image.is_none());
    }

    #[test]
    fn test_private_recipient() {
        let one = Note::from_raw(&raw(
            json!({"type": "Note", "content": "x", "bto": ["bob"]}),
        ))
        .unwrap();
        assert_eq!(one.private_recipient(), Some("bob"));

        let two = Note::from_raw(&raw(
            json!({"type": "Note", "content": "x", "bto": ["bob", "carol"]}),
        ))
        .unwrap();
        assert_eq!(two.private_recipient(), None);

        let mixed = Note::from_raw(&raw(
            json!({"type": "Note", "content": "x", "bto": ["bob", 7]}),
        ))
        .unwrap();
        assert!(mixed.bto.is_none());
    }

    #[test]
    fn test_image_attachment_shape() {
        assert!(ImageAttachment::from_value(&json!({"type": "Image", "magnet": "m1"})).is_some());
        assert!(ImageAttachment::from_value(&json!({"type": "Image", "magnet": ""})).is_none());
        assert!(ImageAttachment::from_value(&json!({"type": "Image", "magnet": 1})).is_none());
        assert!(ImageAttachment::from_value(&json!({"magnet": "m1"})).is_none());
    }

    #[test]
    fn test_markers_require_string_object() {
        let like = Like::from_raw(&raw(json!({"type": "Like", "object": "m1", "actor": "a"})));
        assert!(like.is_some_and(|l| l.is_by("a")));
        assert!(Like::from_raw(&raw(json!({"type": "Like", "object": 1}))).is_none());
        assert!(Read::from_raw(&raw(json!({"type": "Like", "object": "m1"}))).is_none());
    }
}

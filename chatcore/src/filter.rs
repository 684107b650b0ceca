//! View filters: project a heterogeneous object collection into typed views.
//!
//! Every filter is pure and order-preserving with respect to its input (the
//! feed additionally sorts). Objects that do not match the expected shape are
//! skipped, never reported: the store is untrusted and partial records must
//! not break a view.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::types::{ActorId, ImageAttachment, Like, Note, Profile, RawObject, Read};

/// Number of messages kept in the feed.
pub const DEFAULT_FEED_LIMIT: usize = 10;

/// Which conversation a feed shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedScope {
    /// A public channel.
    Channel(String),
    /// A one-to-one private conversation between the viewer and a partner.
    Private { viewer: ActorId, partner: ActorId },
}

impl FeedScope {
    pub fn channel(name: impl Into<String>) -> Self {
        FeedScope::Channel(name.into())
    }

    pub fn private(viewer: impl Into<ActorId>, partner: impl Into<ActorId>) -> Self {
        FeedScope::Private {
            viewer: viewer.into(),
            partner: partner.into(),
        }
    }

    /// Contexts to subscribe to. Private messages are addressed to the
    /// viewer's own context.
    pub fn contexts(&self) -> Vec<String> {
        match self {
            FeedScope::Channel(name) => vec![name.clone()],
            FeedScope::Private { viewer, .. } => vec![viewer.clone()],
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, FeedScope::Private { .. })
    }
}

/// The message feed: newest first, capped at `limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFilter {
    pub scope: FeedScope,
    pub limit: usize,
    /// When set, `content` must be a non-empty string even if the message
    /// carries a location or an attachment.
    pub require_content: bool,
}

impl FeedFilter {
    pub fn new(scope: FeedScope) -> Self {
        Self {
            scope,
            limit: DEFAULT_FEED_LIMIT,
            require_content: false,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_require_content(mut self, require_content: bool) -> Self {
        self.require_content = require_content;
        self
    }

    /// The per-message predicate, without ordering or truncation.
    pub fn accepts(&self, note: &Note) -> bool {
        if !note.has_body() {
            return false;
        }
        if self.require_content && note.content.is_empty() {
            return false;
        }
        match &self.scope {
            FeedScope::Channel(_) => true,
            FeedScope::Private { viewer, partner } => {
                let Some(recipient) = note.private_recipient() else {
                    return false;
                };
                let actor = note.actor.as_deref();
                (actor == Some(viewer.as_str()) && recipient == partner)
                    || (actor == Some(partner.as_str()) && recipient == viewer)
            }
        }
    }

    pub fn apply(&self, objects: &[RawObject]) -> Vec<Note> {
        let mut notes: Vec<Note> = objects
            .iter()
            .filter_map(Note::from_raw)
            .filter(|note| self.accepts(note))
            .collect();

        // Stable: equal timestamps keep arrival order.
        notes.sort_by(|a, b| newest_first(a.published, b.published));
        notes.truncate(self.limit);
        notes
    }
}

/// Descending by timestamp; undated entries go last.
fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Distinct non-empty locations mentioned in a feed, in feed order.
pub fn feed_locations(feed: &[Note]) -> Vec<String> {
    let mut seen = HashSet::new();
    feed.iter()
        .filter_map(|note| note.location.as_deref())
        .filter(|location| seen.insert(*location))
        .map(str::to_string)
        .collect()
}

/// Distinct image attachments of a feed, in feed order.
pub fn feed_images(feed: &[Note]) -> Vec<ImageAttachment> {
    let mut seen = HashSet::new();
    feed.iter()
        .filter_map(|note| note.image.as_ref())
        .filter(|image| seen.insert(image.magnet.as_str()))
        .cloned()
        .collect()
}

/// Replies in a thread: notes with non-empty content and a truthy
/// `inReplyTo` of any shape. Arrival order is kept.
pub fn replies(objects: &[RawObject]) -> Vec<Note> {
    objects
        .iter()
        .filter_map(Note::from_raw)
        .filter(|note| !note.content.is_empty() && note.raw.is_present("inReplyTo"))
        .collect()
}

/// Profiles that carry a display name.
pub fn profile_names(objects: &[RawObject]) -> Vec<Profile> {
    objects
        .iter()
        .filter_map(Profile::from_raw)
        .filter(|profile| profile.name.is_some())
        .collect()
}

/// Profiles that carry an image icon.
pub fn profile_pictures(objects: &[RawObject]) -> Vec<Profile> {
    objects
        .iter()
        .filter_map(Profile::from_raw)
        .filter(|profile| profile.icon.is_some())
        .collect()
}

pub fn likes_of(objects: &[RawObject], target: &str) -> Vec<Like> {
    objects
        .iter()
        .filter_map(Like::from_raw)
        .filter(|like| like.object == target)
        .collect()
}

pub fn reads_of(objects: &[RawObject], target: &str) -> Vec<Read> {
    objects
        .iter()
        .filter_map(Read::from_raw)
        .filter(|read| read.object == target)
        .collect()
}

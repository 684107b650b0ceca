//! Reductions over filtered views: most-recent-wins, distinct counts, and
//! the plans behind "toggle like" and "mark as read".

use std::collections::BTreeSet;
use std::collections::HashSet;

use crate::outgoing;
use crate::types::{ActorId, ImageAttachment, Like, ObjectId, Profile, Published, RawObject, Read};

/// The entry with the greatest `published`.
///
/// Comparison is strict, so among equal timestamps the first one encountered
/// wins. An undated winner is displaced by any dated entry; an undated
/// candidate never displaces anything.
pub fn most_recent<T, I>(items: I) -> Option<T>
where
    T: Published,
    I: IntoIterator<Item = T>,
{
    items.into_iter().fold(None, |best, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            let newer = match (candidate.published(), current.published()) {
                (Some(c), Some(p)) => c > p,
                (Some(_), None) => true,
                (None, _) => false,
            };
            Some(if newer { candidate } else { current })
        }
    })
}

/// Current display name of an actor, from their profile objects.
pub fn profile_name(objects: &[RawObject]) -> Option<Profile> {
    most_recent(crate::filter::profile_names(objects))
}

/// Current profile picture of an actor, from their profile objects.
pub fn profile_picture(objects: &[RawObject]) -> Option<Profile> {
    most_recent(crate::filter::profile_pictures(objects))
}

/// The icon of the current picture profile.
pub fn profile_icon(objects: &[RawObject]) -> Option<ImageAttachment> {
    profile_picture(objects).and_then(|p| p.icon)
}

/// Number of distinct actors who liked the target.
pub fn like_count(likes: &[Like]) -> usize {
    likes
        .iter()
        .filter_map(|like| like.actor.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

pub fn my_likes<'a>(likes: &'a [Like], viewer: &str) -> Vec<&'a Like> {
    likes.iter().filter(|like| like.is_by(viewer)).collect()
}

/// What toggling a like should do.
#[derive(Debug, Clone, PartialEq)]
pub enum LikeToggle {
    /// Remove every like the viewer has on the target. More than one can
    /// exist, since nothing prevents duplicate likes at write time.
    Unlike(Vec<ObjectId>),
    /// Post a single new like.
    Like(RawObject),
}

pub fn plan_like_toggle(likes: &[Like], viewer: &str, target: &str) -> LikeToggle {
    let mine = my_likes(likes, viewer);
    if mine.is_empty() {
        LikeToggle::Like(outgoing::like(target))
    } else {
        LikeToggle::Unlike(mine.into_iter().filter_map(|l| l.id.clone()).collect())
    }
}

/// Distinct readers of the target, sorted.
pub fn read_receipts(reads: &[Read]) -> Vec<ActorId> {
    reads
        .iter()
        .filter_map(|read| read.actor.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn has_read(reads: &[Read], viewer: &str) -> bool {
    reads.iter().any(|read| read.is_by(viewer))
}

/// A read receipt to post, unless the viewer already has a visible one.
pub fn plan_read_receipt(reads: &[Read], viewer: &str, target: &str) -> Option<RawObject> {
    (!has_read(reads, viewer)).then(|| outgoing::read(target))
}

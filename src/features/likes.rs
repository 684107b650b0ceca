use chatcore::aggregate::{self, LikeToggle};
use chatcore::filter;
use log::debug;

use crate::collection::View;
use crate::session::{ClientError, Session};

/// Likes on one message, as seen by the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeSummary {
    /// Distinct actors who liked the message.
    pub count: usize,
    pub liked_by_me: bool,
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleResult {
    Liked,
    /// Number of the viewer's likes that were removed.
    Unliked(usize),
}

pub struct Likes<'a> {
    session: &'a Session,
}

impl<'a> Likes<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn view(&self, message_id: &str) -> Result<View<LikeSummary>, ClientError> {
        let collection = self.session.subscribe(&[message_id.to_string()]).await?;
        let target = message_id.to_string();
        let viewer = self.session.me().to_string();
        Ok(collection.view(move |objects| {
            let likes = filter::likes_of(objects, &target);
            LikeSummary {
                count: aggregate::like_count(&likes),
                liked_by_me: !aggregate::my_likes(&likes, &viewer).is_empty(),
            }
        }))
    }

    /// Removes every like the viewer has on the message, or adds one if
    /// there are none.
    pub async fn toggle(&self, message_id: &str) -> Result<ToggleResult, ClientError> {
        let collection = self.session.subscribe(&[message_id.to_string()]).await?;
        let likes = filter::likes_of(&collection.snapshot(), message_id);

        match aggregate::plan_like_toggle(&likes, self.session.me(), message_id) {
            LikeToggle::Like(object) => {
                self.session.store.post(object).await?;
                debug!(target: "Likes", "Liked {message_id}");
                Ok(ToggleResult::Liked)
            }
            LikeToggle::Unlike(ids) => {
                self.session.store.remove(&ids).await?;
                debug!(target: "Likes", "Removed {} like(s) from {message_id}", ids.len());
                Ok(ToggleResult::Unliked(ids.len()))
            }
        }
    }
}

impl Session {
    /// Access like operations.
    pub fn likes(&self) -> Likes<'_> {
        Likes::new(self)
    }
}

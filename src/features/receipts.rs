//! Read receipts.
//!
//! Mounting a message for display marks it read once: a receipt is posted
//! only when none of the viewer's receipts is already visible, so remounting
//! never writes a duplicate.

use chatcore::aggregate;
use chatcore::filter;
use chatcore::types::ActorId;
use futures_util::future::join_all;
use log::debug;

use crate::collection::{ObjectCollection, View};
use crate::session::{ClientError, Session};

pub struct ReadReceipts<'a> {
    session: &'a Session,
}

impl<'a> ReadReceipts<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Marks the message read if needed and returns the live list of its
    /// readers (distinct actor ids, sorted).
    pub async fn mount(&self, message_id: &str) -> Result<View<Vec<ActorId>>, ClientError> {
        let collection = self.session.subscribe(&[message_id.to_string()]).await?;
        self.mark_read_in(&collection, message_id).await?;

        let target = message_id.to_string();
        Ok(collection.view(move |objects| {
            aggregate::read_receipts(&filter::reads_of(objects, &target))
        }))
    }

    /// Posts a read receipt unless the viewer already has one. Returns
    /// whether a receipt was posted.
    pub async fn mark_read(&self, message_id: &str) -> Result<bool, ClientError> {
        let collection = self.session.subscribe(&[message_id.to_string()]).await?;
        self.mark_read_in(&collection, message_id).await
    }

    async fn mark_read_in(
        &self,
        collection: &ObjectCollection,
        message_id: &str,
    ) -> Result<bool, ClientError> {
        let reads = filter::reads_of(&collection.snapshot(), message_id);
        let Some(receipt) = aggregate::plan_read_receipt(&reads, self.session.me(), message_id)
        else {
            return Ok(false);
        };
        self.session.store.post(receipt).await?;
        debug!(target: "Receipts", "Marked {message_id} read");
        Ok(true)
    }

    /// Display names of `readers`, waiting for any pending lookups.
    pub async fn reader_names(&self, readers: &[ActorId]) -> Vec<String> {
        let resolver = &self.session.resolver;
        join_all(readers.iter().map(|actor| resolver.resolve_now(actor))).await
    }
}

impl Session {
    /// Access read receipt operations.
    pub fn receipts(&self) -> ReadReceipts<'_> {
        ReadReceipts::new(self)
    }
}

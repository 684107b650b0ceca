//! Runtime-independent core of the chat client: the object model, view
//! filters, aggregations and outgoing-object builders. Nothing here performs
//! I/O; the root crate drives these functions from live collections.

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod outgoing;
pub mod types;

pub use error::DraftError;
pub use filter::{FeedFilter, FeedScope};
pub use outgoing::MessageDraft;

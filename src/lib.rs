// Re-export the runtime-free core
pub use chatcore::{aggregate, filter, outgoing};
pub use chatcore::{DraftError, FeedFilter, FeedScope, MessageDraft};

// Core types are re-exported, but events (with EventBus) remain here since they carry runtime handles
pub mod types {
    pub use chatcore::types::*;
    pub mod events;
}

pub mod collection;
pub mod config;
pub mod content;
pub mod features;
pub mod resolver;
pub mod session;
pub mod store;

pub use config::SessionConfig;
pub use session::{ClientError, Session, SessionBuilder};

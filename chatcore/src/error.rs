use thiserror::Error;

/// Rejected outgoing objects. These never leave the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("message has no content, location or attachment")]
    EmptyMessage,

    #[error("reply content cannot be empty")]
    EmptyReply,

    #[error("profile name cannot be empty")]
    EmptyProfileName,
}

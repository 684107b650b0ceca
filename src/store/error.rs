use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object has no id")]
    MissingId,

    #[error("only the original actor may modify {0}")]
    NotOwner(String),

    #[error("content not found: {0}")]
    ContentNotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

//! Content storage errors

use thiserror::Error;

use crate::hash::ContentHash;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("no content stored for hash {0}")]
    MissingContent(ContentHash),

    #[error("invalid content hash {0:?}")]
    InvalidHash(String),

    #[error("content storage i/o failed")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ContentError>;

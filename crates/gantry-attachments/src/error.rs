//! Attachment error types

use thiserror::Error;

/// Attachment errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    /// A value resolved at runtime did not match the type of the key it was
    /// declared against. Raised on the erased attach path, where values
    /// arrive as type-erased handles; the typed accessor path cannot produce
    /// this condition.
    #[error("value for attachment {key} is not of the expected type {expected}")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
    },
}

/// Result type for attachment operations
pub type Result<T> = std::result::Result<T, AttachmentError>;

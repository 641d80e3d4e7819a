//! Error types for editing operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Anchor not found: {0}")]
    AnchorNotFound(String),

    #[error("Anchor is ambiguous: {0}")]
    AmbiguousAnchor(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Integrity violation after mutation: {0}")]
    IntegrityViolation(String),

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Document is sealed by a signature")]
    DocumentSealed,

    #[error("Editing is restricted: {0}")]
    EditingRestricted(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Document model error: {0}")]
    DocModel(doc_model::DocModelError),
}

impl From<doc_model::DocModelError> for EditError {
    fn from(err: doc_model::DocModelError) -> Self {
        match err {
            doc_model::DocModelError::InvalidPassword => EditError::InvalidPassword,
            doc_model::DocModelError::DocumentSealed => EditError::DocumentSealed,
            doc_model::DocModelError::IndexOutOfRange { index, len } => {
                EditError::IndexOutOfRange { index, len }
            }
            other => EditError::DocModel(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EditError>;

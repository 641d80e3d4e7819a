//! Error types for document model operations

use crate::BlockId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocModelError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Index out of range: {index} (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Note not found: {kind} id {id}")]
    NoteNotFound { kind: crate::NoteKind, id: u32 },

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Document is sealed by a signature")]
    DocumentSealed,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, DocModelError>;

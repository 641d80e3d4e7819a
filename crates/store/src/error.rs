//! Error types for storage operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document model error: {0}")]
    DocModel(#[from] doc_model::DocModelError),

    #[error("Corrupt container: {0}")]
    CorruptContainer(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File is locked: {0}")]
    Locked(String),

    #[error("PDF conversion failed: {0}")]
    Conversion(String),

    #[error("Upload failed: {0}")]
    Upload(String),
}

impl From<zip::result::ZipError> for StoreError {
    fn from(err: zip::result::ZipError) -> Self {
        StoreError::CorruptContainer(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

//! Error types for the storage layer.

use thiserror::Error;

use crate::types::CollectionStatus;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record was not found.
    #[error("record not found")]
    NotFound,

    /// An insert collided with an existing primary key.
    #[error("record already exists")]
    AlreadyExists,

    /// A conditional write found the collection in another status.
    #[error("collection status is now {0:?}")]
    StatusChanged(CollectionStatus),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

//! Error types for the coordination service.
//!
//! This module defines all errors that can occur while managing profiles,
//! the roster, collections, messages and announcements.

use dairylink_core::{AnnouncementId, CollectionId, MessageId, ProfileId, Role};
use dairylink_store::CollectionStatus;
use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur in coordination operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The requested profile was not found.
    #[error("profile not found: {0}")]
    ProfileNotFound(ProfileId),

    /// The farmer is not on any roster.
    #[error("farmer not found: {0}")]
    FarmerNotFound(ProfileId),

    /// The requested collection was not found.
    #[error("collection not found: {0}")]
    CollectionNotFound(CollectionId),

    /// The requested message was not found.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// The requested announcement was not found.
    #[error("announcement not found: {0}")]
    AnnouncementNotFound(AnnouncementId),

    /// The operation is reserved for another role.
    #[error("profile {profile_id} must be a {required} for this operation")]
    WrongRole {
        /// The profile making the request.
        profile_id: ProfileId,
        /// The role the operation requires.
        required: Role,
    },

    /// The caller does not own the record.
    #[error("profile {profile_id} does not own {resource}")]
    NotOwner {
        /// The profile making the request.
        profile_id: ProfileId,
        /// The record being accessed.
        resource: String,
    },

    /// The requested status transition is not valid.
    #[error(
        "invalid state transition for collection {collection_id}: cannot transition from {from:?} to {to:?}"
    )]
    InvalidState {
        /// The collection being transitioned.
        collection_id: CollectionId,
        /// The current status.
        from: CollectionStatus,
        /// The requested target status.
        to: CollectionStatus,
    },

    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The write collides with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] dairylink_store::StoreError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::ProfileNotFound(_)
            | Self::FarmerNotFound(_)
            | Self::CollectionNotFound(_)
            | Self::MessageNotFound(_)
            | Self::AnnouncementNotFound(_) => 404,
            Self::WrongRole { .. } | Self::NotOwner { .. } => 403,
            Self::InvalidState { .. } | Self::Conflict(_) => 409,
            Self::Validation(_) => 400,
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Internal(_))
    }
}

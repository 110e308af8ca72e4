//! Core types and utilities for dairylink.
//!
//! This crate provides the foundational types used throughout the dairylink
//! milk-collection platform:
//!
//! - **Identifiers**: Strongly-typed IDs for profiles, collections, messages
//!   and announcements
//! - **Roles**: The farmer/agent split every profile carries
//! - **Error types**: Common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use dairylink_core::{CollectionId, ProfileId, Role};
//!
//! // Parse a profile ID taken from a token subject
//! let farmer: ProfileId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
//!
//! // Generate a collection ID
//! let collection_id = CollectionId::generate();
//!
//! // Parse a role name
//! let role: Role = "agent".parse().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod role;

pub use error::{CoreError, Result};
pub use ids::{AnnouncementId, CollectionId, IdError, MessageId, ProfileId};
pub use role::Role;

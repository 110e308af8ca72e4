//! `RocksDB` storage layer for dairylink.
//!
//! This crate provides persistent storage for profiles, the farmer roster,
//! collections, messages and announcements using `RocksDB` with column
//! families for indexing, plus the change feed every write publishes to.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `profiles` / `profiles_by_role`: profiles and a role index
//! - `farmers` / `farmers_by_agent`: roster rows and an owner index
//! - `collections` / `collections_by_farmer` / `collections_by_agent`
//! - `messages` / `messages_by_sender` / `messages_by_receiver` /
//!   `unread_by_receiver`
//! - `announcements` / `announcement_recipients`
//!
//! # Example
//!
//! ```no_run
//! use dairylink_store::{ChangeFilter, RocksStore, Store, Table};
//! use dairylink_core::ProfileId;
//!
//! let store = RocksStore::open("/tmp/dairylink-db").unwrap();
//!
//! // Watch collection changes
//! let subscription = store.changes().subscribe(ChangeFilter::tables([Table::Collections]));
//!
//! // List a farmer's collections
//! let farmer_id = ProfileId::generate();
//! let collections = store.list_collections_by_farmer(&farmer_id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod changes;
pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use changes::{ChangeEvent, ChangeFeed, ChangeFilter, ChangeKind, Notification, Subscription, Table};
pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{
    Announcement, AnnouncementRecipient, Collection, CollectionStatus, Farmer, Message,
    MessageType, Profile,
};

use chrono::{DateTime, Utc};
use dairylink_core::{AnnouncementId, CollectionId, MessageId, ProfileId, Role};

/// The storage trait defining all database operations.
///
/// Every mutating method publishes a [`ChangeEvent`] on [`Store::changes`]
/// after the write has been committed.
pub trait Store: Send + Sync {
    // =========================================================================
    // Change Notifications
    // =========================================================================

    /// The feed this store publishes row changes to.
    fn changes(&self) -> &ChangeFeed;

    // =========================================================================
    // Profile Operations
    // =========================================================================

    /// Insert or update a profile record.
    ///
    /// This also maintains the role index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_profile(&self, profile: &Profile) -> Result<()>;

    /// Get a profile by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_profile(&self, profile_id: &ProfileId) -> Result<Option<Profile>>;

    /// List all profiles with a given role.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_profiles_by_role(&self, role: Role) -> Result<Vec<Profile>>;

    // =========================================================================
    // Farmer Roster Operations
    // =========================================================================

    /// Insert a new roster row.
    ///
    /// The existence check and the write are atomic, so of several
    /// concurrent inserts for one farmer exactly one succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if a row with the same
    /// `farmer_id` exists.
    fn insert_farmer(&self, farmer: &Farmer) -> Result<()>;

    /// Insert or update a roster row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_farmer(&self, farmer: &Farmer) -> Result<()>;

    /// Get a roster row by farmer ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_farmer(&self, farmer_id: &ProfileId) -> Result<Option<Farmer>>;

    /// Delete a roster row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the row doesn't exist.
    fn delete_farmer(&self, farmer_id: &ProfileId) -> Result<()>;

    /// List the roster of an agent, ordered by full name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_farmers_by_agent(&self, agent_id: &ProfileId) -> Result<Vec<Farmer>>;

    /// Count the roster of an agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_farmers_by_agent(&self, agent_id: &ProfileId) -> Result<u32>;

    // =========================================================================
    // Collection Operations
    // =========================================================================

    /// Insert or update a collection record.
    ///
    /// This also maintains the farmer and agent indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_collection(&self, collection: &Collection) -> Result<()>;

    /// Replace a collection only if its stored status is still `from`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the collection doesn't exist and
    /// `StoreError::StatusChanged` with the stored status if another
    /// write moved it first.
    fn transition_collection(&self, collection: &Collection, from: CollectionStatus) -> Result<()>;

    /// Get a collection by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_collection(&self, collection_id: &CollectionId) -> Result<Option<Collection>>;

    /// List a farmer's collections, ordered by scheduled date and time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_collections_by_farmer(&self, farmer_id: &ProfileId) -> Result<Vec<Collection>>;

    /// List the collections an agent scheduled, ordered by scheduled date
    /// and time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_collections_by_agent(&self, agent_id: &ProfileId) -> Result<Vec<Collection>>;

    // =========================================================================
    // Message Operations
    // =========================================================================

    /// Insert or update a message record.
    ///
    /// This also maintains the sender, receiver and unread indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_message(&self, message: &Message) -> Result<()>;

    /// Set `read_at` on a message that has none.
    ///
    /// Returns the updated message, or `None` if it was already read, in
    /// which case the first timestamp is kept.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the message doesn't exist.
    fn mark_message_read(
        &self,
        message_id: &MessageId,
        read_at: DateTime<Utc>,
    ) -> Result<Option<Message>>;

    /// Get a message by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_message(&self, message_id: &MessageId) -> Result<Option<Message>>;

    /// List messages sent by a profile, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_messages_by_sender(&self, sender_id: &ProfileId) -> Result<Vec<Message>>;

    /// List messages addressed to a profile, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_messages_by_receiver(&self, receiver_id: &ProfileId) -> Result<Vec<Message>>;

    /// List unread messages addressed to a profile, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_unread_by_receiver(&self, receiver_id: &ProfileId) -> Result<Vec<Message>>;

    // =========================================================================
    // Announcement Operations
    // =========================================================================

    /// Insert or update an announcement.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_announcement(&self, announcement: &Announcement) -> Result<()>;

    /// Get an announcement by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_announcement(&self, announcement_id: &AnnouncementId) -> Result<Option<Announcement>>;

    /// List all announcements, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_announcements(&self) -> Result<Vec<Announcement>>;

    /// Insert or update a per-user read state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_announcement_recipient(&self, recipient: &AnnouncementRecipient) -> Result<()>;

    /// Record that a user read an announcement.
    ///
    /// Returns the stored read state. An earlier `read_at` is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn mark_announcement_read(
        &self,
        announcement_id: &AnnouncementId,
        user_id: &ProfileId,
        read_at: DateTime<Utc>,
    ) -> Result<AnnouncementRecipient>;

    /// Get a user's read state for an announcement.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_announcement_recipient(
        &self,
        announcement_id: &AnnouncementId,
        user_id: &ProfileId,
    ) -> Result<Option<AnnouncementRecipient>>;
}

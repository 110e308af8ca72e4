//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Profile records, keyed by `profile_id`.
    pub const PROFILES: &str = "profiles";

    /// Index: profiles by role, keyed by `role || profile_id`.
    pub const PROFILES_BY_ROLE: &str = "profiles_by_role";

    /// Farmer roster rows, keyed by `farmer_id`.
    pub const FARMERS: &str = "farmers";

    /// Index: roster rows by owning agent, keyed by `agent_id || farmer_id`.
    pub const FARMERS_BY_AGENT: &str = "farmers_by_agent";

    /// Collection records, keyed by `collection_id`.
    pub const COLLECTIONS: &str = "collections";

    /// Index: collections by farmer, keyed by `farmer_id || collection_id`.
    pub const COLLECTIONS_BY_FARMER: &str = "collections_by_farmer";

    /// Index: collections by agent, keyed by `agent_id || collection_id`.
    pub const COLLECTIONS_BY_AGENT: &str = "collections_by_agent";

    /// Message records, keyed by `message_id`.
    pub const MESSAGES: &str = "messages";

    /// Index: messages by sender, keyed by `sender_id || message_id`.
    pub const MESSAGES_BY_SENDER: &str = "messages_by_sender";

    /// Index: messages by receiver, keyed by `receiver_id || message_id`.
    pub const MESSAGES_BY_RECEIVER: &str = "messages_by_receiver";

    /// Index: unread messages by receiver, keyed by `receiver_id || message_id`.
    pub const UNREAD_BY_RECEIVER: &str = "unread_by_receiver";

    /// Announcement records, keyed by `announcement_id`.
    pub const ANNOUNCEMENTS: &str = "announcements";

    /// Read state, keyed by `announcement_id || user_id`.
    pub const ANNOUNCEMENT_RECIPIENTS: &str = "announcement_recipients";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::PROFILES,
        cf::PROFILES_BY_ROLE,
        cf::FARMERS,
        cf::FARMERS_BY_AGENT,
        cf::COLLECTIONS,
        cf::COLLECTIONS_BY_FARMER,
        cf::COLLECTIONS_BY_AGENT,
        cf::MESSAGES,
        cf::MESSAGES_BY_SENDER,
        cf::MESSAGES_BY_RECEIVER,
        cf::UNREAD_BY_RECEIVER,
        cf::ANNOUNCEMENTS,
        cf::ANNOUNCEMENT_RECIPIENTS,
    ]
}

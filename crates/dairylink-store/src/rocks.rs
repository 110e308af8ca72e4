//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dairylink_core::{AnnouncementId, CollectionId, MessageId, ProfileId, Role};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use crate::changes::{ChangeEvent, ChangeFeed, ChangeKind, Table};
use crate::error::{Result, StoreError};
use crate::keys::{self, ID_LEN};
use crate::schema::{all_column_families, cf};
use crate::types::{
    Announcement, AnnouncementRecipient, Collection, CollectionStatus, Farmer, Message, Profile,
};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    changes: ChangeFeed,
    /// Held across every read-modify-write so index maintenance and
    /// conditional updates see a stable row.
    writes: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_capacity(path, ChangeFeed::DEFAULT_CAPACITY)
    }

    /// Open or create a database whose change feed buffers `capacity`
    /// events per subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open_with_capacity<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            changes: ChangeFeed::new(capacity),
            writes: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read and decode a single record.
    fn get_record<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Collect the row IDs of every `owner || row` entry under `owner`.
    fn scan_index(&self, cf_name: &str, owner: &[u8; ID_LEN]) -> Result<Vec<[u8; ID_LEN]>> {
        let cf = self.cf(cf_name)?;
        let prefix = keys::owner_prefix(owner);

        let mut rows = Vec::new();
        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Stop if we're past the prefix
            if !key.starts_with(&prefix) {
                break;
            }

            if let Some(row) = keys::extract_row_id(&key) {
                rows.push(row);
            }
        }

        Ok(rows)
    }

    /// Decode every record in a column family.
    fn scan_all<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            records.push(Self::deserialize(&value)?);
        }

        Ok(records)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn messages_from_index(&self, cf_name: &str, owner: &ProfileId) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for row in self.scan_index(cf_name, owner.as_bytes())? {
            if let Some(message) = self.get_message(&MessageId::from_bytes(row))? {
                messages.push(message);
            }
        }
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    fn collections_from_index(&self, cf_name: &str, owner: &ProfileId) -> Result<Vec<Collection>> {
        let mut collections = Vec::new();
        for row in self.scan_index(cf_name, owner.as_bytes())? {
            if let Some(collection) = self.get_collection(&CollectionId::from_bytes(row))? {
                collections.push(collection);
            }
        }
        collections.sort_by_key(|c| (c.scheduled_at(), c.created_at));
        Ok(collections)
    }

    /// Write a roster row and move its owner index entry. Callers hold `writes`.
    fn write_farmer(&self, farmer: &Farmer) -> Result<()> {
        let cf_farmers = self.cf(cf::FARMERS)?;
        let cf_by_agent = self.cf(cf::FARMERS_BY_AGENT)?;

        let old = self.get_farmer(&farmer.farmer_id)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_farmers,
            keys::record_key(farmer.farmer_id.as_bytes()),
            Self::serialize(farmer)?,
        );

        // Move the row between rosters if ownership changed
        if let Some(old) = &old {
            if old.created_by != farmer.created_by {
                batch.delete_cf(
                    &cf_by_agent,
                    keys::pair_key(old.created_by.as_bytes(), old.farmer_id.as_bytes()),
                );
            }
        }
        batch.put_cf(
            &cf_by_agent,
            keys::pair_key(farmer.created_by.as_bytes(), farmer.farmer_id.as_bytes()),
            [],
        );

        self.write(batch)?;

        self.changes.publish(ChangeEvent::new(
            Table::Farmers,
            Self::kind_for(old.as_ref()),
            farmer.farmer_id,
            vec![farmer.farmer_id, farmer.created_by],
        ));
        Ok(())
    }

    /// Write a collection and its farmer and agent index entries. Callers hold `writes`.
    fn write_collection(&self, collection: &Collection) -> Result<()> {
        let cf_collections = self.cf(cf::COLLECTIONS)?;
        let cf_by_farmer = self.cf(cf::COLLECTIONS_BY_FARMER)?;
        let cf_by_agent = self.cf(cf::COLLECTIONS_BY_AGENT)?;

        let id = collection.collection_id.as_bytes();
        let old = self.get_collection(&collection.collection_id)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_collections, keys::record_key(id), Self::serialize(collection)?);

        if let Some(old) = &old {
            if old.farmer_id != collection.farmer_id {
                batch.delete_cf(&cf_by_farmer, keys::pair_key(old.farmer_id.as_bytes(), id));
            }
            if old.agent_id != collection.agent_id {
                batch.delete_cf(&cf_by_agent, keys::pair_key(old.agent_id.as_bytes(), id));
            }
        }
        batch.put_cf(
            &cf_by_farmer,
            keys::pair_key(collection.farmer_id.as_bytes(), id),
            [],
        );
        batch.put_cf(
            &cf_by_agent,
            keys::pair_key(collection.agent_id.as_bytes(), id),
            [],
        );

        self.write(batch)?;

        self.changes.publish(ChangeEvent::new(
            Table::Collections,
            Self::kind_for(old.as_ref()),
            collection.collection_id,
            vec![collection.farmer_id, collection.agent_id],
        ));
        Ok(())
    }

    /// Write a message and its sender, receiver and unread index entries. Callers hold `writes`.
    fn write_message(&self, message: &Message) -> Result<()> {
        let cf_messages = self.cf(cf::MESSAGES)?;
        let cf_by_sender = self.cf(cf::MESSAGES_BY_SENDER)?;
        let cf_by_receiver = self.cf(cf::MESSAGES_BY_RECEIVER)?;
        let cf_unread = self.cf(cf::UNREAD_BY_RECEIVER)?;

        let id = message.message_id.as_bytes();
        let old = self.get_message(&message.message_id)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_messages, keys::record_key(id), Self::serialize(message)?);
        batch.put_cf(
            &cf_by_sender,
            keys::pair_key(message.sender_id.as_bytes(), id),
            [],
        );
        batch.put_cf(
            &cf_by_receiver,
            keys::pair_key(message.receiver_id.as_bytes(), id),
            [],
        );

        let unread_key = keys::pair_key(message.receiver_id.as_bytes(), id);
        if message.read_at.is_none() {
            batch.put_cf(&cf_unread, unread_key, []);
        } else {
            batch.delete_cf(&cf_unread, unread_key);
        }

        self.write(batch)?;

        self.changes.publish(ChangeEvent::new(
            Table::Messages,
            Self::kind_for(old.as_ref()),
            message.message_id,
            vec![message.sender_id, message.receiver_id],
        ));
        Ok(())
    }

    /// Write a read state. Callers hold `writes`.
    fn write_announcement_recipient(&self, recipient: &AnnouncementRecipient) -> Result<()> {
        let cf = self.cf(cf::ANNOUNCEMENT_RECIPIENTS)?;
        let old = self.get_announcement_recipient(&recipient.announcement_id, &recipient.user_id)?;

        self.db
            .put_cf(
                &cf,
                keys::pair_key(
                    recipient.announcement_id.as_bytes(),
                    recipient.user_id.as_bytes(),
                ),
                Self::serialize(recipient)?,
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        self.changes.publish(ChangeEvent::new(
            Table::AnnouncementRecipients,
            Self::kind_for(old.as_ref()),
            recipient.announcement_id,
            vec![recipient.user_id],
        ));
        Ok(())
    }

    const fn kind_for<T>(existing: Option<&T>) -> ChangeKind {
        if existing.is_some() {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        }
    }
}

impl Store for RocksStore {
    fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    // =========================================================================
    // Profile Operations
    // =========================================================================

    fn put_profile(&self, profile: &Profile) -> Result<()> {
        let _guard = self.writes.lock();
        let cf_profiles = self.cf(cf::PROFILES)?;
        let cf_by_role = self.cf(cf::PROFILES_BY_ROLE)?;

        let old = self.get_profile(&profile.profile_id)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_profiles,
            keys::record_key(profile.profile_id.as_bytes()),
            Self::serialize(profile)?,
        );

        // Update role index if role changed
        if let Some(old) = &old {
            if old.role != profile.role {
                batch.delete_cf(
                    &cf_by_role,
                    keys::role_profile_key(old.role, &old.profile_id),
                );
            }
        }
        batch.put_cf(
            &cf_by_role,
            keys::role_profile_key(profile.role, &profile.profile_id),
            [],
        );

        self.write(batch)?;

        self.changes.publish(ChangeEvent::new(
            Table::Profiles,
            Self::kind_for(old.as_ref()),
            profile.profile_id,
            vec![profile.profile_id],
        ));
        Ok(())
    }

    fn get_profile(&self, profile_id: &ProfileId) -> Result<Option<Profile>> {
        self.get_record(cf::PROFILES, &keys::record_key(profile_id.as_bytes()))
    }

    fn list_profiles_by_role(&self, role: Role) -> Result<Vec<Profile>> {
        let cf_by_role = self.cf(cf::PROFILES_BY_ROLE)?;
        let prefix = keys::role_prefix(role);

        let mut profiles = Vec::new();
        let iter = self.db.iterator_cf(
            &cf_by_role,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let Some(profile_id) = keys::extract_profile_id_from_role_key(&key) else {
                continue;
            };
            if let Some(profile) = self.get_profile(&profile_id)? {
                profiles.push(profile);
            }
        }

        profiles.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(profiles)
    }

    // =========================================================================
    // Farmer Roster Operations
    // =========================================================================

    fn insert_farmer(&self, farmer: &Farmer) -> Result<()> {
        let _guard = self.writes.lock();
        if self.get_farmer(&farmer.farmer_id)?.is_some() {
            return Err(StoreError::AlreadyExists);
        }
        self.write_farmer(farmer)
    }

    fn put_farmer(&self, farmer: &Farmer) -> Result<()> {
        let _guard = self.writes.lock();
        self.write_farmer(farmer)
    }

    fn get_farmer(&self, farmer_id: &ProfileId) -> Result<Option<Farmer>> {
        self.get_record(cf::FARMERS, &keys::record_key(farmer_id.as_bytes()))
    }

    fn delete_farmer(&self, farmer_id: &ProfileId) -> Result<()> {
        let _guard = self.writes.lock();
        let cf_farmers = self.cf(cf::FARMERS)?;
        let cf_by_agent = self.cf(cf::FARMERS_BY_AGENT)?;

        let farmer = self.get_farmer(farmer_id)?.ok_or(StoreError::NotFound)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_farmers, keys::record_key(farmer_id.as_bytes()));
        batch.delete_cf(
            &cf_by_agent,
            keys::pair_key(farmer.created_by.as_bytes(), farmer_id.as_bytes()),
        );

        self.write(batch)?;

        self.changes.publish(ChangeEvent::new(
            Table::Farmers,
            ChangeKind::Delete,
            farmer.farmer_id,
            vec![farmer.farmer_id, farmer.created_by],
        ));
        Ok(())
    }

    fn list_farmers_by_agent(&self, agent_id: &ProfileId) -> Result<Vec<Farmer>> {
        let mut farmers = Vec::new();
        for row in self.scan_index(cf::FARMERS_BY_AGENT, agent_id.as_bytes())? {
            if let Some(farmer) = self.get_farmer(&ProfileId::from_bytes(row))? {
                farmers.push(farmer);
            }
        }
        farmers.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(farmers)
    }

    fn count_farmers_by_agent(&self, agent_id: &ProfileId) -> Result<u32> {
        let rows = self.scan_index(cf::FARMERS_BY_AGENT, agent_id.as_bytes())?;
        Ok(u32::try_from(rows.len()).unwrap_or(u32::MAX))
    }

    // =========================================================================
    // Collection Operations
    // =========================================================================

    fn put_collection(&self, collection: &Collection) -> Result<()> {
        let _guard = self.writes.lock();
        self.write_collection(collection)
    }

    fn transition_collection(&self, collection: &Collection, from: CollectionStatus) -> Result<()> {
        let _guard = self.writes.lock();
        let current = self
            .get_collection(&collection.collection_id)?
            .ok_or(StoreError::NotFound)?;
        if current.status != from {
            return Err(StoreError::StatusChanged(current.status));
        }
        self.write_collection(collection)
    }

    fn get_collection(&self, collection_id: &CollectionId) -> Result<Option<Collection>> {
        self.get_record(cf::COLLECTIONS, &keys::record_key(collection_id.as_bytes()))
    }

    fn list_collections_by_farmer(&self, farmer_id: &ProfileId) -> Result<Vec<Collection>> {
        self.collections_from_index(cf::COLLECTIONS_BY_FARMER, farmer_id)
    }

    fn list_collections_by_agent(&self, agent_id: &ProfileId) -> Result<Vec<Collection>> {
        self.collections_from_index(cf::COLLECTIONS_BY_AGENT, agent_id)
    }

    // =========================================================================
    // Message Operations
    // =========================================================================

    fn put_message(&self, message: &Message) -> Result<()> {
        let _guard = self.writes.lock();
        self.write_message(message)
    }

    fn mark_message_read(
        &self,
        message_id: &MessageId,
        read_at: DateTime<Utc>,
    ) -> Result<Option<Message>> {
        let _guard = self.writes.lock();
        let mut message = self.get_message(message_id)?.ok_or(StoreError::NotFound)?;
        if message.read_at.is_some() {
            return Ok(None);
        }
        message.read_at = Some(read_at);
        self.write_message(&message)?;
        Ok(Some(message))
    }

    fn get_message(&self, message_id: &MessageId) -> Result<Option<Message>> {
        self.get_record(cf::MESSAGES, &keys::record_key(message_id.as_bytes()))
    }

    fn list_messages_by_sender(&self, sender_id: &ProfileId) -> Result<Vec<Message>> {
        self.messages_from_index(cf::MESSAGES_BY_SENDER, sender_id)
    }

    fn list_messages_by_receiver(&self, receiver_id: &ProfileId) -> Result<Vec<Message>> {
        self.messages_from_index(cf::MESSAGES_BY_RECEIVER, receiver_id)
    }

    fn list_unread_by_receiver(&self, receiver_id: &ProfileId) -> Result<Vec<Message>> {
        self.messages_from_index(cf::UNREAD_BY_RECEIVER, receiver_id)
    }

    // =========================================================================
    // Announcement Operations
    // =========================================================================

    fn put_announcement(&self, announcement: &Announcement) -> Result<()> {
        let _guard = self.writes.lock();
        let cf = self.cf(cf::ANNOUNCEMENTS)?;
        let old = self.get_announcement(&announcement.announcement_id)?;

        self.db
            .put_cf(
                &cf,
                keys::record_key(announcement.announcement_id.as_bytes()),
                Self::serialize(announcement)?,
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        // Announcements concern every user
        self.changes.publish(ChangeEvent::new(
            Table::Announcements,
            Self::kind_for(old.as_ref()),
            announcement.announcement_id,
            Vec::new(),
        ));
        Ok(())
    }

    fn get_announcement(&self, announcement_id: &AnnouncementId) -> Result<Option<Announcement>> {
        self.get_record(
            cf::ANNOUNCEMENTS,
            &keys::record_key(announcement_id.as_bytes()),
        )
    }

    fn list_announcements(&self) -> Result<Vec<Announcement>> {
        let mut announcements: Vec<Announcement> = self.scan_all(cf::ANNOUNCEMENTS)?;
        announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(announcements)
    }


    fn put_announcement_recipient(&self, recipient: &AnnouncementRecipient) -> Result<()> {
        let _guard = self.writes.lock();
        self.write_announcement_recipient(recipient)
    }

    fn mark_announcement_read(
        &self,
        announcement_id: &AnnouncementId,
        user_id: &ProfileId,
        read_at: DateTime<Utc>,
    ) -> Result<AnnouncementRecipient> {
        let _guard = self.writes.lock();
        if let Some(existing) = self.get_announcement_recipient(announcement_id, user_id)? {
            if existing.read_at.is_some() {
                return Ok(existing);
            }
        }
        let recipient = AnnouncementRecipient {
            announcement_id: *announcement_id,
            user_id: *user_id,
            read_at: Some(read_at),
        };
        self.write_announcement_recipient(&recipient)?;
        Ok(recipient)
    }

    fn get_announcement_recipient(
        &self,
        announcement_id: &AnnouncementId,
        user_id: &ProfileId,
    ) -> Result<Option<AnnouncementRecipient>> {
        self.get_record(
            cf::ANNOUNCEMENT_RECIPIENTS,
            &keys::pair_key(announcement_id.as_bytes(), user_id.as_bytes()),
        )
    }
}

//! Coordination service implementation.
//!
//! This module provides the `Coordinator` trait and `CoordinatorService`
//! implementation that ties profiles, the roster, collections, messages and
//! announcements together on top of a [`Store`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use dairylink_core::{AnnouncementId, CollectionId, MessageId, ProfileId, Role};
use dairylink_store::{
    Announcement, AnnouncementRecipient, ChangeFilter, Collection, CollectionStatus, Farmer,
    Message, Profile, Store, StoreError, Subscription,
};

use crate::error::{ControlError, Result};
use crate::lifecycle;
use crate::stats::CollectionStats;
use crate::types::{
    AddFarmerRequest, AgentCollections, AgentContact, AgentDashboard, AnnouncementView,
    CollectionWithFarmer, CreateAnnouncementRequest, Dashboard, FarmerCollections,
    FarmerDashboard, FarmerWithUnread, RecordCollectionRequest, ScheduleCollectionRequest,
    SendMessageRequest, ServiceConfig, SyncProfileRequest,
};
use crate::unread;
use crate::viewer::Viewer;

/// Trait defining the coordination operations.
///
/// Operations that depend on who is asking take the resolved [`Viewer`];
/// role-specific operations reject the other role with
/// `ControlError::WrongRole`.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Subscribe to row changes.
    fn subscribe(&self, filter: ChangeFilter) -> Subscription;

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Resolve a token subject into a viewer.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ProfileNotFound` if the profile was never synced.
    async fn resolve_viewer(&self, profile_id: &ProfileId) -> Result<Viewer>;

    /// Create or update the caller's profile.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Conflict` if the role differs from the stored one.
    async fn sync_profile(&self, profile_id: &ProfileId, request: SyncProfileRequest)
        -> Result<Profile>;

    /// Role-specific summary.
    async fn dashboard(&self, viewer: &Viewer) -> Result<Dashboard>;

    // =========================================================================
    // Roster
    // =========================================================================

    /// Farmer profiles that no agent has added yet.
    async fn available_farmer_profiles(&self, viewer: &Viewer) -> Result<Vec<Profile>>;

    /// Put a farmer on the caller's roster.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Conflict` if the farmer is already on a roster.
    async fn add_farmer(&self, viewer: &Viewer, request: AddFarmerRequest) -> Result<Farmer>;

    /// The caller's roster, ordered by name, with unread message counts.
    async fn list_roster(&self, viewer: &Viewer) -> Result<Vec<FarmerWithUnread>>;

    /// Take a farmer off the caller's roster.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::NotOwner` if another agent owns the row.
    async fn remove_farmer(&self, viewer: &Viewer, farmer_id: &ProfileId) -> Result<()>;

    /// The agent a farmer is assigned to, if any.
    async fn farmer_agent(&self, viewer: &Viewer) -> Result<Option<Profile>>;

    // =========================================================================
    // Collections
    // =========================================================================

    /// Book a collection for a farmer on the caller's roster.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Validation` if the slot is in the past or the
    /// expected quantity is invalid.
    async fn schedule_collection(
        &self,
        viewer: &Viewer,
        request: ScheduleCollectionRequest,
    ) -> Result<Collection>;

    /// Record the measured quantity, completing the collection.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidState` unless the collection is scheduled.
    async fn record_collection(
        &self,
        viewer: &Viewer,
        collection_id: &CollectionId,
        request: RecordCollectionRequest,
    ) -> Result<Collection>;

    /// Call off a scheduled collection.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidState` unless the collection is scheduled.
    async fn cancel_collection(
        &self,
        viewer: &Viewer,
        collection_id: &CollectionId,
    ) -> Result<Collection>;

    /// The caller's collections with farmer names, grouped by status.
    async fn agent_collections(&self, viewer: &Viewer) -> Result<AgentCollections>;

    /// The calling farmer's collection history.
    async fn farmer_collections(&self, viewer: &Viewer) -> Result<FarmerCollections>;

    /// Statistics over the calling farmer's collections.
    async fn my_stats(&self, viewer: &Viewer) -> Result<CollectionStats>;

    /// Statistics for a farmer on the caller's roster.
    async fn roster_farmer_stats(
        &self,
        viewer: &Viewer,
        farmer_id: &ProfileId,
    ) -> Result<CollectionStats>;

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Send a direct message.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Validation` for empty or oversized content or a
    /// message to oneself.
    async fn send_message(&self, viewer: &Viewer, request: SendMessageRequest) -> Result<Message>;

    /// Messages between the caller and `other`, oldest first.
    async fn conversation(&self, viewer: &Viewer, other: &ProfileId) -> Result<Vec<Message>>;

    /// Mark everything `other` sent the caller as read. Returns how many
    /// messages changed.
    async fn mark_conversation_read(&self, viewer: &Viewer, other: &ProfileId) -> Result<u32>;

    /// Mark one received message as read. Re-marking keeps the first
    /// `read_at`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::NotOwner` if the caller is not the receiver.
    async fn mark_message_read(&self, viewer: &Viewer, message_id: &MessageId) -> Result<Message>;

    // =========================================================================
    // Announcements
    // =========================================================================

    /// Post an announcement.
    async fn create_announcement(
        &self,
        viewer: &Viewer,
        request: CreateAnnouncementRequest,
    ) -> Result<Announcement>;

    /// Announcements that have not expired, newest first.
    async fn list_announcements(&self, viewer: &Viewer) -> Result<Vec<AnnouncementView>>;

    /// Record that the caller read an announcement.
    async fn mark_announcement_read(
        &self,
        viewer: &Viewer,
        announcement_id: &AnnouncementId,
    ) -> Result<AnnouncementRecipient>;
}

/// The main coordination service implementation.
pub struct CoordinatorService<S: Store> {
    store: Arc<S>,
    config: ServiceConfig,
}

impl<S: Store> CoordinatorService<S> {
    /// Create a new coordination service.
    #[must_use]
    pub fn new(store: Arc<S>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, ServiceConfig::default())
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get a roster row owned by `agent_id`.
    fn owned_farmer(&self, agent_id: &ProfileId, farmer_id: &ProfileId) -> Result<Farmer> {
        let farmer = self
            .store
            .get_farmer(farmer_id)?
            .ok_or(ControlError::FarmerNotFound(*farmer_id))?;

        if farmer.created_by != *agent_id {
            return Err(ControlError::NotOwner {
                profile_id: *agent_id,
                resource: format!("farmer {farmer_id}"),
            });
        }
        Ok(farmer)
    }

    /// Get a collection scheduled by `agent_id`.
    fn owned_collection(
        &self,
        agent_id: &ProfileId,
        collection_id: &CollectionId,
    ) -> Result<Collection> {
        let collection = self
            .store
            .get_collection(collection_id)?
            .ok_or(ControlError::CollectionNotFound(*collection_id))?;

        if collection.agent_id != *agent_id {
            return Err(ControlError::NotOwner {
                profile_id: *agent_id,
                resource: format!("collection {collection_id}"),
            });
        }
        Ok(collection)
    }

    /// Perform a validated status transition.
    ///
    /// The write only lands if the stored status is still the one validated
    /// here, so of two racing transitions the second sees `InvalidState`.
    fn transition_status(
        &self,
        collection: &mut Collection,
        target: CollectionStatus,
    ) -> Result<()> {
        let collection_id = collection.collection_id;
        let from = collection.status;
        lifecycle::validate_transition(&collection_id, from, target)?;
        let now = Utc::now();
        collection.status = target;
        collection.updated_at = now;
        if target == CollectionStatus::Completed {
            collection.completed_at = Some(now);
        }
        self.store
            .transition_collection(collection, from)
            .map_err(|e| match e {
                StoreError::StatusChanged(current) => ControlError::InvalidState {
                    collection_id,
                    from: current,
                    to: target,
                },
                StoreError::NotFound => ControlError::CollectionNotFound(collection_id),
                other => other.into(),
            })
    }

    fn stats_for(&self, farmer_id: &ProfileId) -> Result<CollectionStats> {
        let collections = self.store.list_collections_by_farmer(farmer_id)?;
        Ok(CollectionStats::from_collections(&collections))
    }

    /// A message may go to any profile or to a roster-only farmer.
    fn recipient_exists(&self, profile_id: &ProfileId) -> Result<bool> {
        Ok(self.store.get_profile(profile_id)?.is_some()
            || self.store.get_farmer(profile_id)?.is_some())
    }

    fn farmer_dashboard(&self, profile: &Profile) -> Result<FarmerDashboard> {
        let today = local_now().date();
        let collections = self.store.list_collections_by_farmer(&profile.profile_id)?;
        let upcoming = collections
            .iter()
            .filter(|c| lifecycle::is_scheduled_from(c, today))
            .count();

        let agent = self
            .assigned_agent(&profile.profile_id)?
            .map(|agent| AgentContact {
                profile_id: agent.profile_id,
                full_name: agent.full_name,
                phone_number: agent.phone_number,
            });

        Ok(FarmerDashboard {
            stats: CollectionStats::from_collections(&collections),
            upcoming_collections: saturating_u32(upcoming),
            agent,
        })
    }

    fn agent_dashboard(&self, profile: &Profile) -> Result<AgentDashboard> {
        let today = local_now().date();
        let agent_id = &profile.profile_id;
        let collections = self.store.list_collections_by_agent(agent_id)?;
        let upcoming = collections
            .iter()
            .filter(|c| lifecycle::is_scheduled_from(c, today))
            .count();
        let messages = self.store.list_messages_by_sender(agent_id)?.len()
            + self.store.list_messages_by_receiver(agent_id)?.len();

        Ok(AgentDashboard {
            roster_size: self.store.count_farmers_by_agent(agent_id)?,
            total_collections: saturating_u32(collections.len()),
            upcoming_collections: saturating_u32(upcoming),
            total_messages: saturating_u32(messages),
        })
    }

    fn assigned_agent(&self, farmer_id: &ProfileId) -> Result<Option<Profile>> {
        let Some(farmer) = self.store.get_farmer(farmer_id)? else {
            return Ok(None);
        };
        Ok(self.store.get_profile(&farmer.created_by)?)
    }

    fn farmer_names(&self, collections: &[Collection]) -> Result<HashMap<ProfileId, String>> {
        let mut names = HashMap::new();
        for collection in collections {
            if names.contains_key(&collection.farmer_id) {
                continue;
            }
            let name = match self.store.get_farmer(&collection.farmer_id)? {
                Some(farmer) => farmer.full_name,
                None => self
                    .store
                    .get_profile(&collection.farmer_id)?
                    .map_or_else(|| "Unknown farmer".to_string(), |p| p.full_name),
            };
            names.insert(collection.farmer_id, name);
        }
        Ok(names)
    }
}

#[async_trait]
impl<S: Store + 'static> Coordinator for CoordinatorService<S> {
    fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        self.store.changes().subscribe(filter)
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    async fn resolve_viewer(&self, profile_id: &ProfileId) -> Result<Viewer> {
        let profile = self
            .store
            .get_profile(profile_id)?
            .ok_or(ControlError::ProfileNotFound(*profile_id))?;
        Ok(Viewer::from_profile(profile))
    }

    async fn sync_profile(
        &self,
        profile_id: &ProfileId,
        request: SyncProfileRequest,
    ) -> Result<Profile> {
        let full_name = required_text(&request.full_name, "full name", usize::MAX)?;
        let now = Utc::now();

        let profile = match self.store.get_profile(profile_id)? {
            Some(existing) => {
                if existing.role != request.role {
                    return Err(ControlError::Conflict(format!(
                        "profile {profile_id} is a {}, the role cannot change",
                        existing.role
                    )));
                }
                Profile {
                    full_name,
                    phone_number: optional_text(request.phone_number),
                    location: optional_text(request.location),
                    updated_at: now,
                    ..existing
                }
            }
            None => Profile {
                profile_id: *profile_id,
                full_name,
                role: request.role,
                phone_number: optional_text(request.phone_number),
                location: optional_text(request.location),
                created_at: now,
                updated_at: now,
            },
        };

        self.store.put_profile(&profile)?;

        tracing::info!(profile_id = %profile_id, role = %profile.role, "Synced profile");

        Ok(profile)
    }

    async fn dashboard(&self, viewer: &Viewer) -> Result<Dashboard> {
        match viewer {
            Viewer::Farmer(profile) => Ok(Dashboard::Farmer(self.farmer_dashboard(profile)?)),
            Viewer::Agent(profile) => Ok(Dashboard::Agent(self.agent_dashboard(profile)?)),
        }
    }

    // =========================================================================
    // Roster
    // =========================================================================

    async fn available_farmer_profiles(&self, viewer: &Viewer) -> Result<Vec<Profile>> {
        viewer.require_agent()?;

        let mut available = Vec::new();
        for profile in self.store.list_profiles_by_role(Role::Farmer)? {
            if self.store.get_farmer(&profile.profile_id)?.is_none() {
                available.push(profile);
            }
        }
        Ok(available)
    }

    async fn add_farmer(&self, viewer: &Viewer, request: AddFarmerRequest) -> Result<Farmer> {
        let agent = viewer.require_agent()?;
        let now = Utc::now();

        let farmer = match request {
            AddFarmerRequest::Existing { profile_id } => {
                let profile = self
                    .store
                    .get_profile(&profile_id)?
                    .ok_or(ControlError::ProfileNotFound(profile_id))?;
                if profile.role != Role::Farmer {
                    return Err(ControlError::Validation(format!(
                        "profile {profile_id} is not a farmer"
                    )));
                }
                Farmer {
                    farmer_id: profile.profile_id,
                    full_name: profile.full_name,
                    phone_number: profile.phone_number.unwrap_or_default(),
                    location: profile.location.unwrap_or_default(),
                    created_by: agent.profile_id,
                    created_at: now,
                    updated_at: now,
                }
            }
            AddFarmerRequest::New {
                full_name,
                phone_number,
                location,
            } => Farmer {
                farmer_id: ProfileId::generate(),
                full_name: required_text(&full_name, "full name", usize::MAX)?,
                phone_number: phone_number.trim().to_string(),
                location: location.trim().to_string(),
                created_by: agent.profile_id,
                created_at: now,
                updated_at: now,
            },
        };

        self.store.insert_farmer(&farmer).map_err(|e| match e {
            StoreError::AlreadyExists => ControlError::Conflict(format!(
                "farmer {} is already on a roster",
                farmer.farmer_id
            )),
            other => other.into(),
        })?;

        tracing::info!(
            farmer_id = %farmer.farmer_id,
            agent_id = %agent.profile_id,
            "Added farmer to roster"
        );

        Ok(farmer)
    }

    async fn list_roster(&self, viewer: &Viewer) -> Result<Vec<FarmerWithUnread>> {
        let agent = viewer.require_agent()?;

        let farmers = self.store.list_farmers_by_agent(&agent.profile_id)?;
        let unread = self.store.list_unread_by_receiver(&agent.profile_id)?;
        let counts = unread::count_by_sender(&unread);

        Ok(unread::annotate(farmers, &counts))
    }

    async fn remove_farmer(&self, viewer: &Viewer, farmer_id: &ProfileId) -> Result<()> {
        let agent = viewer.require_agent()?;
        self.owned_farmer(&agent.profile_id, farmer_id)?;

        self.store.delete_farmer(farmer_id)?;

        tracing::info!(
            farmer_id = %farmer_id,
            agent_id = %agent.profile_id,
            "Removed farmer from roster"
        );

        Ok(())
    }

    async fn farmer_agent(&self, viewer: &Viewer) -> Result<Option<Profile>> {
        let farmer = viewer.require_farmer()?;
        self.assigned_agent(&farmer.profile_id)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    async fn schedule_collection(
        &self,
        viewer: &Viewer,
        request: ScheduleCollectionRequest,
    ) -> Result<Collection> {
        let agent = viewer.require_agent()?;

        lifecycle::validate_schedule(
            request.scheduled_date,
            request.scheduled_time,
            local_now(),
        )?;
        let expected = request
            .expected_quantity
            .map(lifecycle::validate_quantity)
            .transpose()?;
        let notes = request
            .notes
            .map(|notes| bounded_text(&notes, "notes", self.config.max_notes_chars))
            .transpose()?
            .flatten();

        self.owned_farmer(&agent.profile_id, &request.farmer_id)?;

        let now = Utc::now();
        let collection = Collection {
            collection_id: CollectionId::generate(),
            farmer_id: request.farmer_id,
            agent_id: agent.profile_id,
            scheduled_date: request.scheduled_date,
            scheduled_time: request.scheduled_time,
            quantity_liters: expected,
            notes,
            status: CollectionStatus::Scheduled,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        self.store.put_collection(&collection)?;

        tracing::info!(
            collection_id = %collection.collection_id,
            farmer_id = %collection.farmer_id,
            agent_id = %collection.agent_id,
            scheduled_at = %collection.scheduled_at(),
            "Scheduled collection"
        );

        Ok(collection)
    }

    async fn record_collection(
        &self,
        viewer: &Viewer,
        collection_id: &CollectionId,
        request: RecordCollectionRequest,
    ) -> Result<Collection> {
        let agent = viewer.require_agent()?;
        let quantity = lifecycle::validate_quantity(request.quantity_liters)?;
        let mut collection = self.owned_collection(&agent.profile_id, collection_id)?;

        // Check before touching the quantity so a rejected record leaves the row intact
        lifecycle::validate_transition(
            collection_id,
            collection.status,
            CollectionStatus::Completed,
        )?;
        collection.quantity_liters = Some(quantity);
        self.transition_status(&mut collection, CollectionStatus::Completed)?;

        tracing::info!(
            collection_id = %collection_id,
            quantity_liters = quantity,
            "Recorded collection"
        );

        Ok(collection)
    }

    async fn cancel_collection(
        &self,
        viewer: &Viewer,
        collection_id: &CollectionId,
    ) -> Result<Collection> {
        let agent = viewer.require_agent()?;
        let mut collection = self.owned_collection(&agent.profile_id, collection_id)?;

        self.transition_status(&mut collection, CollectionStatus::Cancelled)?;

        tracing::info!(collection_id = %collection_id, "Cancelled collection");

        Ok(collection)
    }

    async fn agent_collections(&self, viewer: &Viewer) -> Result<AgentCollections> {
        let agent = viewer.require_agent()?;
        let now = local_now();

        let collections = self.store.list_collections_by_agent(&agent.profile_id)?;
        let names = self.farmer_names(&collections)?;

        let mut grouped = AgentCollections::default();
        for collection in collections {
            let farmer_name = names
                .get(&collection.farmer_id)
                .cloned()
                .unwrap_or_default();
            let bucket = match collection.status {
                CollectionStatus::Completed => &mut grouped.completed,
                CollectionStatus::Cancelled => &mut grouped.cancelled,
                CollectionStatus::Scheduled if lifecycle::is_upcoming(&collection, now) => {
                    &mut grouped.upcoming
                }
                CollectionStatus::Scheduled => &mut grouped.overdue,
            };
            bucket.push(CollectionWithFarmer {
                collection,
                farmer_name,
            });
        }
        Ok(grouped)
    }

    async fn farmer_collections(&self, viewer: &Viewer) -> Result<FarmerCollections> {
        let farmer = viewer.require_farmer()?;
        let now = local_now();

        let mut collections = self.store.list_collections_by_farmer(&farmer.profile_id)?;
        collections.reverse();

        let mut history = FarmerCollections::default();
        for collection in collections {
            if lifecycle::is_upcoming(&collection, now) {
                history.upcoming.push(collection);
            } else if collection.status == CollectionStatus::Completed
                || collection.scheduled_at() <= now
            {
                history.past.push(collection);
            }
        }
        Ok(history)
    }

    async fn my_stats(&self, viewer: &Viewer) -> Result<CollectionStats> {
        let farmer = viewer.require_farmer()?;
        self.stats_for(&farmer.profile_id)
    }

    async fn roster_farmer_stats(
        &self,
        viewer: &Viewer,
        farmer_id: &ProfileId,
    ) -> Result<CollectionStats> {
        let agent = viewer.require_agent()?;
        self.owned_farmer(&agent.profile_id, farmer_id)?;
        self.stats_for(farmer_id)
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    async fn send_message(&self, viewer: &Viewer, request: SendMessageRequest) -> Result<Message> {
        let sender_id = viewer.profile_id();
        let content = required_text(&request.content, "message", self.config.max_message_chars)?;

        if request.receiver_id == sender_id {
            return Err(ControlError::Validation(
                "cannot send a message to yourself".to_string(),
            ));
        }
        if !self.recipient_exists(&request.receiver_id)? {
            return Err(ControlError::ProfileNotFound(request.receiver_id));
        }

        let message = Message {
            message_id: MessageId::generate(),
            sender_id,
            receiver_id: request.receiver_id,
            content,
            message_type: request.message_type,
            created_at: Utc::now(),
            read_at: None,
        };

        self.store.put_message(&message)?;

        tracing::info!(
            message_id = %message.message_id,
            sender_id = %sender_id,
            receiver_id = %message.receiver_id,
            "Sent message"
        );

        Ok(message)
    }

    async fn conversation(&self, viewer: &Viewer, other: &ProfileId) -> Result<Vec<Message>> {
        let me = viewer.profile_id();

        let mut messages: Vec<Message> = self
            .store
            .list_messages_by_sender(&me)?
            .into_iter()
            .filter(|m| m.receiver_id == *other)
            .chain(
                self.store
                    .list_messages_by_receiver(&me)?
                    .into_iter()
                    .filter(|m| m.sender_id == *other),
            )
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn mark_conversation_read(&self, viewer: &Viewer, other: &ProfileId) -> Result<u32> {
        let me = viewer.profile_id();
        let now = Utc::now();

        let mut marked = 0u32;
        for message in self.store.list_unread_by_receiver(&me)? {
            if message.sender_id != *other {
                continue;
            }
            if self.store.mark_message_read(&message.message_id, now)?.is_some() {
                marked += 1;
            }
        }

        if marked > 0 {
            tracing::info!(receiver_id = %me, sender_id = %other, marked, "Marked conversation read");
        }

        Ok(marked)
    }

    async fn mark_message_read(&self, viewer: &Viewer, message_id: &MessageId) -> Result<Message> {
        let me = viewer.profile_id();
        let message = self
            .store
            .get_message(message_id)?
            .ok_or(ControlError::MessageNotFound(*message_id))?;

        if message.receiver_id != me {
            return Err(ControlError::NotOwner {
                profile_id: me,
                resource: format!("message {message_id}"),
            });
        }

        if message.read_at.is_some() {
            return Ok(message);
        }

        match self.store.mark_message_read(message_id, Utc::now())? {
            Some(marked) => {
                tracing::debug!(message_id = %message_id, "Marked message read");
                Ok(marked)
            }
            // Another request marked it first
            None => self
                .store
                .get_message(message_id)?
                .ok_or(ControlError::MessageNotFound(*message_id)),
        }
    }

    // =========================================================================
    // Announcements
    // =========================================================================

    async fn create_announcement(
        &self,
        viewer: &Viewer,
        request: CreateAnnouncementRequest,
    ) -> Result<Announcement> {
        let agent = viewer.require_agent()?;
        let title = required_text(&request.title, "title", self.config.max_title_chars)?;
        let content = required_text(&request.content, "content", self.config.max_message_chars)?;

        let now = Utc::now();
        if request.expires_at.is_some_and(|at| at <= now) {
            return Err(ControlError::Validation(
                "expiry must be in the future".to_string(),
            ));
        }

        let announcement = Announcement {
            announcement_id: AnnouncementId::generate(),
            agent_id: agent.profile_id,
            title,
            content,
            created_at: now,
            expires_at: request.expires_at,
        };

        self.store.put_announcement(&announcement)?;

        tracing::info!(
            announcement_id = %announcement.announcement_id,
            agent_id = %agent.profile_id,
            "Created announcement"
        );

        Ok(announcement)
    }

    async fn list_announcements(&self, viewer: &Viewer) -> Result<Vec<AnnouncementView>> {
        let me = viewer.profile_id();
        let now = Utc::now();

        let mut views = Vec::new();
        for announcement in self.store.list_announcements()? {
            if announcement.is_expired(now) {
                continue;
            }
            let read_at = self
                .store
                .get_announcement_recipient(&announcement.announcement_id, &me)?
                .and_then(|r| r.read_at);
            views.push(AnnouncementView {
                announcement,
                read_at,
            });
        }
        Ok(views)
    }

    async fn mark_announcement_read(
        &self,
        viewer: &Viewer,
        announcement_id: &AnnouncementId,
    ) -> Result<AnnouncementRecipient> {
        let me = viewer.profile_id();

        if self.store.get_announcement(announcement_id)?.is_none() {
            return Err(ControlError::AnnouncementNotFound(*announcement_id));
        }

        let recipient = self
            .store
            .mark_announcement_read(announcement_id, &me, Utc::now())?;

        tracing::debug!(announcement_id = %announcement_id, user_id = %me, "Marked announcement read");

        Ok(recipient)
    }
}

/// Pickup slots are entered in local wall-clock time.
fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Trim `value` and reject it if empty or longer than `max` characters.
fn required_text(value: &str, field: &str, max: usize) -> Result<String> {
    bounded_text(value, field, max)?
        .ok_or_else(|| ControlError::Validation(format!("{field} must not be empty")))
}

/// Trim `value`; empty becomes `None`.
fn bounded_text(value: &str, field: &str, max: usize) -> Result<Option<String>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max {
        return Err(ControlError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveTime};
    use dairylink_store::{MessageType, RocksStore};
    use tempfile::TempDir;

    fn setup() -> (CoordinatorService<RocksStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let config = ServiceConfig {
            max_message_chars: 50,
            ..Default::default()
        };
        (CoordinatorService::new(store, config), dir)
    }

    async fn viewer(
        service: &CoordinatorService<RocksStore>,
        name: &str,
        role: Role,
    ) -> Viewer {
        let profile_id = ProfileId::generate();
        service
            .sync_profile(
                &profile_id,
                SyncProfileRequest {
                    full_name: name.to_string(),
                    role,
                    phone_number: Some("+254711000000".to_string()),
                    location: None,
                },
            )
            .await
            .unwrap();
        service.resolve_viewer(&profile_id).await.unwrap()
    }

    /// An agent with one rostered farmer.
    async fn roster(service: &CoordinatorService<RocksStore>) -> (Viewer, Viewer) {
        let agent = viewer(service, "Otieno", Role::Agent).await;
        let farmer = viewer(service, "Wanjiru", Role::Farmer).await;
        service
            .add_farmer(
                &agent,
                AddFarmerRequest::Existing {
                    profile_id: farmer.profile_id(),
                },
            )
            .await
            .unwrap();
        (agent, farmer)
    }

    fn in_days(days: i64) -> NaiveDate {
        local_now().date() + Duration::days(days)
    }

    fn schedule_request(farmer: &Viewer, expected: Option<f64>) -> ScheduleCollectionRequest {
        ScheduleCollectionRequest {
            farmer_id: farmer.profile_id(),
            scheduled_date: in_days(7),
            scheduled_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            expected_quantity: expected,
            notes: None,
        }
    }

    fn message(receiver: &Viewer, content: &str) -> SendMessageRequest {
        SendMessageRequest {
            receiver_id: receiver.profile_id(),
            content: content.to_string(),
            message_type: MessageType::Inquiry,
        }
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let (service, _dir) = setup();
        let result = service.resolve_viewer(&ProfileId::generate()).await;
        assert!(matches!(result, Err(ControlError::ProfileNotFound(_))));
    }

    #[tokio::test]
    async fn profile_role_is_immutable() {
        let (service, _dir) = setup();
        let farmer = viewer(&service, "Kamau", Role::Farmer).await;

        let updated = service
            .sync_profile(
                &farmer.profile_id(),
                SyncProfileRequest {
                    full_name: "  Kamau Njoroge ".to_string(),
                    role: Role::Farmer,
                    phone_number: None,
                    location: Some("Kiambu".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Kamau Njoroge");
        assert_eq!(updated.created_at, farmer.profile().created_at);

        let result = service
            .sync_profile(
                &farmer.profile_id(),
                SyncProfileRequest {
                    full_name: "Kamau".to_string(),
                    role: Role::Agent,
                    phone_number: None,
                    location: None,
                },
            )
            .await;
        assert!(matches!(result, Err(ControlError::Conflict(_))));
    }

    // =========================================================================
    // Roster
    // =========================================================================

    #[tokio::test]
    async fn add_existing_farmer() {
        let (service, _dir) = setup();
        let agent = viewer(&service, "Otieno", Role::Agent).await;
        let farmer = viewer(&service, "Wanjiru", Role::Farmer).await;

        let available = service.available_farmer_profiles(&agent).await.unwrap();
        assert_eq!(available.len(), 1);

        let row = service
            .add_farmer(
                &agent,
                AddFarmerRequest::Existing {
                    profile_id: farmer.profile_id(),
                },
            )
            .await
            .unwrap();
        assert_eq!(row.created_by, agent.profile_id());
        assert_eq!(row.phone_number, "+254711000000");

        assert!(service
            .available_farmer_profiles(&agent)
            .await
            .unwrap()
            .is_empty());

        // A second agent cannot take the same farmer
        let other = viewer(&service, "Mutua", Role::Agent).await;
        let result = service
            .add_farmer(
                &other,
                AddFarmerRequest::Existing {
                    profile_id: farmer.profile_id(),
                },
            )
            .await;
        assert!(matches!(result, Err(ControlError::Conflict(_))));

        let assigned = service.farmer_agent(&farmer).await.unwrap().unwrap();
        assert_eq!(assigned.profile_id, agent.profile_id());
    }

    #[tokio::test]
    async fn add_new_farmer_without_account() {
        let (service, _dir) = setup();
        let agent = viewer(&service, "Otieno", Role::Agent).await;

        let row = service
            .add_farmer(
                &agent,
                AddFarmerRequest::New {
                    full_name: " Achieng ".to_string(),
                    phone_number: "0722".to_string(),
                    location: "Siaya".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(row.full_name, "Achieng");

        let roster = service.list_roster(&agent).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].unread_count, 0);
    }

    #[tokio::test]
    async fn only_farmer_profiles_can_be_added() {
        let (service, _dir) = setup();
        let agent = viewer(&service, "Otieno", Role::Agent).await;
        let other_agent = viewer(&service, "Mutua", Role::Agent).await;

        let result = service
            .add_farmer(
                &agent,
                AddFarmerRequest::Existing {
                    profile_id: other_agent.profile_id(),
                },
            )
            .await;
        assert!(matches!(result, Err(ControlError::Validation(_))));
    }

    #[tokio::test]
    async fn farmers_cannot_manage_rosters() {
        let (service, _dir) = setup();
        let farmer = viewer(&service, "Wanjiru", Role::Farmer).await;

        let result = service
            .add_farmer(
                &farmer,
                AddFarmerRequest::New {
                    full_name: "Someone".to_string(),
                    phone_number: String::new(),
                    location: String::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(ControlError::WrongRole { .. })));
        assert!(service.list_roster(&farmer).await.is_err());
    }

    #[tokio::test]
    async fn remove_farmer_owner_only() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;
        let other = viewer(&service, "Mutua", Role::Agent).await;

        let result = service.remove_farmer(&other, &farmer.profile_id()).await;
        assert!(matches!(result, Err(ControlError::NotOwner { .. })));

        service
            .remove_farmer(&agent, &farmer.profile_id())
            .await
            .unwrap();
        assert!(service.list_roster(&agent).await.unwrap().is_empty());
        assert!(service.farmer_agent(&farmer).await.unwrap().is_none());

        let result = service.remove_farmer(&agent, &farmer.profile_id()).await;
        assert!(matches!(result, Err(ControlError::FarmerNotFound(_))));
    }

    // =========================================================================
    // Collections
    // =========================================================================

    #[tokio::test]
    async fn schedule_collection_success() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;

        let mut request = schedule_request(&farmer, Some(20.0));
        request.notes = Some("  gate code 42 ".to_string());
        let collection = service.schedule_collection(&agent, request).await.unwrap();

        assert_eq!(collection.status, CollectionStatus::Scheduled);
        assert_eq!(collection.agent_id, agent.profile_id());
        assert_eq!(collection.quantity_liters, Some(20.0));
        assert_eq!(collection.notes.as_deref(), Some("gate code 42"));
        assert!(collection.completed_at.is_none());
    }

    #[tokio::test]
    async fn schedule_in_the_past_rejected() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;

        let mut request = schedule_request(&farmer, None);
        request.scheduled_date = in_days(-1);

        let result = service.schedule_collection(&agent, request).await;
        assert!(matches!(result, Err(ControlError::Validation(_))));
    }

    #[tokio::test]
    async fn schedule_requires_own_roster() {
        let (service, _dir) = setup();
        let (_agent, farmer) = roster(&service).await;
        let other = viewer(&service, "Mutua", Role::Agent).await;

        let result = service
            .schedule_collection(&other, schedule_request(&farmer, None))
            .await;
        assert!(matches!(result, Err(ControlError::NotOwner { .. })));

        let stranger = viewer(&service, "Kip", Role::Farmer).await;
        let result = service
            .schedule_collection(&other, schedule_request(&stranger, None))
            .await;
        assert!(matches!(result, Err(ControlError::FarmerNotFound(_))));
    }

    #[tokio::test]
    async fn schedule_rejects_negative_expected_quantity() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;

        let result = service
            .schedule_collection(&agent, schedule_request(&farmer, Some(-3.0)))
            .await;
        assert!(matches!(result, Err(ControlError::Validation(_))));
    }

    #[tokio::test]
    async fn record_overwrites_expected_quantity() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;
        let collection = service
            .schedule_collection(&agent, schedule_request(&farmer, Some(20.0)))
            .await
            .unwrap();

        let recorded = service
            .record_collection(
                &agent,
                &collection.collection_id,
                RecordCollectionRequest {
                    quantity_liters: 18.5,
                },
            )
            .await
            .unwrap();
        assert_eq!(recorded.status, CollectionStatus::Completed);
        assert_eq!(recorded.quantity_liters, Some(18.5));
        assert!(recorded.completed_at.is_some());
    }

    #[tokio::test]
    async fn double_record_rejected() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;
        let collection = service
            .schedule_collection(&agent, schedule_request(&farmer, None))
            .await
            .unwrap();
        let id = collection.collection_id;

        service
            .record_collection(&agent, &id, RecordCollectionRequest { quantity_liters: 10.0 })
            .await
            .unwrap();
        let result = service
            .record_collection(&agent, &id, RecordCollectionRequest { quantity_liters: 99.0 })
            .await;
        assert!(matches!(
            result,
            Err(ControlError::InvalidState {
                from: CollectionStatus::Completed,
                ..
            })
        ));

        // The first quantity survives
        let stored = service.store().get_collection(&id).unwrap().unwrap();
        assert_eq!(stored.quantity_liters, Some(10.0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_admit_one() {
        let (service, _dir) = setup();
        let service = Arc::new(service);
        let (agent, farmer) = roster(&service).await;
        let id = service
            .schedule_collection(&agent, schedule_request(&farmer, None))
            .await
            .unwrap()
            .collection_id;

        let barrier = Arc::new(tokio::sync::Barrier::new(8));
        let tasks: Vec<_> = (1..=8u32)
            .map(|n| {
                let service = Arc::clone(&service);
                let barrier = Arc::clone(&barrier);
                let agent = agent.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    let request = RecordCollectionRequest {
                        quantity_liters: f64::from(n),
                    };
                    service.record_collection(&agent, &id, request).await
                })
            })
            .collect();

        let mut winners = Vec::new();
        for task in tasks {
            match task.await.unwrap() {
                Ok(collection) => winners.push(collection.quantity_liters),
                Err(e) => assert!(matches!(e, ControlError::InvalidState { .. })),
            }
        }
        assert_eq!(winners.len(), 1);

        let stored = service.store().get_collection(&id).unwrap().unwrap();
        assert_eq!(stored.status, CollectionStatus::Completed);
        assert_eq!(stored.quantity_liters, winners[0]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_admit_one_roster() {
        let (service, _dir) = setup();
        let service = Arc::new(service);
        let farmer = viewer(&service, "Chebet", Role::Farmer).await;
        let mut agents = Vec::new();
        for n in 0..8 {
            agents.push(viewer(&service, &format!("Agent {n}"), Role::Agent).await);
        }

        let barrier = Arc::new(tokio::sync::Barrier::new(agents.len()));
        let tasks: Vec<_> = agents
            .iter()
            .cloned()
            .map(|agent| {
                let service = Arc::clone(&service);
                let barrier = Arc::clone(&barrier);
                let profile_id = farmer.profile_id();
                tokio::spawn(async move {
                    barrier.wait().await;
                    service
                        .add_farmer(&agent, AddFarmerRequest::Existing { profile_id })
                        .await
                })
            })
            .collect();

        let mut added = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => added += 1,
                Err(e) => assert!(matches!(e, ControlError::Conflict(_))),
            }
        }
        assert_eq!(added, 1);

        // Only the winning agent sees the farmer
        let mut rostered = 0;
        for agent in &agents {
            let roster = service.list_roster(agent).await.unwrap();
            rostered += roster.len();
        }
        assert_eq!(rostered, 1);
    }

    #[tokio::test]
    async fn cancel_collection_is_terminal() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;
        let collection = service
            .schedule_collection(&agent, schedule_request(&farmer, Some(5.0)))
            .await
            .unwrap();
        let id = collection.collection_id;

        let other = viewer(&service, "Mutua", Role::Agent).await;
        let result = service.cancel_collection(&other, &id).await;
        assert!(matches!(result, Err(ControlError::NotOwner { .. })));

        let cancelled = service.cancel_collection(&agent, &id).await.unwrap();
        assert_eq!(cancelled.status, CollectionStatus::Cancelled);

        let result = service
            .record_collection(&agent, &id, RecordCollectionRequest { quantity_liters: 1.0 })
            .await;
        assert!(matches!(result, Err(ControlError::InvalidState { .. })));
        assert!(matches!(
            service.cancel_collection(&agent, &id).await,
            Err(ControlError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn stats_merge_completed_and_expected() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;

        for quantity in [10.0, 15.0] {
            let c = service
                .schedule_collection(&agent, schedule_request(&farmer, None))
                .await
                .unwrap();
            service
                .record_collection(
                    &agent,
                    &c.collection_id,
                    RecordCollectionRequest {
                        quantity_liters: quantity,
                    },
                )
                .await
                .unwrap();
        }
        service
            .schedule_collection(&agent, schedule_request(&farmer, Some(5.0)))
            .await
            .unwrap();

        let stats = service.my_stats(&farmer).await.unwrap();
        assert!((stats.total_liters - 30.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_collections, 3);
        assert!((stats.average_liters - 10.0).abs() < f64::EPSILON);

        let seen_by_agent = service
            .roster_farmer_stats(&agent, &farmer.profile_id())
            .await
            .unwrap();
        assert_eq!(seen_by_agent, stats);
    }

    #[tokio::test]
    async fn stats_single_schedule_without_quantity() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;
        service
            .schedule_collection(&agent, schedule_request(&farmer, None))
            .await
            .unwrap();

        let stats = service.my_stats(&farmer).await.unwrap();
        assert_eq!(stats.total_collections, 1);
        assert!(stats.total_liters.abs() < f64::EPSILON);
        assert!(stats.average_liters.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn agent_collections_grouped_with_names() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;

        let later = service
            .schedule_collection(&agent, schedule_request(&farmer, None))
            .await
            .unwrap();
        let mut sooner_request = schedule_request(&farmer, None);
        sooner_request.scheduled_date = in_days(2);
        let sooner = service
            .schedule_collection(&agent, sooner_request)
            .await
            .unwrap();
        let done = service
            .schedule_collection(&agent, schedule_request(&farmer, None))
            .await
            .unwrap();
        service
            .record_collection(
                &agent,
                &done.collection_id,
                RecordCollectionRequest { quantity_liters: 3.0 },
            )
            .await
            .unwrap();

        let grouped = service.agent_collections(&agent).await.unwrap();
        assert_eq!(grouped.upcoming.len(), 2);
        assert_eq!(grouped.upcoming[0].collection.collection_id, sooner.collection_id);
        assert_eq!(grouped.upcoming[1].collection.collection_id, later.collection_id);
        assert_eq!(grouped.upcoming[0].farmer_name, "Wanjiru");
        assert_eq!(grouped.completed.len(), 1);
        assert!(grouped.overdue.is_empty());
    }

    #[tokio::test]
    async fn farmer_history_newest_first() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;

        let mut near = schedule_request(&farmer, None);
        near.scheduled_date = in_days(1);
        let near = service.schedule_collection(&agent, near).await.unwrap();
        let far = service
            .schedule_collection(&agent, schedule_request(&farmer, None))
            .await
            .unwrap();

        let history = service.farmer_collections(&farmer).await.unwrap();
        assert_eq!(history.upcoming.len(), 2);
        assert_eq!(history.upcoming[0].collection_id, far.collection_id);
        assert_eq!(history.upcoming[1].collection_id, near.collection_id);

        service
            .record_collection(
                &agent,
                &near.collection_id,
                RecordCollectionRequest { quantity_liters: 4.0 },
            )
            .await
            .unwrap();
        let history = service.farmer_collections(&farmer).await.unwrap();
        assert_eq!(history.upcoming.len(), 1);
        assert_eq!(history.past.len(), 1);

        assert!(service.farmer_collections(&agent).await.is_err());
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    #[tokio::test]
    async fn conversation_and_unread_counts() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;
        let outsider = viewer(&service, "Kip", Role::Farmer).await;

        service
            .send_message(&farmer, message(&agent, "When is pickup?"))
            .await
            .unwrap();
        service
            .send_message(&farmer, message(&agent, "Also, price?"))
            .await
            .unwrap();
        service
            .send_message(&agent, message(&farmer, "Tomorrow 7am"))
            .await
            .unwrap();
        service
            .send_message(&outsider, message(&agent, "Hello"))
            .await
            .unwrap();

        let thread = service
            .conversation(&agent, &farmer.profile_id())
            .await
            .unwrap();
        assert_eq!(thread.len(), 3);
        assert_eq!(thread[0].content, "When is pickup?");
        assert_eq!(thread[2].content, "Tomorrow 7am");

        let roster = service.list_roster(&agent).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].unread_count, 2);

        let marked = service
            .mark_conversation_read(&agent, &farmer.profile_id())
            .await
            .unwrap();
        assert_eq!(marked, 2);
        assert_eq!(service.list_roster(&agent).await.unwrap()[0].unread_count, 0);

        // The outsider's message is untouched
        assert_eq!(
            service
                .store()
                .list_unread_by_receiver(&agent.profile_id())
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn mark_message_read_keeps_first_timestamp() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;
        let sent = service
            .send_message(&farmer, message(&agent, "Hi"))
            .await
            .unwrap();

        let first = service
            .mark_message_read(&agent, &sent.message_id)
            .await
            .unwrap();
        let second = service
            .mark_message_read(&agent, &sent.message_id)
            .await
            .unwrap();
        assert!(first.read_at.is_some());
        assert_eq!(first.read_at, second.read_at);

        // Only the receiver may mark it
        let result = service.mark_message_read(&farmer, &sent.message_id).await;
        assert!(matches!(result, Err(ControlError::NotOwner { .. })));
    }

    #[tokio::test]
    async fn message_validation() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;

        let result = service.send_message(&farmer, message(&agent, "   ")).await;
        assert!(matches!(result, Err(ControlError::Validation(_))));

        let result = service
            .send_message(&farmer, message(&agent, &"x".repeat(51)))
            .await;
        assert!(matches!(result, Err(ControlError::Validation(_))));

        let result = service.send_message(&farmer, message(&farmer, "me")).await;
        assert!(matches!(result, Err(ControlError::Validation(_))));

        let result = service
            .send_message(
                &farmer,
                SendMessageRequest {
                    receiver_id: ProfileId::generate(),
                    content: "anyone?".to_string(),
                    message_type: MessageType::Inquiry,
                },
            )
            .await;
        assert!(matches!(result, Err(ControlError::ProfileNotFound(_))));

        let sent = service
            .send_message(&farmer, message(&agent, "  padded  "))
            .await
            .unwrap();
        assert_eq!(sent.content, "padded");
    }

    // =========================================================================
    // Announcements
    // =========================================================================

    #[tokio::test]
    async fn announcements_lifecycle() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;

        let result = service
            .create_announcement(
                &farmer,
                CreateAnnouncementRequest {
                    title: "Hi".to_string(),
                    content: "Body".to_string(),
                    expires_at: None,
                },
            )
            .await;
        assert!(matches!(result, Err(ControlError::WrongRole { .. })));

        let result = service
            .create_announcement(
                &agent,
                CreateAnnouncementRequest {
                    title: "Late".to_string(),
                    content: "Body".to_string(),
                    expires_at: Some(Utc::now() - Duration::minutes(5)),
                },
            )
            .await;
        assert!(matches!(result, Err(ControlError::Validation(_))));

        let posted = service
            .create_announcement(
                &agent,
                CreateAnnouncementRequest {
                    title: "New rates".to_string(),
                    content: "From Monday".to_string(),
                    expires_at: Some(Utc::now() + Duration::days(3)),
                },
            )
            .await
            .unwrap();

        // An expired one written straight to the store is hidden
        service
            .store()
            .put_announcement(&Announcement {
                announcement_id: AnnouncementId::generate(),
                agent_id: agent.profile_id(),
                title: "Old".to_string(),
                content: "Gone".to_string(),
                created_at: Utc::now() - Duration::days(2),
                expires_at: Some(Utc::now() - Duration::days(1)),
            })
            .unwrap();

        let listed = service.list_announcements(&farmer).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].read_at.is_none());

        let first = service
            .mark_announcement_read(&farmer, &posted.announcement_id)
            .await
            .unwrap();
        let second = service
            .mark_announcement_read(&farmer, &posted.announcement_id)
            .await
            .unwrap();
        assert_eq!(first.read_at, second.read_at);

        let listed = service.list_announcements(&farmer).await.unwrap();
        assert_eq!(listed[0].read_at, first.read_at);

        // Agent's own read state is separate
        assert!(service.list_announcements(&agent).await.unwrap()[0]
            .read_at
            .is_none());

        let result = service
            .mark_announcement_read(&farmer, &AnnouncementId::generate())
            .await;
        assert!(matches!(result, Err(ControlError::AnnouncementNotFound(_))));
    }

    // =========================================================================
    // Dashboards
    // =========================================================================

    #[tokio::test]
    async fn dashboards_by_role() {
        let (service, _dir) = setup();
        let (agent, farmer) = roster(&service).await;

        service
            .schedule_collection(&agent, schedule_request(&farmer, Some(12.0)))
            .await
            .unwrap();
        service
            .send_message(&farmer, message(&agent, "Thanks"))
            .await
            .unwrap();

        match service.dashboard(&agent).await.unwrap() {
            Dashboard::Agent(summary) => {
                assert_eq!(summary.roster_size, 1);
                assert_eq!(summary.total_collections, 1);
                assert_eq!(summary.upcoming_collections, 1);
                assert_eq!(summary.total_messages, 1);
            }
            other => panic!("expected agent dashboard, got {other:?}"),
        }

        match service.dashboard(&farmer).await.unwrap() {
            Dashboard::Farmer(summary) => {
                assert_eq!(summary.upcoming_collections, 1);
                assert_eq!(summary.stats.total_collections, 1);
                let contact = summary.agent.unwrap();
                assert_eq!(contact.full_name, "Otieno");
            }
            other => panic!("expected farmer dashboard, got {other:?}"),
        }
    }

    // =========================================================================
    // Live views
    // =========================================================================

    #[tokio::test]
    async fn live_stats_follow_recorded_collections() {
        let (service, _dir) = setup();
        let service = Arc::new(service);
        let (agent, farmer) = roster(&service).await;

        let mut view = crate::live::watch_stats(Arc::clone(&service), farmer.clone());
        let initial = tokio::time::timeout(std::time::Duration::from_secs(5), view.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(initial.total_collections, 0);

        service
            .schedule_collection(&agent, schedule_request(&farmer, Some(9.0)))
            .await
            .unwrap();

        let updated = tokio::time::timeout(std::time::Duration::from_secs(5), view.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.total_collections, 1);
        assert!((updated.total_liters - 9.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn live_roster_tracks_unread() {
        let (service, _dir) = setup();
        let service = Arc::new(service);
        let (agent, farmer) = roster(&service).await;

        let mut view = crate::live::watch_roster(Arc::clone(&service), agent.clone());
        let initial = tokio::time::timeout(std::time::Duration::from_secs(5), view.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(initial[0].unread_count, 0);

        service
            .send_message(&farmer, message(&agent, "Ping"))
            .await
            .unwrap();

        let updated = tokio::time::timeout(std::time::Duration::from_secs(5), view.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated[0].unread_count, 1);
    }
}

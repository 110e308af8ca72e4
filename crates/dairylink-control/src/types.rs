//! Request and response types for coordination operations.
//!
//! These types define the API contracts for the roster, collections,
//! messaging, announcements and dashboards.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dairylink_core::{ProfileId, Role};
use dairylink_store::{Announcement, ChangeFeed, Collection, Farmer, MessageType};
use serde::{Deserialize, Serialize};

use crate::stats::CollectionStats;

/// Request to create or refresh the caller's own profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncProfileRequest {
    /// Display name.
    pub full_name: String,
    /// Role chosen at sign-up. Must match any existing profile.
    pub role: Role,
    /// Contact phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Location.
    #[serde(default)]
    pub location: Option<String>,
}

/// Request to put a farmer on the caller's roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddFarmerRequest {
    /// A farmer who already signed up.
    Existing {
        /// The farmer's profile.
        profile_id: ProfileId,
    },
    /// A farmer without an account.
    New {
        /// Display name.
        full_name: String,
        /// Contact phone number.
        phone_number: String,
        /// Farm location.
        location: String,
    },
}

/// Request to book a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCollectionRequest {
    /// Farmer on the caller's roster.
    pub farmer_id: ProfileId,
    /// Pickup date.
    pub scheduled_date: NaiveDate,
    /// Pickup time of day.
    pub scheduled_time: NaiveTime,
    /// Expected quantity in liters.
    #[serde(default)]
    pub expected_quantity: Option<f64>,
    /// Free-form instructions.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to record the measured quantity of a collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecordCollectionRequest {
    /// Actual quantity in liters.
    pub quantity_liters: f64,
}

/// Request to send a direct message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Addressee.
    pub receiver_id: ProfileId,
    /// Message body.
    pub content: String,
    /// Defaults to an inquiry.
    #[serde(default)]
    pub message_type: MessageType,
}

/// Request to post an announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnnouncementRequest {
    /// Headline.
    pub title: String,
    /// Body.
    pub content: String,
    /// Optional expiry, must be in the future.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A roster row with the number of unread messages from that farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerWithUnread {
    /// The roster row.
    #[serde(flatten)]
    pub farmer: Farmer,
    /// Unread messages from this farmer to the viewing agent.
    pub unread_count: u32,
}

/// A collection joined with the farmer's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionWithFarmer {
    /// The collection.
    #[serde(flatten)]
    pub collection: Collection,
    /// The farmer's name.
    pub farmer_name: String,
}

/// An agent's collections, each list ordered by pickup time ascending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentCollections {
    /// Booked for a future slot.
    pub upcoming: Vec<CollectionWithFarmer>,
    /// Booked for a slot that has passed without a recorded quantity.
    pub overdue: Vec<CollectionWithFarmer>,
    /// Recorded.
    pub completed: Vec<CollectionWithFarmer>,
    /// Called off.
    pub cancelled: Vec<CollectionWithFarmer>,
}

/// A farmer's collection history, each list ordered newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FarmerCollections {
    /// Booked for a future slot.
    pub upcoming: Vec<Collection>,
    /// Completed, or whose slot has passed.
    pub past: Vec<Collection>,
}

/// An announcement with the viewer's read state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementView {
    /// The announcement.
    #[serde(flatten)]
    pub announcement: Announcement,
    /// When the viewer first read it.
    pub read_at: Option<DateTime<Utc>>,
}

/// How a farmer reaches their agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContact {
    /// The agent's profile.
    pub profile_id: ProfileId,
    /// Display name.
    pub full_name: String,
    /// Phone number, if the agent shared one.
    pub phone_number: Option<String>,
}

/// Summary shown to a farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerDashboard {
    /// Statistics over the farmer's collections.
    pub stats: CollectionStats,
    /// Collections booked for today or later.
    pub upcoming_collections: u32,
    /// The agent the farmer is assigned to.
    pub agent: Option<AgentContact>,
}

/// Summary shown to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDashboard {
    /// Farmers on the roster.
    pub roster_size: u32,
    /// Collections the agent has scheduled, in any status.
    pub total_collections: u32,
    /// Collections booked for today or later.
    pub upcoming_collections: u32,
    /// Messages sent or received.
    pub total_messages: u32,
}

/// Role-specific dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    /// Farmer view.
    Farmer(FarmerDashboard),
    /// Agent view.
    Agent(AgentDashboard),
}

/// Configuration for the coordination service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum length of a message body, in characters.
    pub max_message_chars: usize,
    /// Maximum length of collection notes, in characters.
    pub max_notes_chars: usize,
    /// Maximum length of an announcement title, in characters.
    pub max_title_chars: usize,
    /// Events buffered per change subscriber.
    pub change_feed_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 2000,
            max_notes_chars: 1000,
            max_title_chars: 200,
            change_feed_capacity: ChangeFeed::DEFAULT_CAPACITY,
        }
    }
}

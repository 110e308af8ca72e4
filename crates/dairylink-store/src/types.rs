//! Domain types stored in the database.
//!
//! These types represent the persisted state of profiles, the farmer
//! roster, collections, messages and announcements.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dairylink_core::{AnnouncementId, CollectionId, MessageId, ProfileId, Role};
use serde::{Deserialize, Serialize};

/// A user profile, synced from the identity provider at sign-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier, equal to the token subject.
    pub profile_id: ProfileId,
    /// Display name.
    pub full_name: String,
    /// Farmer or agent. Never changes.
    pub role: Role,
    /// Contact phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Village, district or farm location.
    #[serde(default)]
    pub location: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A farmer on an agent's roster.
///
/// The row only exists once an agent has added the farmer, so
/// `created_by` is always set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farmer {
    /// The farmer's profile ID, or a fresh ID for farmers without an account.
    pub farmer_id: ProfileId,
    /// Display name.
    pub full_name: String,
    /// Contact phone number.
    pub phone_number: String,
    /// Farm location.
    pub location: String,
    /// The agent who owns this roster row.
    pub created_by: ProfileId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A scheduled, completed or cancelled milk pickup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Unique identifier.
    pub collection_id: CollectionId,
    /// Farmer the milk is collected from.
    pub farmer_id: ProfileId,
    /// Agent who scheduled the collection.
    pub agent_id: ProfileId,
    /// Pickup date.
    pub scheduled_date: NaiveDate,
    /// Pickup time of day.
    pub scheduled_time: NaiveTime,
    /// Expected quantity while scheduled, measured quantity once completed.
    #[serde(default)]
    pub quantity_liters: Option<f64>,
    /// Free-form instructions.
    #[serde(default)]
    pub notes: Option<String>,
    /// Lifecycle status.
    pub status: CollectionStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// When the actual quantity was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Collection {
    /// The scheduled pickup as a single local date-time.
    #[must_use]
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.scheduled_date.and_time(self.scheduled_time)
    }
}

/// Lifecycle states for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CollectionStatus {
    /// Booked, possibly with an expected quantity.
    Scheduled = 1,
    /// The actual quantity has been recorded.
    Completed = 2,
    /// Called off before pickup.
    Cancelled = 3,
}

impl CollectionStatus {
    /// Convert the status to its numeric representation.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to convert a numeric value to a `CollectionStatus`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Scheduled),
            2 => Some(Self::Completed),
            3 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A direct message between a farmer and an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub message_id: MessageId,
    /// Author.
    pub sender_id: ProfileId,
    /// Addressee.
    pub receiver_id: ProfileId,
    /// Message body.
    pub content: String,
    /// What kind of message this is.
    pub message_type: MessageType,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the receiver read the message.
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

/// Kind of a direct message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// A question, the default for new messages.
    #[default]
    Inquiry,
    /// A reply to an inquiry.
    Response,
    /// A broadcast copied into a direct thread.
    Announcement,
}

/// A broadcast posted by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    /// Unique identifier.
    pub announcement_id: AnnouncementId,
    /// Author.
    pub agent_id: ProfileId,
    /// Headline.
    pub title: String,
    /// Body.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// After this instant the announcement is no longer listed.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Announcement {
    /// Returns true if the announcement has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Per-user read state of an announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementRecipient {
    /// The announcement.
    pub announcement_id: AnnouncementId,
    /// The reader.
    pub user_id: ProfileId,
    /// When the user first read it.
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_numeric_roundtrip() {
        for status in [
            CollectionStatus::Scheduled,
            CollectionStatus::Completed,
            CollectionStatus::Cancelled,
        ] {
            assert_eq!(CollectionStatus::from_u8(status.as_u8()), Some(status));
        }
        assert_eq!(CollectionStatus::from_u8(0), None);
    }

    #[test]
    fn announcement_expiry() {
        let now = Utc::now();
        let mut announcement = Announcement {
            announcement_id: AnnouncementId::generate(),
            agent_id: ProfileId::generate(),
            title: "Price update".to_string(),
            content: "New rates from Monday".to_string(),
            created_at: now,
            expires_at: None,
        };
        assert!(!announcement.is_expired(now));

        announcement.expires_at = Some(now - chrono::Duration::minutes(1));
        assert!(announcement.is_expired(now));

        announcement.expires_at = Some(now + chrono::Duration::minutes(1));
        assert!(!announcement.is_expired(now));
    }
}

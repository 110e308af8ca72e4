//! Row-level change notifications.
//!
//! Every write through a [`Store`](crate::Store) publishes a [`ChangeEvent`]
//! on the store's [`ChangeFeed`]. Consumers subscribe with a
//! [`ChangeFilter`] naming the tables they watch and, optionally, the
//! profile whose rows they care about. Notifications are refresh triggers
//! only: they carry the row ID, never the row itself.
//!
//! The feed is a bounded broadcast channel. A subscriber that falls more
//! than `capacity` events behind receives [`Notification::Missed`] instead
//! of the dropped events and should refetch everything it shows.

use dairylink_core::ProfileId;
use serde::Serialize;
use tokio::sync::broadcast;

/// The record kinds that publish change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// User profiles.
    Profiles,
    /// Farmer roster rows.
    Farmers,
    /// Milk collections.
    Collections,
    /// Direct messages.
    Messages,
    /// Agent announcements.
    Announcements,
    /// Per-user announcement read state.
    AnnouncementRecipients,
}

/// What happened to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The row did not exist before the write.
    Insert,
    /// An existing row was overwritten.
    Update,
    /// The row was removed.
    Delete,
}

/// A single row-level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// Table the row lives in.
    pub table: Table,
    /// Insert, update or delete.
    pub kind: ChangeKind,
    /// Primary key of the row, as a string.
    pub row_id: String,
    /// Profiles the row concerns. Empty for broadcast rows such as
    /// announcements, which concern everybody.
    pub owners: Vec<ProfileId>,
}

impl ChangeEvent {
    /// Create a new change event.
    #[must_use]
    pub fn new(
        table: Table,
        kind: ChangeKind,
        row_id: impl ToString,
        owners: Vec<ProfileId>,
    ) -> Self {
        Self {
            table,
            kind,
            row_id: row_id.to_string(),
            owners,
        }
    }

    /// Returns true if the change is relevant to `profile_id`.
    #[must_use]
    pub fn concerns(&self, profile_id: &ProfileId) -> bool {
        self.owners.is_empty() || self.owners.contains(profile_id)
    }
}

/// Selects which change events a subscription receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeFilter {
    tables: Vec<Table>,
    concerning: Option<ProfileId>,
}

impl ChangeFilter {
    /// A filter that matches every change.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter that matches changes to the given tables.
    #[must_use]
    pub fn tables(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
            concerning: None,
        }
    }

    /// Restrict the filter to rows concerning one profile.
    #[must_use]
    pub fn concerning(mut self, profile_id: ProfileId) -> Self {
        self.concerning = Some(profile_id);
        self
    }

    /// Returns true if `event` passes the filter.
    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        let table_ok = self.tables.is_empty() || self.tables.contains(&event.table);
        let owner_ok = self
            .concerning
            .as_ref()
            .map_or(true, |profile_id| event.concerns(profile_id));
        table_ok && owner_ok
    }
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A matching row changed.
    Changed(ChangeEvent),
    /// The subscriber fell behind and this many events were dropped.
    Missed {
        /// Number of dropped events (matching or not).
        count: u64,
    },
}

/// Broadcast hub for change events.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    /// Default number of buffered events per subscriber.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Create a feed buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        let table = event.table;
        let kind = event.kind;
        let delivered = self.tx.send(event).unwrap_or(0);
        tracing::trace!(?table, ?kind, delivered, "Published change");
    }

    /// Subscribe to events passing `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// A filtered view onto a [`ChangeFeed`].
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
}

impl Subscription {
    /// Wait for the next matching notification.
    ///
    /// Returns `None` once the feed has been dropped.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(Notification::Changed(event));
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    tracing::debug!(count, "Change subscriber lagged");
                    return Some(Notification::Missed { count });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// The filter this subscription applies.
    #[must_use]
    pub const fn filter(&self) -> &ChangeFilter {
        &self.filter
    }
}

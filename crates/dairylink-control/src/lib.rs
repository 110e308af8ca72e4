//! Coordination logic for dairylink.
//!
//! This crate holds the business rules that sit between the HTTP gateway and
//! the store: who may see and change which rows, the collection state
//! machine, collection statistics, unread counts, and views that refresh
//! themselves when the underlying rows change.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Gateway (HTTP/WS)                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ Viewer
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CoordinatorService                       │
//! │  ┌──────────┐ ┌─────────────┐ ┌──────────┐ ┌────────────┐   │
//! │  │  Roster  │ │ Collections │ │ Messages │ │ Announce-  │   │
//! │  │          │ │ + Lifecycle │ │ + Unread │ │ ments      │   │
//! │  └──────────┘ └─────────────┘ └──────────┘ └────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                              ▲
//!                 ▼                              │ ChangeFeed
//!          ┌──────────────┐              ┌──────────────┐
//!          │    Store     │─────────────▶│   LiveView   │
//!          │  (RocksDB)   │              │  (watch rx)  │
//!          └──────────────┘              └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use dairylink_control::{Coordinator, CoordinatorService, ProfileId, Role, SyncProfileRequest};
//! use dairylink_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/dairylink")?);
//! let coordinator = CoordinatorService::with_defaults(store);
//!
//! let profile_id = ProfileId::generate();
//! coordinator
//!     .sync_profile(
//!         &profile_id,
//!         SyncProfileRequest {
//!             full_name: "Wanjiru".to_string(),
//!             role: Role::Farmer,
//!             phone_number: None,
//!             location: None,
//!         },
//!     )
//!     .await?;
//!
//! let viewer = coordinator.resolve_viewer(&profile_id).await?;
//! let stats = coordinator.my_stats(&viewer).await?;
//! println!("{} liters over {} collections", stats.total_liters, stats.total_collections);
//! # Ok(())
//! # }
//! ```
//!
//! # State Machine
//!
//! Collections start `Scheduled` and move exactly once:
//!
//! - `Scheduled` → `Completed` (quantity recorded)
//! - `Scheduled` → `Cancelled`
//!
//! See the [`lifecycle`] module for transition validation helpers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod lifecycle;
pub mod live;
pub mod service;
pub mod stats;
pub mod types;
pub mod unread;
pub mod viewer;

pub use error::{ControlError, Result};
pub use live::{watch_roster, watch_stats, LiveView};
pub use service::{Coordinator, CoordinatorService};
pub use stats::CollectionStats;
pub use types::{
    AddFarmerRequest, AgentCollections, AgentContact, AgentDashboard, AnnouncementView,
    CollectionWithFarmer, CreateAnnouncementRequest, Dashboard, FarmerCollections,
    FarmerDashboard, FarmerWithUnread, RecordCollectionRequest, ScheduleCollectionRequest,
    SendMessageRequest, ServiceConfig, SyncProfileRequest,
};
pub use viewer::Viewer;

// Re-export commonly used types from dependencies for convenience
pub use dairylink_core::{AnnouncementId, CollectionId, MessageId, ProfileId, Role};
pub use dairylink_store::{
    Announcement, AnnouncementRecipient, ChangeEvent, ChangeFilter, Collection,
    CollectionStatus, Farmer, Message, MessageType, Notification, Profile, Subscription, Table,
};

//! Per-farmer collection statistics.
//!
//! Cancelled collections are ignored. Completed and scheduled collections
//! both count, scheduled ones contributing their expected quantity. A
//! missing quantity adds nothing to the totals and is left out of the
//! average.

use dairylink_store::{Collection, CollectionStatus};
use serde::{Deserialize, Serialize};

/// Aggregated statistics for one farmer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Completed plus expected liters.
    pub total_liters: f64,
    /// Mean over collections that carry a quantity, 0 when none do.
    pub average_liters: f64,
    /// Completed plus scheduled collections.
    pub total_collections: u32,
    /// Collections with a recorded quantity.
    pub completed_collections: u32,
    /// Collections still booked.
    pub scheduled_collections: u32,
    /// Liters actually collected.
    pub completed_liters: f64,
    /// Liters expected from booked collections.
    pub expected_liters: f64,
}

impl CollectionStats {
    /// Aggregate a farmer's collections.
    #[must_use]
    pub fn from_collections<'a>(collections: impl IntoIterator<Item = &'a Collection>) -> Self {
        let mut stats = Self::default();
        let mut with_quantity = 0u32;

        for collection in collections {
            let quantity = collection.quantity_liters;
            match collection.status {
                CollectionStatus::Completed => {
                    stats.completed_collections += 1;
                    stats.completed_liters += quantity.unwrap_or(0.0);
                }
                CollectionStatus::Scheduled => {
                    stats.scheduled_collections += 1;
                    stats.expected_liters += quantity.unwrap_or(0.0);
                }
                CollectionStatus::Cancelled => continue,
            }
            if quantity.is_some() {
                with_quantity += 1;
            }
        }

        stats.total_collections = stats.completed_collections + stats.scheduled_collections;
        stats.total_liters = stats.completed_liters + stats.expected_liters;
        stats.average_liters = if with_quantity == 0 {
            0.0
        } else {
            stats.total_liters / f64::from(with_quantity)
        };
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use dairylink_core::{CollectionId, ProfileId};

    fn collection(status: CollectionStatus, quantity: Option<f64>) -> Collection {
        Collection {
            collection_id: CollectionId::generate(),
            farmer_id: ProfileId::generate(),
            agent_id: ProfileId::generate(),
            scheduled_date: NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            quantity_liters: quantity,
            notes: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn completed_and_expected_are_merged() {
        let collections = [
            collection(CollectionStatus::Completed, Some(10.0)),
            collection(CollectionStatus::Completed, Some(15.0)),
            collection(CollectionStatus::Scheduled, Some(5.0)),
        ];

        let stats = CollectionStats::from_collections(&collections);
        assert!((stats.total_liters - 30.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_collections, 3);
        assert!((stats.average_liters - 10.0).abs() < f64::EPSILON);
        assert!((stats.completed_liters - 25.0).abs() < f64::EPSILON);
        assert!((stats.expected_liters - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scheduled_without_quantity() {
        let collections = [collection(CollectionStatus::Scheduled, None)];

        let stats = CollectionStats::from_collections(&collections);
        assert_eq!(stats.total_collections, 1);
        assert!(stats.total_liters.abs() < f64::EPSILON);
        assert!(stats.average_liters.abs() < f64::EPSILON);
    }

    #[test]
    fn cancelled_is_ignored() {
        let collections = [
            collection(CollectionStatus::Cancelled, Some(100.0)),
            collection(CollectionStatus::Completed, Some(8.0)),
        ];

        let stats = CollectionStats::from_collections(&collections);
        assert_eq!(stats.total_collections, 1);
        assert!((stats.total_liters - 8.0).abs() < f64::EPSILON);
        assert!((stats.average_liters - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn null_quantities_leave_the_average() {
        let collections = [
            collection(CollectionStatus::Completed, Some(12.0)),
            collection(CollectionStatus::Scheduled, None),
            collection(CollectionStatus::Scheduled, None),
        ];

        let stats = CollectionStats::from_collections(&collections);
        assert_eq!(stats.total_collections, 3);
        assert!((stats.average_liters - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_quantity_counts_toward_average() {
        let collections = [
            collection(CollectionStatus::Completed, Some(0.0)),
            collection(CollectionStatus::Completed, Some(10.0)),
        ];

        let stats = CollectionStats::from_collections(&collections);
        assert!((stats.average_liters - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_collections() {
        let stats = CollectionStats::from_collections(std::iter::empty());
        assert_eq!(stats, CollectionStats::default());
    }
}

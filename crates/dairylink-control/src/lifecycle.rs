//! Collection lifecycle state machine.
//!
//! This module defines the valid status transitions for collections and the
//! checks applied when a collection is scheduled or recorded.
//!
//! # State Machine
//!
//! ```text
//!                 ┌─────────────┐
//!                 │  Scheduled  │
//!                 └──────┬──────┘
//!                        │
//!          (record qty)  │  (cancel)
//!            ┌───────────┴───────────┐
//!            ▼                       ▼
//!     ┌─────────────┐         ┌─────────────┐
//!     │  Completed  │         │  Cancelled  │
//!     └─────────────┘         └─────────────┘
//! ```
//!
//! Both `Completed` and `Cancelled` are terminal. Recording a collection
//! twice is rejected rather than silently overwriting the first quantity.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use dairylink_core::CollectionId;
use dairylink_store::{Collection, CollectionStatus};

use crate::error::{ControlError, Result};

/// Validates a status transition and returns the target status if valid.
///
/// # Errors
///
/// Returns `ControlError::InvalidState` if the transition is not allowed.
pub fn validate_transition(
    collection_id: &CollectionId,
    from: CollectionStatus,
    to: CollectionStatus,
) -> Result<CollectionStatus> {
    if is_valid_transition(from, to) {
        Ok(to)
    } else {
        Err(ControlError::InvalidState {
            collection_id: *collection_id,
            from,
            to,
        })
    }
}

/// Check if a status transition is valid according to the state machine.
#[must_use]
pub const fn is_valid_transition(from: CollectionStatus, to: CollectionStatus) -> bool {
    use CollectionStatus::{Cancelled, Completed, Scheduled};

    matches!((from, to), (Scheduled, Completed | Cancelled))
}

/// Returns the list of valid target statuses from the given status.
#[must_use]
pub fn valid_transitions_from(status: CollectionStatus) -> Vec<CollectionStatus> {
    use CollectionStatus::{Cancelled, Completed, Scheduled};

    match status {
        Scheduled => vec![Completed, Cancelled],
        Completed | Cancelled => vec![],
    }
}

/// Returns true if no further transitions are possible.
#[must_use]
pub const fn is_terminal(status: CollectionStatus) -> bool {
    matches!(
        status,
        CollectionStatus::Completed | CollectionStatus::Cancelled
    )
}

/// Returns true if the collection is still booked for a future slot.
#[must_use]
pub fn is_upcoming(collection: &Collection, now: NaiveDateTime) -> bool {
    collection.status == CollectionStatus::Scheduled && collection.scheduled_at() > now
}

/// Returns true if the collection is booked for today or a later day.
///
/// Dashboards count by date only, so a pickup earlier today still counts.
#[must_use]
pub fn is_scheduled_from(collection: &Collection, today: NaiveDate) -> bool {
    collection.status == CollectionStatus::Scheduled && collection.scheduled_date >= today
}

/// Reject pickup slots that already lie in the past.
///
/// The date may not be before `now`'s date; on the current date the time
/// may not have passed.
///
/// # Errors
///
/// Returns `ControlError::Validation` for a past slot.
pub fn validate_schedule(date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> Result<()> {
    if date < now.date() {
        return Err(ControlError::Validation(format!(
            "scheduled date {date} is in the past"
        )));
    }
    if date == now.date() && time < now.time() {
        return Err(ControlError::Validation(format!(
            "scheduled time {time} has already passed today"
        )));
    }
    Ok(())
}

/// Quantities must be finite and non-negative. There is no upper bound.
///
/// # Errors
///
/// Returns `ControlError::Validation` otherwise.
pub fn validate_quantity(liters: f64) -> Result<f64> {
    if !liters.is_finite() {
        return Err(ControlError::Validation(
            "quantity must be a finite number".to_string(),
        ));
    }
    if liters < 0.0 {
        return Err(ControlError::Validation(
            "quantity must not be negative".to_string(),
        ));
    }
    Ok(liters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dairylink_core::ProfileId;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_time(NaiveTime::parse_from_str(time, "%H:%M").unwrap())
    }

    fn collection(status: CollectionStatus, scheduled: NaiveDateTime) -> Collection {
        Collection {
            collection_id: CollectionId::generate(),
            farmer_id: ProfileId::generate(),
            agent_id: ProfileId::generate(),
            scheduled_date: scheduled.date(),
            scheduled_time: scheduled.time(),
            quantity_liters: None,
            notes: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn valid_transitions() {
        use CollectionStatus::*;

        assert!(is_valid_transition(Scheduled, Completed));
        assert!(is_valid_transition(Scheduled, Cancelled));
    }

    #[test]
    fn invalid_transitions() {
        use CollectionStatus::*;

        // Recording twice
        assert!(!is_valid_transition(Completed, Completed));
        assert!(!is_valid_transition(Cancelled, Completed));
        assert!(!is_valid_transition(Completed, Cancelled));
        assert!(!is_valid_transition(Completed, Scheduled));
        assert!(!is_valid_transition(Scheduled, Scheduled));
    }

    #[test]
    fn validate_transition_err() {
        let collection_id = CollectionId::generate();
        let result = validate_transition(
            &collection_id,
            CollectionStatus::Completed,
            CollectionStatus::Completed,
        );

        match result {
            Err(ControlError::InvalidState { from, to, .. }) => {
                assert_eq!(from, CollectionStatus::Completed);
                assert_eq!(to, CollectionStatus::Completed);
            }
            other => panic!("expected InvalidState error, got {other:?}"),
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(is_terminal(CollectionStatus::Completed));
        assert!(is_terminal(CollectionStatus::Cancelled));
        assert!(!is_terminal(CollectionStatus::Scheduled));
        assert!(valid_transitions_from(CollectionStatus::Completed).is_empty());
        assert_eq!(valid_transitions_from(CollectionStatus::Scheduled).len(), 2);
    }

    #[test]
    fn schedule_in_the_past_rejected() {
        let now = at("2030-06-15", "10:00");

        assert!(validate_schedule(
            NaiveDate::from_ymd_opt(2030, 6, 14).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            now
        )
        .is_err());
        assert!(validate_schedule(
            NaiveDate::from_ymd_opt(2030, 6, 15).unwrap(),
            NaiveTime::from_hms_opt(9, 59, 0).unwrap(),
            now
        )
        .is_err());
    }

    #[test]
    fn schedule_today_or_later_accepted() {
        let now = at("2030-06-15", "10:00");

        assert!(validate_schedule(
            NaiveDate::from_ymd_opt(2030, 6, 15).unwrap(),
            NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            now
        )
        .is_ok());
        // Early time on a future day is fine
        assert!(validate_schedule(
            NaiveDate::from_ymd_opt(2030, 6, 16).unwrap(),
            NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            now
        )
        .is_ok());
    }

    #[test]
    fn quantity_rules() {
        assert_eq!(validate_quantity(0.0).unwrap(), 0.0);
        assert_eq!(validate_quantity(12_345.5).unwrap(), 12_345.5);
        assert!(validate_quantity(-0.1).is_err());
        assert!(validate_quantity(f64::NAN).is_err());
        assert!(validate_quantity(f64::INFINITY).is_err());
    }

    #[test]
    fn upcoming_requires_scheduled_future_slot() {
        let now = at("2030-06-15", "10:00");

        assert!(is_upcoming(
            &collection(CollectionStatus::Scheduled, at("2030-06-15", "11:00")),
            now
        ));
        assert!(!is_upcoming(
            &collection(CollectionStatus::Scheduled, at("2030-06-15", "09:00")),
            now
        ));
        assert!(!is_upcoming(
            &collection(CollectionStatus::Cancelled, at("2030-06-20", "09:00")),
            now
        ));
    }

    #[test]
    fn scheduled_from_counts_whole_day() {
        let today = NaiveDate::from_ymd_opt(2030, 6, 15).unwrap();

        assert!(is_scheduled_from(
            &collection(CollectionStatus::Scheduled, at("2030-06-15", "06:00")),
            today
        ));
        assert!(!is_scheduled_from(
            &collection(CollectionStatus::Scheduled, at("2030-06-14", "18:00")),
            today
        ));
        assert!(!is_scheduled_from(
            &collection(CollectionStatus::Completed, at("2030-06-16", "06:00")),
            today
        ));
    }
}

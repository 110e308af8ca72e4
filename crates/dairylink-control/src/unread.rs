//! Unread-message counting for the agent's roster.

use std::collections::HashMap;

use dairylink_core::ProfileId;
use dairylink_store::{Farmer, Message};

use crate::types::FarmerWithUnread;

/// Count unread messages per sender.
///
/// Messages that have been read are skipped, so callers may pass any
/// message list addressed to the viewer.
#[must_use]
pub fn count_by_sender<'a>(messages: impl IntoIterator<Item = &'a Message>) -> HashMap<ProfileId, u32> {
    let mut counts = HashMap::new();
    for message in messages {
        if message.read_at.is_none() {
            *counts.entry(message.sender_id).or_insert(0) += 1;
        }
    }
    counts
}

/// Attach unread counts to roster rows. Farmers with nothing unread get 0.
#[must_use]
pub fn annotate(farmers: Vec<Farmer>, counts: &HashMap<ProfileId, u32>) -> Vec<FarmerWithUnread> {
    farmers
        .into_iter()
        .map(|farmer| {
            let unread_count = counts.get(&farmer.farmer_id).copied().unwrap_or(0);
            FarmerWithUnread {
                farmer,
                unread_count,
            }
        })
        .collect()
}

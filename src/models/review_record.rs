//! Immutable ledger entry written once per grade application.
use super::{Grade, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub item_id: ItemId,
    pub timestamp: DateTime<Utc>,
    pub grade: Grade,
    pub ease_factor_after: f64,
    pub interval_days_after: f64,
}

impl ReviewRecord {
    /// `review_number` is the item's review count after this review. The
    /// record id is derived from it, so replaying a grade yields the same record.
    pub fn new(
        item_id: ItemId,
        review_number: u32,
        grade: Grade,
        ease_factor_after: f64,
        interval_days_after: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::derive_id(item_id, review_number, timestamp),
            item_id,
            timestamp,
            grade,
            ease_factor_after,
            interval_days_after,
        }
    }

    /// Name-based (v5) id under the item's UUID.
    pub fn derive_id(item_id: ItemId, review_number: u32, timestamp: DateTime<Utc>) -> Uuid {
        let mut name = [0u8; 12];
        name[..4].copy_from_slice(&review_number.to_be_bytes());
        name[4..].copy_from_slice(&timestamp.timestamp_millis().to_be_bytes());
        Uuid::new_v5(item_id.as_uuid(), &name)
    }
}

//! Repair of items loaded from storage.
//!
//! Rows written by older versions, or only partially initialized, may lack a
//! due date, carry an uninitialized ease of zero, or hold out-of-range
//! values. `normalize` fills the gaps and clamps what it can; it never fails.

use super::{SchedulerConfig, days, offset};
use crate::models::{Item, ItemId, LearningState};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

/// An item row as persisted, before any repair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredItem {
    pub id: ItemId,
    pub state: Option<String>,
    pub step_index: Option<i64>,
    pub ease_factor: Option<f64>,
    pub interval_days: Option<f64>,
    pub streak: Option<i64>,
    pub due_at: Option<DateTime<Utc>>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Review date column written by versions that predate `last_reviewed_at`.
    pub last_review_date: Option<DateTime<Utc>>,
    pub review_count: Option<i64>,
}

impl From<&Item> for StoredItem {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            state: Some(item.state.as_str().to_string()),
            step_index: Some(i64::from(item.step_index)),
            ease_factor: Some(item.ease_factor),
            interval_days: Some(item.interval_days),
            streak: Some(i64::from(item.streak)),
            due_at: Some(item.due_at),
            last_reviewed_at: item.last_reviewed_at,
            last_review_date: None,
            review_count: Some(i64::from(item.review_count)),
        }
    }
}

fn to_u32(value: Option<i64>) -> u32 {
    value.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32
}

pub fn normalize(stored: StoredItem, now: DateTime<Utc>, config: &SchedulerConfig) -> Item {
    let id = stored.id;
    let state = LearningState::from_stored(stored.state.as_deref());

    let mut ease_factor = match stored.ease_factor.filter(|e| e.is_finite()) {
        None => config.initial_ease,
        Some(e) if e == 0.0 => config.initial_ease,
        Some(e) => config.clamp_ease(e),
    };
    if stored.ease_factor != Some(ease_factor) {
        warn!(item = %id, from = ?stored.ease_factor, to = ease_factor, "repaired ease factor");
    }

    let mut interval_days = stored
        .interval_days
        .filter(|i| i.is_finite())
        .map(|i| config.clamp_interval(i))
        .unwrap_or(0.0);
    if stored.interval_days != Some(interval_days) {
        warn!(item = %id, from = ?stored.interval_days, to = interval_days, "repaired interval");
    }

    let last_reviewed_at = stored.last_reviewed_at.or(stored.last_review_date);

    let due_at = match (stored.due_at, last_reviewed_at) {
        (Some(due), _) => due,
        (None, Some(last)) => {
            if now - last > Duration::days(i64::from(config.lapse_threshold_days)) {
                info!(item = %id, last_reviewed = %last, "lapsed item reset");
                interval_days = 0.0;
                ease_factor = config.initial_ease;
                now
            } else {
                offset(last, days(interval_days))
            }
        }
        (None, None) => now,
    };

    let mut step_index = to_u32(stored.step_index);
    if let Some(steps) = config.steps_for(state) {
        let last = (steps.len() - 1) as u32;
        if step_index > last {
            warn!(item = %id, from = step_index, to = last, "repaired step index");
            step_index = last;
        }
    }

    Item {
        id,
        state,
        step_index,
        ease_factor,
        interval_days,
        streak: to_u32(stored.streak),
        due_at,
        last_reviewed_at,
        review_count: to_u32(stored.review_count),
    }
}

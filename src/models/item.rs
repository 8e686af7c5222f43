//! Scheduling state of a single learnable item.
//!
//! An `Item` is a plain value: the scheduler takes one and returns a new one,
//! it never mutates a persisted object in place.

use super::LearningState;
use crate::error::SchedulerError;
use crate::scheduler::SchedulerConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, immutable identifier of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub state: LearningState,
    /// Position in the active step table (Learning/Relearning only).
    pub step_index: u32,
    pub ease_factor: f64,
    /// Last scheduled gap between reviews, in days.
    pub interval_days: f64,
    /// Consecutive successful reviews.
    pub streak: u32,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub review_count: u32,
}

impl Item {
    /// A fresh item, immediately due.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_id(ItemId::new(), now)
    }

    pub fn with_id(id: ItemId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            state: LearningState::New,
            step_index: 0,
            ease_factor: SchedulerConfig::DEFAULT_INITIAL_EASE,
            interval_days: 0.0,
            streak: 0,
            due_at: now,
            last_reviewed_at: None,
            review_count: 0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// Forgets all scheduling progress. The review count is kept since it
    /// counts grade applications, not progress.
    pub fn reset(&self, now: DateTime<Utc>, config: &SchedulerConfig) -> Self {
        Self {
            id: self.id,
            state: LearningState::New,
            step_index: 0,
            ease_factor: config.initial_ease,
            interval_days: 0.0,
            streak: 0,
            due_at: now,
            last_reviewed_at: None,
            review_count: self.review_count,
        }
    }

    /// Verifies the invariants the scheduler relies on.
    pub fn check_invariants(&self, config: &SchedulerConfig) -> Result<(), SchedulerError> {
        let invalid = |reason: String| SchedulerError::InvalidState {
            item_id: self.id,
            reason,
        };

        if !self.ease_factor.is_finite()
            || self.ease_factor < config.min_ease
            || self.ease_factor > config.max_ease
        {
            return Err(invalid(format!(
                "ease factor {} outside [{}, {}]",
                self.ease_factor, config.min_ease, config.max_ease
            )));
        }

        if !self.interval_days.is_finite() || self.interval_days < 0.0 {
            return Err(invalid(format!(
                "interval {} days is negative or not finite",
                self.interval_days
            )));
        }

        if let Some(steps) = config.steps_for(self.state) {
            if self.step_index as usize >= steps.len() {
                return Err(invalid(format!(
                    "step index {} out of bounds for {} ({} steps)",
                    self.step_index,
                    self.state,
                    steps.len()
                )));
            }
        }

        Ok(())
    }
}

//! Scheduling policy constants, gathered in one swappable structure.

use crate::error::ConfigError;
use crate::models::{Grade, LearningState};
use serde::{Deserialize, Serialize};

/// Ease adjustment applied per grade while an item is in `Reviewing`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EaseDeltas {
    pub again: f64,
    pub hard: f64,
    pub good: f64,
    pub easy: f64,
}

impl Default for EaseDeltas {
    fn default() -> Self {
        Self {
            again: -0.2,
            hard: -0.15,
            good: 0.0,
            easy: 0.15,
        }
    }
}

/// Every constant the state machine reads. Swapping this structure swaps
/// the scheduling policy without touching transition logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Learning step delays, in minutes.
    pub learning_steps: Vec<u32>,
    /// Relearning step delays, in minutes.
    pub relearning_steps: Vec<u32>,
    pub min_ease: f64,
    pub max_ease: f64,
    pub initial_ease: f64,
    pub ease_deltas: EaseDeltas,
    /// Lower bound of the multiplicative jitter applied to day intervals.
    pub jitter_min: f64,
    /// Upper bound of the multiplicative jitter applied to day intervals.
    pub jitter_max: f64,
    /// Items with no due date last reviewed longer ago than this are
    /// treated as forgotten.
    pub lapse_threshold_days: u32,
    /// Interval after completing the learning steps.
    pub graduating_interval_days: f64,
    /// Interval when graduating with Easy.
    pub easy_interval_days: f64,
    /// Floor for Hard reviews and for relearning graduation.
    pub min_interval_days: f64,
    pub hard_multiplier: f64,
    pub easy_bonus: f64,
    /// Share of the previous interval kept when relearning ends with Good.
    pub relearn_good_multiplier: f64,
    /// Share of the previous interval kept when relearning ends with Easy.
    pub relearn_easy_multiplier: f64,
    pub relearn_easy_min_days: f64,
    /// Ceiling for any computed interval.
    pub max_interval_days: f64,
}

impl SchedulerConfig {
    pub const DEFAULT_INITIAL_EASE: f64 = 2.5;

    /// The step table that governs `state`, if any.
    pub fn steps_for(&self, state: LearningState) -> Option<&[u32]> {
        match state {
            LearningState::New | LearningState::Learning => Some(self.learning_steps.as_slice()),
            LearningState::Relearning => Some(self.relearning_steps.as_slice()),
            LearningState::Reviewing => None,
        }
    }

    pub fn ease_delta(&self, grade: Grade) -> f64 {
        match grade {
            Grade::Again => self.ease_deltas.again,
            Grade::Hard => self.ease_deltas.hard,
            Grade::Good => self.ease_deltas.good,
            Grade::Easy => self.ease_deltas.easy,
        }
    }

    pub fn clamp_ease(&self, ease: f64) -> f64 {
        ease.clamp(self.min_ease, self.max_ease)
    }

    pub fn clamp_interval(&self, days: f64) -> f64 {
        days.clamp(0.0, self.max_interval_days)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        for (name, steps) in [
            ("learning_steps", &self.learning_steps),
            ("relearning_steps", &self.relearning_steps),
        ] {
            if steps.is_empty() {
                return invalid(format!("{} must not be empty", name));
            }
            if steps.iter().any(|&m| m == 0) {
                return invalid(format!("{} must be positive minutes", name));
            }
        }

        if !(self.min_ease.is_finite() && self.max_ease.is_finite() && self.min_ease > 0.0) {
            return invalid("ease bounds must be positive and finite".to_string());
        }
        if self.min_ease > self.max_ease {
            return invalid(format!(
                "min_ease {} exceeds max_ease {}",
                self.min_ease, self.max_ease
            ));
        }
        if !(self.min_ease..=self.max_ease).contains(&self.initial_ease) {
            return invalid(format!(
                "initial_ease {} outside [{}, {}]",
                self.initial_ease, self.min_ease, self.max_ease
            ));
        }

        let deltas = self.ease_deltas;
        if ![deltas.again, deltas.hard, deltas.good, deltas.easy]
            .iter()
            .all(|d| d.is_finite())
        {
            return invalid("ease deltas must be finite".to_string());
        }

        if !(self.jitter_min.is_finite() && self.jitter_max.is_finite())
            || self.jitter_min <= 0.0
            || self.jitter_min > self.jitter_max
        {
            return invalid(format!(
                "jitter range [{}, {}] must satisfy 0 < min <= max",
                self.jitter_min, self.jitter_max
            ));
        }

        if self.lapse_threshold_days == 0 {
            return invalid("lapse_threshold_days must be positive".to_string());
        }

        for (name, value) in [
            ("graduating_interval_days", self.graduating_interval_days),
            ("easy_interval_days", self.easy_interval_days),
            ("min_interval_days", self.min_interval_days),
            ("hard_multiplier", self.hard_multiplier),
            ("easy_bonus", self.easy_bonus),
            ("relearn_good_multiplier", self.relearn_good_multiplier),
            ("relearn_easy_multiplier", self.relearn_easy_multiplier),
            ("relearn_easy_min_days", self.relearn_easy_min_days),
            ("max_interval_days", self.max_interval_days),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return invalid(format!("{} must be positive and finite", name));
            }
        }

        if self.max_interval_days < self.easy_interval_days.max(self.relearn_easy_min_days) {
            return invalid("max_interval_days is below the fixed intervals".to_string());
        }

        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_steps: vec![1, 10, 60, 240],
            relearning_steps: vec![10, 60],
            min_ease: 1.3,
            max_ease: 2.5,
            initial_ease: Self::DEFAULT_INITIAL_EASE,
            ease_deltas: EaseDeltas::default(),
            jitter_min: 0.95,
            jitter_max: 1.05,
            lapse_threshold_days: 14,
            graduating_interval_days: 1.0,
            easy_interval_days: 4.0,
            min_interval_days: 1.0,
            hard_multiplier: 1.2,
            easy_bonus: 1.3,
            relearn_good_multiplier: 0.5,
            relearn_easy_multiplier: 0.75,
            relearn_easy_min_days: 2.0,
            max_interval_days: 36_500.0,
        }
    }
}

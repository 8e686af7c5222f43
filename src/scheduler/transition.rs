//! Grade application: the state machine itself.

use super::{FixedJitter, JitterSource, ReviewLedger, SchedulerConfig, days, minutes, offset};
use crate::error::{ConfigError, SchedulerError};
use crate::models::{Grade, Item, LearningState, ReviewRecord};
use chrono::{DateTime, Utc};
use tracing::debug;

/// What a grade would do to an item, ignoring jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct GradePreview {
    pub grade: Grade,
    pub state: LearningState,
    pub interval_days: f64,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Applies `grade` to `item` at `now`.
    ///
    /// Returns the updated item and the ledger record describing the review.
    /// Total over every (state, grade) pair; the only error is an input item
    /// whose invariants are already broken.
    pub fn apply_grade(
        &self,
        item: &Item,
        grade: Grade,
        now: DateTime<Utc>,
        jitter: &mut dyn JitterSource,
    ) -> Result<(Item, ReviewRecord), SchedulerError> {
        item.check_invariants(&self.config)?;

        let mut next = item.clone();
        match item.state {
            LearningState::New | LearningState::Learning => self.learning(&mut next, grade, now),
            LearningState::Reviewing => self.reviewing(&mut next, grade, now, jitter),
            LearningState::Relearning => self.relearning(&mut next, grade, now, jitter),
        }
        next.last_reviewed_at = Some(now);
        next.review_count = next.review_count.saturating_add(1);

        debug!(
            item = %item.id,
            %grade,
            from = %item.state,
            to = %next.state,
            interval_days = next.interval_days,
            ease = next.ease_factor,
            "grade applied"
        );

        let record =
            ReviewLedger::entry(&next, grade, next.ease_factor, next.interval_days, now);
        Ok((next, record))
    }

    /// Outcome of every grade with jitter fixed at 1.0.
    pub fn preview(
        &self,
        item: &Item,
        now: DateTime<Utc>,
    ) -> Result<Vec<GradePreview>, SchedulerError> {
        Grade::ALL
            .iter()
            .map(|&grade| {
                let (next, _) = self.apply_grade(item, grade, now, &mut FixedJitter(1.0))?;
                Ok(GradePreview {
                    grade,
                    state: next.state,
                    interval_days: next.interval_days,
                    due_at: next.due_at,
                })
            })
            .collect()
    }

    fn learning(&self, item: &mut Item, grade: Grade, now: DateTime<Utc>) {
        let steps = &self.config.learning_steps;
        match grade {
            Grade::Again => {
                item.state = LearningState::Learning;
                item.step_index = 0;
                item.due_at = offset(now, minutes(steps[0]));
            }
            Grade::Hard => {
                item.state = LearningState::Learning;
                item.due_at = offset(now, minutes(steps[item.step_index as usize]));
            }
            Grade::Good => {
                item.step_index += 1;
                match steps.get(item.step_index as usize) {
                    Some(&step) => {
                        item.state = LearningState::Learning;
                        item.due_at = offset(now, minutes(step));
                    }
                    None => {
                        item.state = LearningState::Reviewing;
                        item.interval_days = self.config.graduating_interval_days;
                        item.due_at = offset(now, days(item.interval_days));
                    }
                }
            }
            Grade::Easy => {
                item.state = LearningState::Reviewing;
                item.interval_days = self.config.easy_interval_days;
                item.due_at = offset(now, days(item.interval_days));
            }
        }
    }

    fn reviewing(
        &self,
        item: &mut Item,
        grade: Grade,
        now: DateTime<Utc>,
        jitter: &mut dyn JitterSource,
    ) {
        let config = &self.config;
        item.ease_factor = config.clamp_ease(item.ease_factor + config.ease_delta(grade));

        let interval = match grade {
            Grade::Again => {
                item.state = LearningState::Relearning;
                item.step_index = 0;
                item.interval_days = 0.0;
                item.streak = 0;
                item.due_at = offset(now, minutes(config.relearning_steps[0]));
                return;
            }
            Grade::Hard => {
                item.streak = item.streak.saturating_sub(1);
                (item.interval_days * config.hard_multiplier).max(config.min_interval_days)
            }
            Grade::Good => {
                item.streak = item.streak.saturating_add(1);
                if item.interval_days == 0.0 {
                    config.graduating_interval_days
                } else {
                    item.interval_days * item.ease_factor
                }
            }
            Grade::Easy => {
                item.streak = item.streak.saturating_add(1);
                if item.interval_days == 0.0 {
                    config.easy_interval_days
                } else {
                    item.interval_days * item.ease_factor * config.easy_bonus
                }
            }
        };

        item.interval_days = config.clamp_interval(interval);
        item.due_at = self.jittered_due(now, item.interval_days, jitter);
    }

    fn relearning(
        &self,
        item: &mut Item,
        grade: Grade,
        now: DateTime<Utc>,
        jitter: &mut dyn JitterSource,
    ) {
        let config = &self.config;
        let steps = &config.relearning_steps;
        match grade {
            Grade::Again => {
                item.step_index = 0;
                item.due_at = offset(now, minutes(steps[0]));
            }
            Grade::Hard => {
                item.due_at = offset(now, minutes(steps[item.step_index as usize]));
            }
            Grade::Good => {
                item.step_index += 1;
                match steps.get(item.step_index as usize) {
                    Some(&step) => item.due_at = offset(now, minutes(step)),
                    None => {
                        item.state = LearningState::Reviewing;
                        item.interval_days = config.clamp_interval(
                            (item.interval_days * config.relearn_good_multiplier)
                                .max(config.min_interval_days),
                        );
                        item.due_at = self.jittered_due(now, item.interval_days, jitter);
                    }
                }
            }
            Grade::Easy => {
                item.state = LearningState::Reviewing;
                item.interval_days = config.clamp_interval(
                    (item.interval_days * config.relearn_easy_multiplier)
                        .max(config.relearn_easy_min_days),
                );
                item.due_at = self.jittered_due(now, item.interval_days, jitter);
            }
        }
    }

    fn jittered_due(
        &self,
        now: DateTime<Utc>,
        interval_days: f64,
        jitter: &mut dyn JitterSource,
    ) -> DateTime<Utc> {
        let factor = jitter.sample(self.config.jitter_min, self.config.jitter_max);
        offset(now, days(interval_days * factor))
    }
}

//! Four-state step/interval scheduler.
//!
//! - `New`/`Learning`: minute-scale learning steps, graduate to `Reviewing`
//! - `Reviewing`: day intervals grown by the ease factor, jittered
//! - `Relearning`: minute-scale relearning steps after a lapse
//!
//! Everything here is a pure function of its inputs: the clock and the
//! jitter source are passed in by the caller.

mod config;
mod jitter;
mod ledger;
mod normalize;
mod transition;

pub use config::{EaseDeltas, SchedulerConfig};
pub use jitter::{FixedJitter, JitterSource, RandomJitter};
pub use ledger::ReviewLedger;
pub use normalize::{StoredItem, normalize};
pub use transition::{GradePreview, Scheduler};

use chrono::{DateTime, Duration, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Converts a fractional day count into a millisecond-precision duration.
pub(crate) fn days(days: f64) -> Duration {
    Duration::milliseconds((days * MILLIS_PER_DAY).round() as i64)
}

pub(crate) fn minutes(minutes: u32) -> Duration {
    Duration::minutes(i64::from(minutes))
}

/// `base + delta`, saturating at the end of representable time.
pub(crate) fn offset(base: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    base.checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

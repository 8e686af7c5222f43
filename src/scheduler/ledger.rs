//! Append-only review ledger.
//!
//! Records are written once per grade application and never mutated. The
//! scheduler never reads them back; they exist for statistics and audit.

use crate::models::{Grade, Item, ItemId, ReviewRecord};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct ReviewLedger {
    records: Vec<ReviewRecord>,
}

impl ReviewLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the record for a review without storing it. `item` is the
    /// post-review item; its review count keys the record id.
    pub fn entry(
        item: &Item,
        grade: Grade,
        resulting_ease: f64,
        resulting_interval: f64,
        now: DateTime<Utc>,
    ) -> ReviewRecord {
        ReviewRecord::new(
            item.id,
            item.review_count,
            grade,
            resulting_ease,
            resulting_interval,
            now,
        )
    }

    /// Builds a record for a review and appends it.
    pub fn record(
        &mut self,
        item: &Item,
        grade: Grade,
        resulting_ease: f64,
        resulting_interval: f64,
        now: DateTime<Utc>,
    ) -> ReviewRecord {
        let record = Self::entry(item, grade, resulting_ease, resulting_interval, now);
        self.records.push(record.clone());
        record
    }

    /// Appends a record produced elsewhere, e.g. by
    /// [`Scheduler::apply_grade`](super::Scheduler::apply_grade).
    pub fn append(&mut self, record: ReviewRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ReviewRecord] {
        &self.records
    }

    pub fn for_item(&self, item_id: ItemId) -> impl Iterator<Item = &ReviewRecord> {
        self.records.iter().filter(move |r| r.item_id == item_id)
    }

    pub fn since(&self, cutoff: DateTime<Utc>) -> impl Iterator<Item = &ReviewRecord> {
        self.records.iter().filter(move |r| r.timestamp >= cutoff)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{FixedJitter, Scheduler};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_record_appends_and_returns() {
        let mut ledger = ReviewLedger::new();
        let item = Item::new(now());

        let record = ledger.record(&item, Grade::Good, 2.5, 1.0, now());
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.records()[0], record);
        assert_eq!(record.item_id, item.id);
        assert_eq!(record.grade, Grade::Good);
        assert_eq!(record.ease_factor_after, 2.5);
        assert_eq!(record.interval_days_after, 1.0);
        assert_eq!(record.timestamp, now());
    }

    #[test]
    fn test_record_does_not_touch_item() {
        let mut ledger = ReviewLedger::new();
        let item = Item::new(now());
        let before = item.clone();
        ledger.record(&item, Grade::Again, 1.3, 0.0, now());
        assert_eq!(item, before);
    }

    #[test]
    fn test_filters_by_item_and_time() {
        let mut ledger = ReviewLedger::new();
        let a = Item::new(now());
        let b = Item::new(now());

        ledger.record(&a, Grade::Good, 2.5, 1.0, now() - Duration::days(3));
        ledger.record(&b, Grade::Hard, 2.35, 1.2, now() - Duration::days(1));
        ledger.record(&a, Grade::Easy, 2.5, 4.0, now());

        assert_eq!(ledger.for_item(a.id).count(), 2);
        assert_eq!(ledger.for_item(b.id).count(), 1);
        assert_eq!(ledger.since(now() - Duration::days(2)).count(), 2);
        assert!(!ledger.is_empty());
    }

    #[test]
    fn test_append_scheduler_output() {
        let mut ledger = ReviewLedger::new();
        let scheduler = Scheduler::default();
        let mut item = Item::new(now());

        for grade in [Grade::Good, Grade::Again, Grade::Easy] {
            let (next, record) = scheduler
                .apply_grade(&item, grade, now(), &mut FixedJitter(1.0))
                .unwrap();
            ledger.append(record);
            item = next;
        }

        let grades: Vec<Grade> = ledger.for_item(item.id).map(|r| r.grade).collect();
        assert_eq!(grades, vec![Grade::Good, Grade::Again, Grade::Easy]);
    }
}

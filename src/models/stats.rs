//! Statistics computed from the review ledger.
use super::{Grade, ReviewRecord};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};

/// Performance of a single card over its whole history.
#[derive(Debug, Clone, PartialEq)]
pub struct CardStats {
    pub total_reviews: usize,
    pub correct_reviews: usize,
    /// Mean grade score, Again = 0 .. Easy = 3.
    pub average_grade: f64,
    pub retention: f64,
}

impl CardStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ReviewRecord>) -> Self {
        let mut total = 0usize;
        let mut correct = 0usize;
        let mut score = 0u64;
        for record in records {
            total += 1;
            score += u64::from(record.grade.score());
            if record.grade.is_correct() {
                correct += 1;
            }
        }

        let denominator = total.max(1) as f64;
        Self {
            total_reviews: total,
            correct_reviews: correct,
            average_grade: score as f64 / denominator,
            retention: correct as f64 / denominator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReview {
    pub date: NaiveDate,
    pub total: usize,
    pub correct: usize,
}

/// Study activity over a trailing window of days.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyStats {
    pub window_days: u32,
    pub total_reviews: usize,
    pub correct_reviews: usize,
    pub retention: f64,
    /// One bucket per UTC day in the window, oldest first, empty days included.
    pub daily: Vec<DailyReview>,
    pub grade_counts: HashMap<Grade, usize>,
    pub average_interval_days: f64,
    /// Consecutive days with at least one review, ending today or yesterday.
    pub current_streak_days: u32,
}

impl StudyStats {
    pub fn compute(records: &[ReviewRecord], now: DateTime<Utc>, window_days: u32) -> Self {
        let today = now.date_naive();
        let first_day = today - Duration::days(i64::from(window_days.max(1)) - 1);

        let in_window: Vec<&ReviewRecord> = records
            .iter()
            .filter(|r| {
                let day = r.timestamp.date_naive();
                day >= first_day && day <= today
            })
            .collect();

        let mut per_day: HashMap<NaiveDate, (usize, usize)> = HashMap::new();
        let mut grade_counts: HashMap<Grade, usize> = HashMap::new();
        let mut correct = 0usize;
        let mut interval_sum = 0.0;
        for record in &in_window {
            let entry = per_day.entry(record.timestamp.date_naive()).or_default();
            entry.0 += 1;
            if record.grade.is_correct() {
                entry.1 += 1;
                correct += 1;
            }
            *grade_counts.entry(record.grade).or_default() += 1;
            interval_sum += record.interval_days_after;
        }

        let daily = first_day
            .iter_days()
            .take_while(|day| *day <= today)
            .map(|date| {
                let (total, correct) = per_day.get(&date).copied().unwrap_or((0, 0));
                DailyReview {
                    date,
                    total,
                    correct,
                }
            })
            .collect();

        let total = in_window.len();
        Self {
            window_days: window_days.max(1),
            total_reviews: total,
            correct_reviews: correct,
            retention: if total > 0 {
                correct as f64 / total as f64
            } else {
                0.0
            },
            daily,
            grade_counts,
            average_interval_days: if total > 0 {
                interval_sum / total as f64
            } else {
                0.0
            },
            current_streak_days: current_streak(records, today),
        }
    }

    pub fn count(&self, grade: Grade) -> usize {
        self.grade_counts.get(&grade).copied().unwrap_or(0)
    }
}

fn current_streak(records: &[ReviewRecord], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = records.iter().map(|r| r.timestamp.date_naive()).collect();

    let mut day = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

//! Review session over the cards that are due.
//! Grades go through the scheduler and are persisted as they happen.

use super::{Card, Grade, ReviewRecord};
use crate::database::db;
use crate::scheduler::{JitterSource, Scheduler};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

/// Walks a list of due cards in rounds.
/// Cards graded Again are repeated in the next round until none are left.
pub struct ReviewSession {
    pub label: String,
    pub cards: Vec<Card>,
    pub current_round: Vec<usize>,
    pub current_index: usize,
    pub show_back: bool,
    pub round_number: usize,
    pub reviewed: usize,
    retry: Vec<usize>,
}

impl ReviewSession {
    pub fn new(label: impl Into<String>, cards: Vec<Card>) -> Self {
        let indices: Vec<usize> = (0..cards.len()).collect();

        Self {
            label: label.into(),
            cards,
            current_round: indices,
            current_index: 0,
            show_back: false,
            round_number: 1,
            reviewed: 0,
            retry: Vec::new(),
        }
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.current_round
            .get(self.current_index)
            .and_then(|&idx| self.cards.get(idx))
    }

    pub fn toggle_back(&mut self) {
        self.show_back = !self.show_back;
    }

    /// Grades the current card, saves the item and its review record
    /// atomically, then moves on. Returns `None` once the session is over.
    pub fn grade_current(
        &mut self,
        grade: Grade,
        now: DateTime<Utc>,
        scheduler: &Scheduler,
        jitter: &mut dyn JitterSource,
        conn: &mut Connection,
    ) -> crate::Result<Option<ReviewRecord>> {
        let Some(&idx) = self.current_round.get(self.current_index) else {
            return Ok(None);
        };
        let Some(card) = self.cards.get_mut(idx) else {
            return Ok(None);
        };

        let (item, record) = scheduler.apply_grade(&card.item, grade, now, jitter)?;
        db::save_review(conn, &item, &record)?;
        card.item = item;

        if grade == Grade::Again {
            self.retry.push(idx);
        }
        self.reviewed += 1;
        self.advance();

        Ok(Some(record))
    }

    fn advance(&mut self) {
        self.current_index += 1;
        self.show_back = false;
        if self.current_index >= self.current_round.len() && !self.retry.is_empty() {
            self.current_round = std::mem::take(&mut self.retry);
            self.current_index = 0;
            self.round_number += 1;
        }
    }

    pub fn total_count(&self) -> usize {
        self.cards.len()
    }

    /// Cards still to be shown, including those queued for the next round.
    pub fn remaining_count(&self) -> usize {
        self.current_round.len().saturating_sub(self.current_index) + self.retry.len()
    }

    pub fn is_completed(&self) -> bool {
        self.remaining_count() == 0
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} cards", self.round_number, self.current_round.len())
        } else {
            format!(
                "Round {} (Retry): {} cards to retry",
                self.round_number,
                self.current_round.len()
            )
        }
    }
}

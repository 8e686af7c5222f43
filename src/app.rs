//! Command handlers for the `rote` binary.
//! Every handler writes its report to the given output so it can be tested.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use rote::database::db::{self, CardFilter};
use rote::scheduler::{JitterSource, RandomJitter, Scheduler};
use rote::{AppConfig, Card, CardStats, Flashcard, Grade, ItemId, ReviewSession, StudyStats};
use rusqlite::Connection;
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// `--tag`/`--deck` selection shared by the card listing commands.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Only cards carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,
    /// Only cards in this deck
    #[arg(short, long)]
    pub deck: Option<String>,
}

impl FilterArgs {
    pub fn as_filter(&self) -> CardFilter<'_> {
        CardFilter::all()
            .tag(self.tag.as_deref())
            .deck(self.deck.as_deref())
    }

    fn label(&self) -> String {
        match (&self.deck, &self.tag) {
            (Some(deck), Some(tag)) => format!("{} #{}", deck, tag),
            (Some(deck), None) => deck.clone(),
            (None, Some(tag)) => format!("#{}", tag),
            (None, None) => "all".to_string(),
        }
    }
}

/// Changes for `edit`; anything not given is kept.
#[derive(Debug, Clone, Default, Args)]
pub struct CardEdit {
    #[arg(long)]
    pub front: Option<String>,
    #[arg(long)]
    pub back: Option<String>,
    /// Replacement tags, repeatable
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
    /// Remove every tag
    #[arg(long, conflicts_with = "tags")]
    pub clear_tags: bool,
    /// Move the card to this deck
    #[arg(short, long)]
    pub deck: Option<String>,
    /// Take the card out of its deck
    #[arg(long, conflicts_with = "deck")]
    pub no_deck: bool,
}

impl CardEdit {
    fn is_empty(&self) -> bool {
        self.front.is_none()
            && self.back.is_none()
            && self.tags.is_empty()
            && !self.clear_tags
            && self.deck.is_none()
            && !self.no_deck
    }

    fn apply(self, current: &Flashcard) -> Result<Flashcard> {
        let front = self.front.unwrap_or_else(|| current.front.clone());
        let back = self.back.unwrap_or_else(|| current.back.clone());
        if front.trim().is_empty() || back.trim().is_empty() {
            bail!("front and back must not be empty");
        }

        let tags = if self.clear_tags {
            Vec::new()
        } else if self.tags.is_empty() {
            current.tags.clone()
        } else {
            self.tags
        };
        let deck = if self.no_deck {
            None
        } else {
            self.deck.or_else(|| current.deck.clone())
        };

        Ok(Flashcard::new(front.trim(), back.trim(), tags).in_deck(deck.as_deref()))
    }
}

pub struct App {
    conn: Connection,
    config: AppConfig,
    scheduler: Scheduler,
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

fn format_interval(days: f64) -> String {
    if days <= 0.0 {
        "-".to_string()
    } else if days < 1.0 {
        format!("{}m", (days * 24.0 * 60.0).round() as i64)
    } else {
        format!("{:.1}d", days)
    }
}

fn short_id(id: ItemId) -> String {
    id.to_string().chars().take(8).collect()
}

impl App {
    pub fn open(config: AppConfig) -> Result<Self> {
        let conn = db::init_database(&config.database_path).with_context(|| {
            format!("cannot open database {}", config.database_path.display())
        })?;
        Self::with_connection(conn, config)
    }

    pub fn with_connection(conn: Connection, config: AppConfig) -> Result<Self> {
        let scheduler =
            Scheduler::new(config.scheduler.clone()).context("invalid scheduler settings")?;
        Ok(Self {
            conn,
            config,
            scheduler,
        })
    }

    fn now(&self) -> Result<DateTime<Utc>> {
        Ok(db::current_time(&self.conn)?)
    }

    /// Accepts a full id or an unambiguous prefix of one.
    fn resolve(&self, id: &str) -> Result<Card> {
        let now = self.now()?;
        if let Ok(id) = id.parse::<ItemId>() {
            return Ok(db::load_card(&self.conn, id, now, &self.config.scheduler)?);
        }

        let prefix = id.trim().to_lowercase();
        if prefix.is_empty() {
            bail!("empty card id");
        }
        let mut matches: Vec<Card> = db::list_cards(&self.conn, now, &self.config.scheduler)?
            .into_iter()
            .filter(|c| c.id().to_string().starts_with(&prefix))
            .collect();
        match matches.len() {
            0 => bail!("no card with id {}", id),
            1 => Ok(matches.remove(0)),
            n => bail!("id prefix {} matches {} cards", id, n),
        }
    }

    pub fn add(
        &self,
        front: &str,
        back: &str,
        tags: Vec<String>,
        deck: Option<&str>,
        out: &mut dyn Write,
    ) -> Result<()> {
        if front.trim().is_empty() || back.trim().is_empty() {
            bail!("front and back must not be empty");
        }
        let card = db::add_card(
            &self.conn,
            Flashcard::new(front.trim(), back.trim(), tags).in_deck(deck),
            self.now()?,
            &self.config.scheduler,
        )?;
        info!(card = %card.id(), "card added");
        writeln!(out, "Added {}", card.id())?;
        Ok(())
    }

    fn print_cards(&self, cards: &[Card], out: &mut dyn Write) -> Result<()> {
        for card in cards {
            let tags = if card.flashcard.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", card.flashcard.tags.join(", "))
            };
            let deck = match &card.flashcard.deck {
                Some(deck) => format!(" @{}", deck),
                None => String::new(),
            };
            writeln!(
                out,
                "{}  {:<10} {:>7}  due {}  {} -> {}{}{}",
                short_id(card.id()),
                card.item.state,
                format_interval(card.item.interval_days),
                format_time(card.item.due_at),
                card.flashcard.front,
                card.flashcard.back,
                tags,
                deck
            )?;
        }
        Ok(())
    }

    pub fn list(&self, filter: &FilterArgs, out: &mut dyn Write) -> Result<()> {
        let cards: Vec<Card> = db::list_cards(&self.conn, self.now()?, &self.config.scheduler)?
            .into_iter()
            .filter(|c| filter.as_filter().matches(c))
            .collect();
        if cards.is_empty() {
            writeln!(out, "No cards yet.")?;
            return Ok(());
        }
        self.print_cards(&cards, out)
    }

    pub fn due(&self, filter: &FilterArgs, out: &mut dyn Write) -> Result<()> {
        let now = self.now()?;
        let cards = db::due_cards(&self.conn, now, filter.as_filter(), &self.config.scheduler)?;
        writeln!(out, "{} cards due", cards.len())?;
        self.print_cards(&cards, out)
    }

    /// Interactive review of every due card. Input lines: Enter reveals the
    /// back, `1`-`4` or a grade name grades, `q` stops.
    pub fn review(
        &mut self,
        filter: &FilterArgs,
        jitter: &mut dyn JitterSource,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> Result<()> {
        let now = self.now()?;
        let cards = db::due_cards(&self.conn, now, filter.as_filter(), &self.config.scheduler)?;
        if cards.is_empty() {
            writeln!(out, "Nothing due.")?;
            return Ok(());
        }

        let mut session = ReviewSession::new(filter.label(), cards);
        let mut round = 0;
        let mut line = String::new();

        while let Some(card) = session.current_card() {
            if session.round_number != round {
                round = session.round_number;
                writeln!(out, "-- {}: {} --", session.label, session.phase_message())?;
            }
            writeln!(out, "Q: {}", card.flashcard.front)?;
            if session.show_back {
                writeln!(out, "A: {}", card.flashcard.back)?;
                write!(out, "Grade [1 again, 2 hard, 3 good, 4 easy, q quit]: ")?;
            } else {
                write!(out, "[Enter to reveal, q to quit] ")?;
            }
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            let answer = line.trim();
            if answer.eq_ignore_ascii_case("q") {
                break;
            }
            if !session.show_back {
                session.toggle_back();
                continue;
            }
            match answer.parse::<Grade>() {
                Ok(grade) => {
                    let now = self.now()?;
                    let record = session.grade_current(
                        grade,
                        now,
                        &self.scheduler,
                        jitter,
                        &mut self.conn,
                    )?;
                    if let Some(record) = record {
                        writeln!(
                            out,
                            "  next in {}",
                            format_interval(record.interval_days_after)
                        )?;
                    }
                }
                Err(e) => writeln!(out, "  {}", e)?,
            }
        }

        writeln!(
            out,
            "Reviewed {} ({} left).",
            session.reviewed,
            session.remaining_count()
        )?;
        Ok(())
    }

    pub fn preview(&self, id: &str, out: &mut dyn Write) -> Result<()> {
        let card = self.resolve(id)?;
        let now = self.now()?;
        writeln!(out, "{} ({})", card.flashcard.front, card.item.state)?;
        for preview in self.scheduler.preview(&card.item, now)? {
            writeln!(
                out,
                "  {:<5} -> {:<10} {:>7}  due {}",
                preview.grade,
                preview.state,
                format_interval(preview.interval_days),
                format_time(preview.due_at)
            )?;
        }
        Ok(())
    }

    pub fn history(&self, id: &str, out: &mut dyn Write) -> Result<()> {
        let card = self.resolve(id)?;
        let records = db::reviews_for_item(&self.conn, card.id())?;
        let stats = CardStats::from_records(&records);

        writeln!(out, "{} -> {}", card.flashcard.front, card.flashcard.back)?;
        writeln!(
            out,
            "reviews {}  correct {}  retention {:.0}%  average grade {:.2}",
            stats.total_reviews,
            stats.correct_reviews,
            stats.retention * 100.0,
            stats.average_grade
        )?;
        for record in &records {
            writeln!(
                out,
                "  {}  {:<5} ease {:.2}  interval {}",
                format_time(record.timestamp),
                record.grade,
                record.ease_factor_after,
                format_interval(record.interval_days_after)
            )?;
        }
        Ok(())
    }

    pub fn stats(&self, days: Option<u32>, out: &mut dyn Write) -> Result<()> {
        let now = self.now()?;
        let window = days.unwrap_or(self.config.stats_window_days).max(1);
        // Reach back far enough to see the whole current streak.
        let since = now - Duration::days(i64::from(window.max(366)));
        let records = db::reviews_since(&self.conn, since)?;
        let stats = StudyStats::compute(&records, now, window);

        writeln!(out, "Last {} days", stats.window_days)?;
        writeln!(
            out,
            "reviews {}  correct {}  retention {:.0}%  streak {} days",
            stats.total_reviews,
            stats.correct_reviews,
            stats.retention * 100.0,
            stats.current_streak_days
        )?;
        let grades: Vec<String> = Grade::ALL
            .iter()
            .map(|g| format!("{} {}", g, stats.count(*g)))
            .collect();
        writeln!(out, "{}", grades.join("  "))?;
        writeln!(
            out,
            "average interval {}",
            format_interval(stats.average_interval_days)
        )?;
        for day in &stats.daily {
            writeln!(out, "  {}  {:>3} ({} correct)", day.date, day.total, day.correct)?;
        }
        Ok(())
    }

    pub fn tags(&self, out: &mut dyn Write) -> Result<()> {
        let tags = db::all_tags(&self.conn)?;
        if tags.is_empty() {
            writeln!(out, "No tags.")?;
        }
        for (tag, count) in tags {
            writeln!(out, "{:<20} {}", tag, count)?;
        }
        Ok(())
    }

    pub fn edit(&self, id: &str, changes: CardEdit, out: &mut dyn Write) -> Result<()> {
        if changes.is_empty() {
            bail!("nothing to change");
        }
        let card = self.resolve(id)?;
        let flashcard = changes.apply(&card.flashcard)?;
        db::update_card(&self.conn, card.id(), flashcard, self.now()?)?;
        info!(card = %card.id(), "card edited");
        writeln!(out, "Updated {}", card.id())?;
        Ok(())
    }

    pub fn decks(&self, out: &mut dyn Write) -> Result<()> {
        let decks = db::list_decks(&self.conn, self.now()?, &self.config.scheduler)?;
        if decks.is_empty() {
            writeln!(out, "No decks.")?;
        }
        for summary in decks {
            let topic = summary.deck.topic.as_deref().unwrap_or("");
            writeln!(
                out,
                "{:<20} {:>4} cards {:>4} due  {}",
                summary.deck.name, summary.cards, summary.due, topic
            )?;
        }
        Ok(())
    }

    pub fn new_deck(&self, name: &str, topic: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let deck = db::ensure_deck(&self.conn, name, topic, self.now()?)?;
        writeln!(out, "Deck {}", deck.name)?;
        Ok(())
    }

    pub fn delete_deck(&mut self, name: &str, out: &mut dyn Write) -> Result<()> {
        let moved = db::delete_deck(&mut self.conn, name)?;
        writeln!(out, "Deleted deck {} ({} cards kept)", name.trim(), moved)?;
        Ok(())
    }

    pub fn reset(&self, id: &str, out: &mut dyn Write) -> Result<()> {
        let card = self.resolve(id)?;
        let item = card.item.reset(self.now()?, &self.config.scheduler);
        db::update_item(&self.conn, &item)?;
        info!(card = %item.id, "card reset");
        writeln!(out, "Reset {}", item.id)?;
        Ok(())
    }

    pub fn delete(&mut self, id: &str, out: &mut dyn Write) -> Result<()> {
        let card = self.resolve(id)?;
        db::delete_card(&mut self.conn, card.id())?;
        info!(card = %card.id(), "card deleted");
        writeln!(out, "Deleted {}", card.id())?;
        Ok(())
    }

    pub fn advance_day(&self, out: &mut dyn Write) -> Result<()> {
        db::advance_day(&self.conn)?;
        let now = self.now()?;
        debug!(%now, "clock advanced");
        writeln!(out, "Clock is now {}", format_time(now))?;
        Ok(())
    }

    pub fn migrate(&mut self, out: &mut dyn Write) -> Result<()> {
        let now = self.now()?;
        let rewritten = db::migrate_items(&mut self.conn, now, &self.config.scheduler)?;
        writeln!(out, "Normalized {} cards", rewritten)?;
        Ok(())
    }

    pub fn show_config(&self, out: &mut dyn Write) -> Result<()> {
        write!(out, "{}", self.config.to_toml()?)?;
        Ok(())
    }
}

/// Jitter for a review run: seeded when a seed is given.
pub fn jitter_source(seed: Option<u64>) -> RandomJitter {
    match seed {
        Some(seed) => RandomJitter::seeded(seed),
        None => RandomJitter::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rote::LearningState;
    use rote::scheduler::FixedJitter;
    use std::io::Cursor;

    fn app() -> App {
        let conn = db::open_in_memory().unwrap();
        App::with_connection(conn, AppConfig::default()).unwrap()
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_add_and_list() {
        let app = app();
        let added = output(|o| app.add("cześć", "hello", vec!["polish".into()], None, o));
        assert!(added.starts_with("Added "));

        let listed = output(|o| app.list(&FilterArgs::default(), o));
        assert!(listed.contains("cześć -> hello [polish]"));
        assert!(listed.contains("new"));
    }

    #[test]
    fn test_add_rejects_blank_text() {
        let app = app();
        let mut out = Vec::new();
        assert!(app.add("  ", "hello", vec![], None, &mut out).is_err());
    }

    #[test]
    fn test_review_session_grades_and_persists() {
        let mut app = app();
        output(|o| app.add("dziękuję", "thank you", vec![], None, o));
        output(|o| app.add("proszę", "please", vec![], None, o));

        // reveal, good; reveal, again; retry round: reveal, good
        let mut input = Cursor::new("\n3\n\n1\n\ngood\n");
        let mut jitter = FixedJitter(1.0);
        let all = FilterArgs::default();
        let text = output(|o| app.review(&all, &mut jitter, &mut input, o));

        assert!(text.contains("Round 1: 2 cards"));
        assert!(text.contains("Round 2 (Retry): 1 cards to retry"));
        assert!(text.contains("Reviewed 3 (0 left)."));

        let now = app.now().unwrap();
        let cards = db::list_cards(&app.conn, now, &app.config.scheduler).unwrap();
        assert!(cards.iter().all(|c| c.item.state == LearningState::Learning));
        let total: usize = cards
            .iter()
            .map(|c| db::reviews_for_item(&app.conn, c.id()).unwrap().len())
            .sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_review_quit_and_bad_grade() {
        let mut app = app();
        output(|o| app.add("a", "b", vec![], None, o));

        let mut input = Cursor::new("\nmaybe\nq\n");
        let all = FilterArgs::default();
        let text = output(|o| app.review(&all, &mut FixedJitter(1.0), &mut input, o));
        assert!(text.contains("Unknown grade: maybe"));
        assert!(text.contains("Reviewed 0 (1 left)."));
    }

    #[test]
    fn test_review_nothing_due() {
        let mut app = app();
        let mut input = Cursor::new("");
        let all = FilterArgs::default();
        let text = output(|o| app.review(&all, &mut FixedJitter(1.0), &mut input, o));
        assert_eq!(text, "Nothing due.\n");
    }

    #[test]
    fn test_resolve_by_prefix() {
        let app = app();
        output(|o| app.add("a", "b", vec![], None, o));
        let card = db::list_cards(&app.conn, app.now().unwrap(), &app.config.scheduler)
            .unwrap()
            .remove(0);

        let prefix = short_id(card.id());
        assert_eq!(app.resolve(&prefix).unwrap().id(), card.id());
        assert_eq!(app.resolve(&card.id().to_string()).unwrap().id(), card.id());
        assert!(app.resolve("zzzz").is_err());
    }

    #[test]
    fn test_preview_lists_every_grade() {
        let app = app();
        output(|o| app.add("a", "b", vec![], None, o));
        let card = db::list_cards(&app.conn, app.now().unwrap(), &app.config.scheduler)
            .unwrap()
            .remove(0);

        let text = output(|o| app.preview(&card.id().to_string(), o));
        for grade in Grade::ALL {
            assert!(text.contains(grade.as_str()));
        }
        assert!(text.contains("reviewing"));
    }

    #[test]
    fn test_delete_and_tags() {
        let mut app = app();
        output(|o| app.add("a", "b", vec!["Verbs".into()], None, o));
        assert!(output(|o| app.tags(o)).contains("verbs"));

        let id = db::list_cards(&app.conn, app.now().unwrap(), &app.config.scheduler)
            .unwrap()[0]
            .id();
        output(|o| app.delete(&id.to_string(), o));
        assert_eq!(output(|o| app.list(&FilterArgs::default(), o)), "No cards yet.\n");
        assert_eq!(output(|o| app.tags(o)), "No tags.\n");
    }

    fn deck(name: &str) -> FilterArgs {
        FilterArgs {
            tag: None,
            deck: Some(name.to_string()),
        }
    }

    #[test]
    fn test_add_to_deck_and_list_decks() {
        let app = app();
        output(|o| app.new_deck("Polish", Some("A1 vocabulary"), o));
        output(|o| app.add("cześć", "hello", vec![], Some("polish"), o));
        output(|o| app.add("hola", "hello", vec![], Some("Spanish"), o));
        output(|o| app.add("a", "b", vec![], None, o));

        let listed = output(|o| app.list(&deck("POLISH"), o));
        assert!(listed.contains("cześć -> hello @Polish"));
        assert!(!listed.contains("hola"));

        let decks = output(|o| app.decks(o));
        let lines: Vec<&str> = decks.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Polish"));
        assert!(lines[0].contains("1 cards"));
        assert!(lines[0].ends_with("A1 vocabulary"));
        assert!(lines[1].starts_with("Spanish"));
    }

    #[test]
    fn test_due_and_review_filtered_by_deck() {
        let mut app = app();
        output(|o| app.add("cześć", "hello", vec![], Some("Polish"), o));
        output(|o| app.add("hola", "hello", vec![], Some("Spanish"), o));

        let due = output(|o| app.due(&deck("Spanish"), o));
        assert!(due.contains("hola"));
        assert!(!due.contains("cześć"));

        let mut input = Cursor::new("\ngood\n");
        let filter = deck("Spanish");
        let text = output(|o| app.review(&filter, &mut FixedJitter(1.0), &mut input, o));
        assert!(text.contains("-- Spanish: Round 1: 1 cards --"));
        assert!(text.contains("Reviewed 1 (0 left)."));

        let due = output(|o| app.due(&FilterArgs::default(), o));
        assert!(due.contains("cześć"));
        assert!(!due.contains("hola"));
    }

    #[test]
    fn test_delete_deck_keeps_cards() {
        let mut app = app();
        output(|o| app.add("cześć", "hello", vec![], Some("Polish"), o));

        let text = output(|o| app.delete_deck("polish", o));
        assert!(text.contains("1 cards kept"));
        assert_eq!(output(|o| app.decks(o)), "No decks.\n");

        let listed = output(|o| app.list(&FilterArgs::default(), o));
        assert!(listed.contains("cześć -> hello\n"));
        assert!(app.delete_deck("polish", &mut Vec::new()).is_err());
    }

    #[test]
    fn test_edit_keeps_schedule_and_history() {
        let mut app = app();
        output(|o| app.add("dziekuje", "thanks", vec!["polish".into()], None, o));
        let mut input = Cursor::new("\neasy\n");
        let all = FilterArgs::default();
        output(|o| app.review(&all, &mut FixedJitter(1.0), &mut input, o));

        let before = db::list_cards(&app.conn, app.now().unwrap(), &app.config.scheduler)
            .unwrap()
            .remove(0);
        let changes = CardEdit {
            front: Some("dziękuję".into()),
            deck: Some("Polish".into()),
            ..CardEdit::default()
        };
        let prefix = short_id(before.id());
        assert!(output(|o| app.edit(&prefix, changes, o)).starts_with("Updated "));

        let after = app.resolve(&prefix).unwrap();
        assert_eq!(after.flashcard.front, "dziękuję");
        assert_eq!(after.flashcard.back, "thanks");
        assert_eq!(after.flashcard.tags, vec!["polish"]);
        assert_eq!(after.flashcard.deck.as_deref(), Some("Polish"));
        assert_eq!(after.item, before.item);
        assert!(after.modified_at.is_some());
        assert_eq!(db::reviews_for_item(&app.conn, after.id()).unwrap().len(), 1);

        let clear = CardEdit {
            clear_tags: true,
            no_deck: true,
            ..CardEdit::default()
        };
        output(|o| app.edit(&prefix, clear, o));
        let cleared = app.resolve(&prefix).unwrap();
        assert!(cleared.flashcard.tags.is_empty());
        assert_eq!(cleared.flashcard.deck, None);
    }

    #[test]
    fn test_edit_rejects_empty_changes() {
        let app = app();
        output(|o| app.add("a", "b", vec![], None, o));
        let id = db::list_cards(&app.conn, app.now().unwrap(), &app.config.scheduler)
            .unwrap()[0]
            .id()
            .to_string();

        let mut out = Vec::new();
        assert!(app.edit(&id, CardEdit::default(), &mut out).is_err());
        let blank = CardEdit {
            back: Some("  ".into()),
            ..CardEdit::default()
        };
        assert!(app.edit(&id, blank, &mut out).is_err());
        assert_eq!(app.resolve(&id).unwrap().flashcard.back, "b");
    }

    #[test]
    fn test_advance_day_moves_clock() {
        let app = app();
        let before = app.now().unwrap();
        output(|o| app.advance_day(o));
        assert!(app.now().unwrap() - before >= Duration::hours(23));
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0.0), "-");
        assert_eq!(format_interval(10.0 / 1440.0), "10m");
        assert_eq!(format_interval(2.5), "2.5d");
    }
}

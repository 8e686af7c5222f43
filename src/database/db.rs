//! Database operations for the review scheduler
//!
//! Handles SQLite initialization, deck and card CRUD, atomic persistence of
//! graded items together with their ledger records, and the due-cards query.
//! Every item read back from disk passes through
//! [`normalize`](crate::scheduler::normalize) before it is handed out.

use crate::error::StorageError;
use crate::models::{Card, Deck, DeckSummary, Flashcard, Grade, Item, ItemId, ReviewRecord};
use crate::scheduler::{SchedulerConfig, StoredItem, normalize};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, StorageError>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS decks (
    name TEXT PRIMARY KEY COLLATE NOCASE,
    topic TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL,

    -- Scheduling state. Nullable: rows written by older versions may lack
    -- any of these and are repaired on load.
    state TEXT,
    step_index INTEGER,
    ease_factor REAL,
    interval_days REAL,
    streak INTEGER,
    due_at INTEGER,
    last_reviewed_at INTEGER,
    review_count INTEGER,

    -- Legacy review date, read only as a fallback for last_reviewed_at
    last_review_date INTEGER,

    deck TEXT REFERENCES decks(name),
    modified_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_cards_due_at ON cards(due_at);

CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    card_id TEXT NOT NULL,
    reviewed_at INTEGER NOT NULL,
    grade TEXT NOT NULL,
    ease_factor_after REAL NOT NULL,
    interval_days_after REAL NOT NULL,
    FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_reviews_card ON reviews(card_id);
CREATE INDEX IF NOT EXISTS idx_reviews_reviewed_at ON reviews(reviewed_at);

CREATE TABLE IF NOT EXISTS app_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const CARD_COLUMNS: &str = "id, front, back, tags, created_at, state, step_index, ease_factor, \
     interval_days, streak, due_at, last_reviewed_at, last_review_date, review_count, deck, \
     modified_at";

/// Columns added after the first release, with their SQL types.
const ADDED_CARD_COLUMNS: [(&str, &str); 2] = [
    ("deck", "TEXT REFERENCES decks(name)"),
    ("modified_at", "INTEGER"),
];

const REVIEW_COLUMNS: &str =
    "id, card_id, reviewed_at, grade, ease_factor_after, interval_days_after";

const CLOCK_OFFSET_KEY: &str = "clock_offset_days";

/// Opens (creating if needed) the database at `path` and ensures the schema.
pub fn init_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    info!(path = %path.display(), "database ready");
    Ok(conn)
}

/// In-memory database with the full schema.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    add_missing_columns(conn)?;
    conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck);")?;
    Ok(())
}

/// Brings a `cards` table created by an older version up to date.
fn add_missing_columns(conn: &Connection) -> Result<()> {
    let existing = {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('cards')")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        names
    };

    for (column, sql_type) in ADDED_CARD_COLUMNS {
        if !existing.iter().any(|c| c == column) {
            conn.execute_batch(&format!("ALTER TABLE cards ADD COLUMN {} {};", column, sql_type))?;
            info!(column, "cards table upgraded");
        }
    }
    Ok(())
}

fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::Corrupt(format!("timestamp out of range: {}", millis)))
}

fn opt_from_millis(millis: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    millis.map(from_millis).transpose()
}

fn parse_item_id(raw: &str) -> Result<ItemId> {
    raw.parse()
        .map_err(|e| StorageError::Corrupt(format!("bad card id {:?}: {}", raw, e)))
}

/// Wall clock plus the simulated day offset.
pub fn current_time(conn: &Connection) -> Result<DateTime<Utc>> {
    let offset: Option<String> = conn
        .query_row(
            "SELECT value FROM app_state WHERE key = ?1",
            params![CLOCK_OFFSET_KEY],
            |row| row.get(0),
        )
        .optional()?;

    let days = offset.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0);
    Ok(Utc::now() + Duration::days(days))
}

/// Advances the simulated clock by 24 hours (for trying out the schedule).
pub fn advance_day(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES (?1, '1')
         ON CONFLICT(key) DO UPDATE SET value = CAST(value AS INTEGER) + 1",
        params![CLOCK_OFFSET_KEY],
    )?;
    Ok(())
}

/// Raw `cards` row, decoded only as far as SQLite types go.
struct CardRow {
    id: String,
    front: String,
    back: String,
    tags: String,
    created_at: i64,
    state: Option<String>,
    step_index: Option<i64>,
    ease_factor: Option<f64>,
    interval_days: Option<f64>,
    streak: Option<i64>,
    due_at: Option<i64>,
    last_reviewed_at: Option<i64>,
    last_review_date: Option<i64>,
    review_count: Option<i64>,
    deck: Option<String>,
    modified_at: Option<i64>,
}

impl CardRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            front: row.get(1)?,
            back: row.get(2)?,
            tags: row.get(3)?,
            created_at: row.get(4)?,
            state: row.get(5)?,
            step_index: row.get(6)?,
            ease_factor: row.get(7)?,
            interval_days: row.get(8)?,
            streak: row.get(9)?,
            due_at: row.get(10)?,
            last_reviewed_at: row.get(11)?,
            last_review_date: row.get(12)?,
            review_count: row.get(13)?,
            deck: row.get(14)?,
            modified_at: row.get(15)?,
        })
    }

    fn stored_item(&self) -> Result<StoredItem> {
        Ok(StoredItem {
            id: parse_item_id(&self.id)?,
            state: self.state.clone(),
            step_index: self.step_index,
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            streak: self.streak,
            due_at: opt_from_millis(self.due_at)?,
            last_reviewed_at: opt_from_millis(self.last_reviewed_at)?,
            last_review_date: opt_from_millis(self.last_review_date)?,
            review_count: self.review_count,
        })
    }

    fn into_card(self, now: DateTime<Utc>, config: &SchedulerConfig) -> Result<Card> {
        let stored = self.stored_item()?;
        let tags = decode_tags(&self.id, &self.tags);
        let mut flashcard = Flashcard::new(self.front, self.back, tags);
        flashcard.deck = self.deck;

        Ok(Card {
            flashcard,
            item: normalize(stored, now, config),
            created_at: from_millis(self.created_at)?,
            modified_at: opt_from_millis(self.modified_at)?,
        })
    }
}

fn decode_tags(card_id: &str, raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(card = %card_id, error = %e, "unreadable tags, ignoring");
        Vec::new()
    })
}

fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags)
        .map_err(|e| StorageError::Corrupt(format!("cannot encode tags: {}", e)))
}

fn read_deck(row: &Row<'_>) -> rusqlite::Result<(String, Option<String>, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode_deck(raw: (String, Option<String>, i64)) -> Result<Deck> {
    let (name, topic, created_at) = raw;
    Ok(Deck {
        name,
        topic,
        created_at: from_millis(created_at)?,
    })
}

/// Looks a deck up by name, ignoring case.
pub fn find_deck(conn: &Connection, name: &str) -> Result<Option<Deck>> {
    let raw = conn
        .query_row(
            "SELECT name, topic, created_at FROM decks WHERE name = ?1",
            params![name.trim()],
            read_deck,
        )
        .optional()?;
    raw.map(decode_deck).transpose()
}

/// Returns the deck called `name`, creating it if needed. A given `topic`
/// replaces the stored one.
pub fn ensure_deck(
    conn: &Connection,
    name: &str,
    topic: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Deck> {
    let wanted = Deck::new(name, topic.map(str::to_string), now);
    if wanted.name.is_empty() {
        return Err(StorageError::InvalidInput("deck name must not be empty".to_string()));
    }

    let created = conn.execute(
        "INSERT OR IGNORE INTO decks (name, topic, created_at) VALUES (?1, ?2, ?3)",
        params![wanted.name, wanted.topic, to_millis(now)],
    )?;
    if created > 0 {
        info!(deck = %wanted.name, "deck created");
    } else if let Some(topic) = &wanted.topic {
        conn.execute(
            "UPDATE decks SET topic = ?1 WHERE name = ?2",
            params![topic, wanted.name],
        )?;
    }

    find_deck(conn, &wanted.name)?
        .ok_or_else(|| StorageError::Corrupt(format!("deck {:?} vanished", wanted.name)))
}

/// Every deck, sorted by name, with its card and due counts at `now`.
pub fn list_decks(
    conn: &Connection,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Result<Vec<DeckSummary>> {
    let decks = {
        let mut stmt =
            conn.prepare("SELECT name, topic, created_at FROM decks ORDER BY name COLLATE NOCASE")?;
        let rows = stmt
            .query_map([], read_deck)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };
    let cards = list_cards(conn, now, config)?;

    decks
        .into_iter()
        .map(|raw| {
            let deck = decode_deck(raw)?;
            let members = cards.iter().filter(|c| c.flashcard.is_in_deck(&deck.name));
            let (total, due) = members.fold((0, 0), |(total, due), card| {
                (total + 1, due + usize::from(card.item.is_due(now)))
            });
            Ok(DeckSummary {
                deck,
                cards: total,
                due,
            })
        })
        .collect()
}

/// Removes a deck. Its cards stay, outside any deck, with their history.
///
/// Returns the number of cards that were in the deck.
pub fn delete_deck(conn: &mut Connection, name: &str) -> Result<usize> {
    let tx = conn.transaction()?;
    let moved = tx.execute(
        "UPDATE cards SET deck = NULL WHERE deck = ?1 COLLATE NOCASE",
        params![name.trim()],
    )?;
    let removed = tx.execute("DELETE FROM decks WHERE name = ?1", params![name.trim()])?;
    if removed == 0 {
        return Err(StorageError::InvalidInput(format!("no deck named {:?}", name.trim())));
    }
    tx.commit()?;
    info!(deck = %name.trim(), moved, "deck deleted");
    Ok(moved)
}

/// Replaces the deck name with the stored spelling, creating the deck if needed.
fn resolve_deck(conn: &Connection, flashcard: &mut Flashcard, now: DateTime<Utc>) -> Result<()> {
    if let Some(name) = flashcard.deck.take() {
        flashcard.deck = Some(ensure_deck(conn, &name, None, now)?.name);
    }
    Ok(())
}

fn read_review(row: &Row<'_>) -> rusqlite::Result<(String, String, i64, String, f64, f64)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_review(raw: (String, String, i64, String, f64, f64)) -> Result<ReviewRecord> {
    let (id, card_id, reviewed_at, grade, ease, interval) = raw;
    Ok(ReviewRecord {
        id: Uuid::parse_str(&id)
            .map_err(|e| StorageError::Corrupt(format!("bad review id {:?}: {}", id, e)))?,
        item_id: parse_item_id(&card_id)?,
        timestamp: from_millis(reviewed_at)?,
        grade: grade.parse::<Grade>().map_err(StorageError::Corrupt)?,
        ease_factor_after: ease,
        interval_days_after: interval,
    })
}

/// Inserts a new card, due immediately.
pub fn add_card(
    conn: &Connection,
    mut flashcard: Flashcard,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Result<Card> {
    let mut item = Item::new(now);
    item.ease_factor = config.initial_ease;
    resolve_deck(conn, &mut flashcard, now)?;
    let tags = encode_tags(&flashcard.tags)?;

    conn.execute(
        "INSERT INTO cards (id, front, back, tags, deck, created_at, state, step_index,
                            ease_factor, interval_days, streak, due_at, last_reviewed_at,
                            review_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            item.id.to_string(),
            flashcard.front,
            flashcard.back,
            tags,
            flashcard.deck,
            to_millis(now),
            item.state.as_str(),
            item.step_index,
            item.ease_factor,
            item.interval_days,
            item.streak,
            to_millis(item.due_at),
            item.last_reviewed_at.map(to_millis),
            item.review_count,
        ],
    )?;

    debug!(card = %item.id, "card added");
    Ok(Card {
        flashcard,
        item,
        created_at: now,
        modified_at: None,
    })
}

/// Rewrites a card's text, tags and deck. Scheduling state and review
/// history are left alone.
pub fn update_card(
    conn: &Connection,
    id: ItemId,
    mut flashcard: Flashcard,
    now: DateTime<Utc>,
) -> Result<()> {
    resolve_deck(conn, &mut flashcard, now)?;
    let changed = conn.execute(
        "UPDATE cards SET front = ?1, back = ?2, tags = ?3, deck = ?4, modified_at = ?5
         WHERE id = ?6",
        params![
            flashcard.front,
            flashcard.back,
            encode_tags(&flashcard.tags)?,
            flashcard.deck,
            to_millis(now),
            id.to_string(),
        ],
    )?;

    if changed == 0 {
        return Err(StorageError::NotFound(id));
    }
    debug!(card = %id, "card edited");
    Ok(())
}

pub fn load_card(
    conn: &Connection,
    id: ItemId,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Result<Card> {
    let sql = format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS);
    let row = conn
        .query_row(&sql, params![id.to_string()], CardRow::read)
        .optional()?
        .ok_or(StorageError::NotFound(id))?;
    row.into_card(now, config)
}

/// All cards, oldest first.
pub fn list_cards(
    conn: &Connection,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Result<Vec<Card>> {
    let sql = format!("SELECT {} FROM cards ORDER BY created_at ASC", CARD_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], CardRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|row| row.into_card(now, config))
        .collect()
}

/// Restricts card queries to a tag and/or a deck, both matched ignoring case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardFilter<'a> {
    pub tag: Option<&'a str>,
    pub deck: Option<&'a str>,
}

impl<'a> CardFilter<'a> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: Option<&'a str>) -> Self {
        self.tag = tag;
        self
    }

    pub fn deck(mut self, deck: Option<&'a str>) -> Self {
        self.deck = deck;
        self
    }

    pub fn matches(&self, card: &Card) -> bool {
        self.tag.is_none_or(|tag| card.flashcard.has_tag(tag))
            && self.deck.is_none_or(|deck| card.flashcard.is_in_deck(deck))
    }
}

/// Cards due at `now` (`due_at <= now`), ordered by due time, oldest first.
///
/// Rows without a stored due date are normalized first and kept only if the
/// derived due date has passed. Only cards passing `filter` are returned.
pub fn due_cards(
    conn: &Connection,
    now: DateTime<Utc>,
    filter: CardFilter<'_>,
    config: &SchedulerConfig,
) -> Result<Vec<Card>> {
    let sql = format!(
        "SELECT {} FROM cards WHERE due_at IS NULL OR due_at <= ?1 ORDER BY due_at ASC",
        CARD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![to_millis(now)], CardRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut cards = Vec::with_capacity(rows.len());
    for row in rows {
        let card = row.into_card(now, config)?;
        if card.item.is_due(now) && filter.matches(&card) {
            cards.push(card);
        }
    }
    cards.sort_by_key(|c| c.item.due_at);
    Ok(cards)
}

/// Writes every scheduling field of `item` back to its row.
pub fn update_item(conn: &Connection, item: &Item) -> Result<()> {
    let changed = conn.execute(
        "UPDATE cards
         SET state = ?1, step_index = ?2, ease_factor = ?3, interval_days = ?4, streak = ?5,
             due_at = ?6, last_reviewed_at = ?7, review_count = ?8
         WHERE id = ?9",
        params![
            item.state.as_str(),
            item.step_index,
            item.ease_factor,
            item.interval_days,
            item.streak,
            to_millis(item.due_at),
            item.last_reviewed_at.map(to_millis),
            item.review_count,
            item.id.to_string(),
        ],
    )?;

    if changed == 0 {
        return Err(StorageError::NotFound(item.id));
    }
    Ok(())
}

fn insert_review(conn: &Connection, record: &ReviewRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO reviews (id, card_id, reviewed_at, grade, ease_factor_after,
                              interval_days_after)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id.to_string(),
            record.item_id.to_string(),
            to_millis(record.timestamp),
            record.grade.as_str(),
            record.ease_factor_after,
            record.interval_days_after,
        ],
    )?;
    Ok(())
}

/// Persists a graded item and its ledger record in one transaction.
pub fn save_review(conn: &mut Connection, item: &Item, record: &ReviewRecord) -> Result<()> {
    let tx = conn.transaction()?;
    update_item(&tx, item)?;
    insert_review(&tx, record)?;
    tx.commit()?;
    debug!(card = %item.id, grade = %record.grade, "review saved");
    Ok(())
}

/// Ledger entries of one card, newest first.
pub fn reviews_for_item(conn: &Connection, id: ItemId) -> Result<Vec<ReviewRecord>> {
    let sql = format!(
        "SELECT {} FROM reviews WHERE card_id = ?1 ORDER BY reviewed_at DESC",
        REVIEW_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![id.to_string()], read_review)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(decode_review).collect()
}

/// Ledger entries at or after `since`, oldest first.
pub fn reviews_since(conn: &Connection, since: DateTime<Utc>) -> Result<Vec<ReviewRecord>> {
    let sql = format!(
        "SELECT {} FROM reviews WHERE reviewed_at >= ?1 ORDER BY reviewed_at ASC",
        REVIEW_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![to_millis(since)], read_review)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(decode_review).collect()
}

/// Every tag in use with its card count, sorted by name.
pub fn all_tags(conn: &Connection) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare("SELECT id, tags FROM cards")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, String)>>>()?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for (id, raw) in rows {
        for tag in decode_tags(&id, &raw) {
            *counts.entry(tag.to_lowercase()).or_default() += 1;
        }
    }
    Ok(counts.into_iter().collect())
}

/// Removes a card and its ledger entries.
pub fn delete_card(conn: &mut Connection, id: ItemId) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM reviews WHERE card_id = ?1", params![id.to_string()])?;
    let removed = tx.execute("DELETE FROM cards WHERE id = ?1", params![id.to_string()])?;
    if removed == 0 {
        return Err(StorageError::NotFound(id));
    }
    tx.commit()?;
    Ok(())
}

/// Normalizes every stored item and writes back the ones that changed.
///
/// Returns the number of rows rewritten.
pub fn migrate_items(
    conn: &mut Connection,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Result<usize> {
    let tx = conn.transaction()?;
    let rows = {
        let sql = format!("SELECT {} FROM cards", CARD_COLUMNS);
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt
            .query_map([], CardRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    let mut rewritten = 0;
    for row in rows {
        let stored = row.stored_item()?;
        let item = normalize(stored.clone(), now, config);

        let mut expected = StoredItem::from(&item);
        expected.last_review_date = stored.last_review_date;
        if expected != stored {
            update_item(&tx, &item)?;
            rewritten += 1;
        }
    }
    tx.commit()?;

    info!(rewritten, "items migrated");
    Ok(rewritten)
}

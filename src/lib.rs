//! Spaced-repetition scheduling for flashcards.
//!
//! Items move through four learning states (`New`, `Learning`, `Reviewing`,
//! `Relearning`). Each grade produces a new item and an append-only review
//! record; items loaded from older databases are repaired by
//! [`normalize`](scheduler::normalize) before they are scheduled.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod scheduler;

pub use config::AppConfig;
pub use error::{ConfigError, Error, Result, SchedulerError, StorageError};
pub use models::{
    Card, CardStats, Deck, DeckSummary, Flashcard, Grade, Item, ItemId, LearningState,
    ReviewRecord, ReviewSession, StudyStats,
};
pub use scheduler::{
    FixedJitter, JitterSource, RandomJitter, ReviewLedger, Scheduler, SchedulerConfig,
    StoredItem, normalize,
};

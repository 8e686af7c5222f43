//! Error types for scheduling, configuration and storage.

use crate::models::ItemId;
use thiserror::Error;

/// Raised when an item handed to the scheduler already breaks an invariant.
///
/// Items loaded from storage should go through
/// [`normalize`](crate::scheduler::normalize) first; the scheduler itself
/// never repairs pre-existing corruption.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    #[error("Invalid state for item {item_id}: {reason}")]
    InvalidState { item_id: ItemId, reason: String },
}

/// A scheduler configuration that cannot drive the state machine.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid scheduler config: {0}")]
    Invalid(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Card not found: {0}")]
    NotFound(ItemId),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(StorageError::Database(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Deck: a named group of cards studied together.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(
        name: impl Into<String>,
        topic: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            topic: topic.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            created_at,
        }
    }
}

/// A deck with its card counts at some instant.
#[derive(Clone, Debug, PartialEq)]
pub struct DeckSummary {
    pub deck: Deck,
    pub cards: usize,
    pub due: usize,
}

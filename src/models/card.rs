//! A flashcard together with its scheduling state, as stored.
use super::{Flashcard, Item, ItemId};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub flashcard: Flashcard,
    pub item: Item,
    pub created_at: DateTime<Utc>,
    /// Last edit of the card's text, tags or deck.
    pub modified_at: Option<DateTime<Utc>>,
}

impl Card {
    pub fn id(&self) -> ItemId {
        self.item.id
    }
}

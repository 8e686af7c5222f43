//! Flashcard content: a <front, back> text pair plus free-form tags.
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deck: Option<String>,
}

impl Flashcard {
    /// Builds a card, trimming tags and dropping empty or duplicate ones.
    pub fn new(front: impl Into<String>, back: impl Into<String>, tags: Vec<String>) -> Self {
        let mut clean: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !clean.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                clean.push(tag);
            }
        }

        Self {
            front: front.into(),
            back: back.into(),
            tags: clean,
            deck: None,
        }
    }

    /// Puts the card in `deck`; a blank name leaves it outside any deck.
    pub fn in_deck(mut self, deck: Option<&str>) -> Self {
        self.deck = deck.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        self
    }

    pub fn is_in_deck(&self, deck: &str) -> bool {
        self.deck.as_deref().is_some_and(|d| d.eq_ignore_ascii_case(deck.trim()))
    }

    /// Case-insensitive tag match.
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }
}

pub mod db;

pub use db::{
    CardFilter, add_card, advance_day, all_tags, current_time, delete_card, delete_deck,
    due_cards, ensure_deck, find_deck, init_database, list_cards, list_decks, load_card,
    migrate_items, open_in_memory, reviews_for_item, reviews_since, save_review, update_card,
    update_item,
};

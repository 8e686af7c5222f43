pub mod card;
pub mod deck;
pub mod flashcard;
pub mod grade;
pub mod item;
pub mod learning_state;
pub mod review_record;
pub mod review_session;
pub mod stats;

pub use card::Card;
pub use deck::{Deck, DeckSummary};
pub use flashcard::Flashcard;
pub use grade::Grade;
pub use item::{Item, ItemId};
pub use learning_state::LearningState;
pub use review_record::ReviewRecord;
pub use review_session::ReviewSession;
pub use stats::{CardStats, DailyReview, StudyStats};

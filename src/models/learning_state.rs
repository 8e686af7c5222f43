//! Position of an item in the scheduling state machine.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `New -> Learning -> Reviewing <-> Relearning`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningState {
    /// Never graded. Behaves as the first learning step.
    #[default]
    New,
    /// Walking the minute-scale learning steps.
    Learning,
    /// Graduated; scheduled in days.
    Reviewing,
    /// Lapsed while reviewing; walking the relearning steps.
    Relearning,
}

impl LearningState {
    pub fn as_str(self) -> &'static str {
        match self {
            LearningState::New => "new",
            LearningState::Learning => "learning",
            LearningState::Reviewing => "reviewing",
            LearningState::Relearning => "relearning",
        }
    }

    /// Decodes a persisted state column. Missing or unknown values are `New`.
    pub fn from_stored(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for LearningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LearningState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(LearningState::New),
            "learning" => Ok(LearningState::Learning),
            "reviewing" => Ok(LearningState::Reviewing),
            "relearning" => Ok(LearningState::Relearning),
            other => Err(format!("Unknown learning state: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stored_defaults_to_new() {
        assert_eq!(LearningState::from_stored(None), LearningState::New);
        assert_eq!(LearningState::from_stored(Some("")), LearningState::New);
        assert_eq!(LearningState::from_stored(Some("graduated")), LearningState::New);
    }

    #[test]
    fn test_from_stored_is_case_insensitive() {
        assert_eq!(
            LearningState::from_stored(Some("Relearning")),
            LearningState::Relearning
        );
        assert_eq!(
            LearningState::from_stored(Some("reviewing")),
            LearningState::Reviewing
        );
    }
}

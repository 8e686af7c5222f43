//! Recall grade reported by the operator for a single review.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    /// Forgot the answer.
    Again,
    /// Recalled with serious difficulty.
    Hard,
    /// Recalled after some hesitation.
    Good,
    /// Recalled instantly.
    Easy,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    /// Good and Easy count as a successful recall in statistics.
    pub fn is_correct(self) -> bool {
        matches!(self, Grade::Good | Grade::Easy)
    }

    /// Numeric score used for average-grade statistics: Again 0 .. Easy 3.
    pub fn score(self) -> u8 {
        match self {
            Grade::Again => 0,
            Grade::Hard => 1,
            Grade::Good => 2,
            Grade::Easy => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Again => "again",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    /// Accepts grade names in any case, or the button numbers 1-4.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "again" | "1" => Ok(Grade::Again),
            "hard" | "2" => Ok(Grade::Hard),
            "good" | "3" => Ok(Grade::Good),
            "easy" | "4" => Ok(Grade::Easy),
            other => Err(format!("Unknown grade: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_parse_names_and_numbers() {
        assert_eq!("Again".parse::<Grade>().unwrap(), Grade::Again);
        assert_eq!(" good ".parse::<Grade>().unwrap(), Grade::Good);
        assert_eq!("4".parse::<Grade>().unwrap(), Grade::Easy);
        assert!("5".parse::<Grade>().is_err());
        assert!("perfect".parse::<Grade>().is_err());
    }

    #[test]
    fn test_grade_correctness() {
        assert!(!Grade::Again.is_correct());
        assert!(!Grade::Hard.is_correct());
        assert!(Grade::Good.is_correct());
        assert!(Grade::Easy.is_correct());
    }

    #[test]
    fn test_grade_serde_lowercase() {
        let json = serde_json::to_string(&Grade::Hard).unwrap();
        assert_eq!(json, "\"hard\"");
        let back: Grade = serde_json::from_str("\"easy\"").unwrap();
        assert_eq!(back, Grade::Easy);
    }
}

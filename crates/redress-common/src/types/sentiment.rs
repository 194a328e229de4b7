//! Sentiment - keyword-derived classification of grievance text
//!
//! A deterministic match over two fixed keyword sets. The negative set
//! takes priority when both match; text matching neither is neutral.

use serde::{Deserialize, Serialize};

const NEGATIVE_KEYWORDS: [&str; 9] = [
    "fail",
    "bad",
    "unstable",
    "delay",
    "poor",
    "leak",
    "problem",
    "confusing",
    "slow",
];

const POSITIVE_KEYWORDS: [&str; 6] = [
    "good",
    "great",
    "resolved",
    "helpful",
    "excellent",
    "support",
];

/// Classification of a grievance title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Classify free text by keyword match, negative keywords winning
    pub fn classify(text: &str) -> Self {
        let lowered = text.to_lowercase();
        if NEGATIVE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return Sentiment::Negative;
        }
        if POSITIVE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return Sentiment::Positive;
        }
        Sentiment::Neutral
    }

    /// Label matching the relational store's enum values
    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }

    /// Parse a label back into a sentiment
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Positive" => Some(Sentiment::Positive),
            "Negative" => Some(Sentiment::Negative),
            "Neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_keyword() {
        assert_eq!(
            Sentiment::classify("Hostel water leak problem"),
            Sentiment::Negative
        );
    }

    #[test]
    fn test_positive_keyword() {
        assert_eq!(
            Sentiment::classify("Great support from faculty"),
            Sentiment::Positive
        );
    }

    #[test]
    fn test_neutral_default() {
        assert_eq!(Sentiment::classify("Timetable clash"), Sentiment::Neutral);
    }

    #[test]
    fn test_negative_wins_over_positive() {
        // "good" and "delay" both present
        assert_eq!(
            Sentiment::classify("Good course but constant delay in results"),
            Sentiment::Negative
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(Sentiment::classify("SLOW wifi everywhere"), Sentiment::Negative);
    }
}

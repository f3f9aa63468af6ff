use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Difficulty band consumed by the question generator. Derived from a skill
/// score, never from the raw score directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Band thresholds: score < 40 easy, < 75 medium, else hard.
    pub fn band_for(score: i32) -> Self {
        if score < 40 {
            Difficulty::Easy
        } else if score < 75 {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// One sub-question of a multi-part stem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPart {
    pub prompt: String,
    pub options: [String; 4],
    pub correct_answer: String,
    pub explanation: String,
}

/// Question payload as produced by the generator. Either a plain four-option
/// question or a shared stem with a sequence of parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Question {
    Single {
        stem: String,
        options: [String; 4],
        correct_answer: String,
        explanation: String,
    },
    MultiPart {
        stem: String,
        parts: Vec<QuestionPart>,
    },
}

impl Question {
    pub fn stem(&self) -> &str {
        match self {
            Question::Single { stem, .. } => stem,
            Question::MultiPart { stem, .. } => stem,
        }
    }

    /// Stable content hash used as the dedup key in the seen-question set.
    /// Multi-part questions hash the stem together with every part prompt so
    /// two questions sharing a stem but differing in parts stay distinct.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            Question::Single { stem, .. } => hasher.update(stem.as_bytes()),
            Question::MultiPart { stem, parts } => {
                hasher.update(stem.as_bytes());
                for part in parts {
                    hasher.update(b"\x1f");
                    hasher.update(part.prompt.as_bytes());
                }
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Grade a submitted answer. Multi-part answers are pipe-separated, one
    /// segment per part, in part order.
    pub fn check_answer(&self, answer: &str) -> bool {
        match self {
            Question::Single { correct_answer, .. } => answer.trim() == correct_answer.trim(),
            Question::MultiPart { parts, .. } => {
                let given: Vec<&str> = answer.split('|').map(str::trim).collect();
                given.len() == parts.len()
                    && given
                        .iter()
                        .zip(parts)
                        .all(|(g, p)| *g == p.correct_answer.trim())
            }
        }
    }

    pub fn explanation_text(&self) -> String {
        match self {
            Question::Single { explanation, .. } => explanation.clone(),
            Question::MultiPart { parts, .. } => parts
                .iter()
                .map(|p| p.explanation.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Difficulty, Question, QuestionPart};

pub const SOLO_DEFAULT_LENGTH: usize = 10;
pub const SOLO_MAX_LENGTH: usize = 20;

/// Solo practice session, cached in Redis under a TTL. Completing it is what
/// feeds the skill model; duels never do. Completion deletes the cache entry,
/// so existence doubles as the liveness flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoloSession {
    pub id: String,
    pub user_id: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub questions: Vec<Question>,
    pub answered_count: u32,
    pub correct_count: u32,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSoloRequest {
    pub user_id: String,
    pub topic: String,
    pub question_count: Option<usize>,
}

/// Question as rendered to the solo player: correct answers withheld, grading
/// stays server-side.
#[derive(Debug, Serialize)]
pub struct SoloQuestionView {
    pub index: u32,
    pub stem: String,
    pub options: Option<[String; 4]>,
    pub parts: Option<Vec<SoloPartView>>,
}

#[derive(Debug, Serialize)]
pub struct SoloPartView {
    pub prompt: String,
    pub options: [String; 4],
}

impl SoloQuestionView {
    pub fn from_question(index: u32, question: &Question) -> Self {
        match question {
            Question::Single { stem, options, .. } => Self {
                index,
                stem: stem.clone(),
                options: Some(options.clone()),
                parts: None,
            },
            Question::MultiPart { stem, parts } => Self {
                index,
                stem: stem.clone(),
                options: None,
                parts: Some(parts.iter().map(SoloPartView::from_part).collect()),
            },
        }
    }
}

impl SoloPartView {
    fn from_part(part: &QuestionPart) -> Self {
        Self {
            prompt: part.prompt.clone(),
            options: part.options.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateSoloResponse {
    pub session_id: String,
    pub difficulty: Difficulty,
    pub question_count: usize,
    pub question: SoloQuestionView,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitSoloAnswerRequest {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitSoloAnswerResponse {
    pub correct: bool,
    pub explanation: String,
    pub answered_count: u32,
    pub correct_count: u32,
    pub next_question: Option<SoloQuestionView>,
}

#[derive(Debug, Serialize)]
pub struct CompleteSoloResponse {
    pub correct_count: u32,
    pub answered_count: u32,
    pub accuracy_percent: f64,
    pub skill_score: i32,
}

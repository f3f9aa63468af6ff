use chrono::{DateTime, Duration, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use crate::models::Question;
use crate::utils::time::bson_to_chrono;

/// Fixed number of question slots per duel.
pub const DUEL_LENGTH: i32 = 10;

/// Unaccepted challenges older than this are treated as expired at read time.
pub const CHALLENGE_TTL_SECONDS: i64 = 60;

/// An active duel whose last action is older than this no longer counts as
/// "genuinely active" for presence purposes.
pub const ACTIVITY_STALENESS_SECONDS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelStatus {
    Pending,
    Active,
    PlayerAWin,
    PlayerBWin,
    Draw,
    Expired,
}

impl DuelStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DuelStatus::PlayerAWin | DuelStatus::PlayerBWin | DuelStatus::Draw | DuelStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DuelStatus::Pending => "pending",
            DuelStatus::Active => "active",
            DuelStatus::PlayerAWin => "player_a_win",
            DuelStatus::PlayerBWin => "player_b_win",
            DuelStatus::Draw => "draw",
            DuelStatus::Expired => "expired",
        }
    }
}

/// Terminal status after the last index is claimed. No sudden death: equal
/// scores are a draw.
pub fn terminal_status_for(score_a: i32, score_b: i32) -> DuelStatus {
    match score_a.cmp(&score_b) {
        std::cmp::Ordering::Greater => DuelStatus::PlayerAWin,
        std::cmp::Ordering::Less => DuelStatus::PlayerBWin,
        std::cmp::Ordering::Equal => DuelStatus::Draw,
    }
}

/// Persisted duel row. Participant A is the challenger, B the challenged
/// opponent. Mutated only through the lifecycle operations; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Duel {
    #[serde(rename = "_id")]
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub topic: String,
    pub status: DuelStatus,
    pub score_a: i32,
    pub score_b: i32,
    pub current_index: i32,
    pub created_at: BsonDateTime,
    pub last_action_at: BsonDateTime,
    pub finished_at: Option<BsonDateTime>,
}

impl Duel {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// Status as observed at `now`: a pending challenge past its TTL reads as
    /// expired without requiring a write.
    pub fn effective_status(&self, now: DateTime<Utc>) -> DuelStatus {
        if self.status == DuelStatus::Pending
            && bson_to_chrono(self.created_at) + Duration::seconds(CHALLENGE_TTL_SECONDS) < now
        {
            return DuelStatus::Expired;
        }
        self.status
    }
}

/// One question slot. `answered_by` transitions from null to a participant id
/// at most once; that conditional write is what arbitrates submission races.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelQuestion {
    #[serde(rename = "_id")]
    pub id: String,
    pub duel_id: String,
    pub index: i32,
    pub question: Question,
    pub answered_by: Option<String>,
    pub is_correct: Option<bool>,
    pub answered_at: Option<BsonDateTime>,
}

impl DuelQuestion {
    /// Deterministic row id: duplicate provisioning attempts collide on it
    /// instead of inserting a second row for the same slot.
    pub fn row_id(duel_id: &str, index: i32) -> String {
        format!("{}:{}", duel_id, index)
    }
}

// ---- API payloads ----

#[derive(Debug, Deserialize)]
pub struct CreateChallengeRequest {
    pub challenger_id: String,
    pub opponent_id: String,
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct CreateChallengeResponse {
    pub duel_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PendingChallengeQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct PendingChallengeView {
    pub duel_id: String,
    pub challenger_id: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PendingChallengeResponse {
    pub challenge: Option<PendingChallengeView>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitDuelAnswerRequest {
    pub participant_id: String,
    /// Index of the question the client is answering, as rendered from its
    /// last poll. A submission for an already-claimed index reports race-lost.
    pub question_index: i32,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Claimed,
    RaceLost,
}

#[derive(Debug, Serialize)]
pub struct SubmitDuelAnswerResponse {
    pub result: AnswerOutcome,
    pub answered_by: Option<String>,
    pub is_correct: Option<bool>,
    pub status: DuelStatus,
    pub score_a: i32,
    pub score_b: i32,
    pub current_index: i32,
}

#[derive(Debug, Serialize)]
pub struct DuelView {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub topic: String,
    pub status: DuelStatus,
    pub score_a: i32,
    pub score_b: i32,
    pub current_index: i32,
    pub created_at: DateTime<Utc>,
    pub last_action_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DuelView {
    pub fn from_row(duel: &Duel, status: DuelStatus) -> Self {
        Self {
            id: duel.id.clone(),
            participant_a: duel.participant_a.clone(),
            participant_b: duel.participant_b.clone(),
            topic: duel.topic.clone(),
            status,
            score_a: duel.score_a,
            score_b: duel.score_b,
            current_index: duel.current_index,
            created_at: bson_to_chrono(duel.created_at),
            last_action_at: bson_to_chrono(duel.last_action_at),
            finished_at: duel.finished_at.map(bson_to_chrono),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DuelQuestionView {
    pub index: i32,
    pub question: Question,
    pub answered_by: Option<String>,
    pub is_correct: Option<bool>,
}

impl DuelQuestionView {
    pub fn from_row(row: &DuelQuestion) -> Self {
        Self {
            index: row.index,
            question: row.question.clone(),
            answered_by: row.answered_by.clone(),
            is_correct: row.is_correct,
        }
    }
}

/// What the polling client should do next, derived server-side from the same
/// projection the client sees. Keeps every client on one contract instead of
/// each reimplementing the state diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PollDirective {
    /// Terminal state: fetch the summary once, stop polling.
    RenderSummary,
    /// Challenge not yet accepted, challenger side: keep polling at a short
    /// interval.
    AwaitAccept { poll_after_ms: u64 },
    /// Challenge not yet accepted, challenged side: the invitation is on
    /// screen, accept locally instead of polling.
    PromptAccept,
    /// Active but the current question row is not written yet. One bounded
    /// re-check, not a tight loop.
    Preparing { poll_after_ms: u64 },
    /// Unanswered question on screen: accept local input.
    Answer,
    /// Current question already claimed: show the reveal, poll until the
    /// index advances or the duel finalizes.
    Reveal { poll_after_ms: u64 },
}

impl PollDirective {
    /// `question_answered` is None while the question row for the current
    /// index is absent from the store. `viewer_is_opponent` distinguishes the
    /// challenged side, which acts on a pending duel instead of polling it;
    /// anonymous viewers get the challenger-side directive.
    pub fn for_state(
        status: DuelStatus,
        question_answered: Option<bool>,
        viewer_is_opponent: bool,
    ) -> Self {
        if status.is_terminal() {
            return PollDirective::RenderSummary;
        }
        match status {
            DuelStatus::Pending if viewer_is_opponent => PollDirective::PromptAccept,
            DuelStatus::Pending => PollDirective::AwaitAccept {
                poll_after_ms: 2000,
            },
            _ => match question_answered {
                None => PollDirective::Preparing { poll_after_ms: 500 },
                Some(false) => PollDirective::Answer,
                Some(true) => PollDirective::Reveal {
                    poll_after_ms: 2000,
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DuelStateView {
    pub duel: DuelView,
    pub question: Option<DuelQuestionView>,
    pub next: PollDirective,
}

#[derive(Debug, Serialize)]
pub struct DuelSummaryView {
    pub duel: DuelView,
    pub questions: Vec<DuelQuestionView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::chrono_to_bson;

    fn duel_created_at(status: DuelStatus, created: DateTime<Utc>) -> Duel {
        Duel {
            id: "d1".to_string(),
            participant_a: "alice".to_string(),
            participant_b: "bob".to_string(),
            topic: "Algebra Basics".to_string(),
            status,
            score_a: 0,
            score_b: 0,
            current_index: 0,
            created_at: chrono_to_bson(created),
            last_action_at: chrono_to_bson(created),
            finished_at: None,
        }
    }

    #[test]
    fn winner_determination() {
        assert_eq!(terminal_status_for(6, 4), DuelStatus::PlayerAWin);
        assert_eq!(terminal_status_for(4, 6), DuelStatus::PlayerBWin);
        assert_eq!(terminal_status_for(5, 5), DuelStatus::Draw);
        assert_eq!(terminal_status_for(0, 0), DuelStatus::Draw);
    }

    #[test]
    fn pending_soft_expires_after_ttl() {
        let now = Utc::now();
        let fresh = duel_created_at(DuelStatus::Pending, now - Duration::seconds(30));
        let stale = duel_created_at(DuelStatus::Pending, now - Duration::seconds(120));
        assert_eq!(fresh.effective_status(now), DuelStatus::Pending);
        assert_eq!(stale.effective_status(now), DuelStatus::Expired);
    }

    #[test]
    fn active_never_soft_expires() {
        let now = Utc::now();
        let old = duel_created_at(DuelStatus::Active, now - Duration::hours(3));
        assert_eq!(old.effective_status(now), DuelStatus::Active);
    }

    #[test]
    fn terminal_status_is_sticky() {
        let now = Utc::now();
        let done = duel_created_at(DuelStatus::PlayerBWin, now - Duration::hours(3));
        assert_eq!(done.effective_status(now), DuelStatus::PlayerBWin);
    }

    #[test]
    fn poll_directive_mapping() {
        assert_eq!(
            PollDirective::for_state(DuelStatus::Draw, None, false),
            PollDirective::RenderSummary
        );
        assert_eq!(
            PollDirective::for_state(DuelStatus::Expired, Some(false), true),
            PollDirective::RenderSummary
        );
        assert_eq!(
            PollDirective::for_state(DuelStatus::Active, None, false),
            PollDirective::Preparing { poll_after_ms: 500 }
        );
        assert_eq!(
            PollDirective::for_state(DuelStatus::Active, Some(false), true),
            PollDirective::Answer
        );
        assert_eq!(
            PollDirective::for_state(DuelStatus::Active, Some(true), false),
            PollDirective::Reveal {
                poll_after_ms: 2000
            }
        );
    }

    #[test]
    fn pending_directive_depends_on_the_viewer() {
        // The challenger waits; the challenged side is told to accept.
        assert_eq!(
            PollDirective::for_state(DuelStatus::Pending, None, false),
            PollDirective::AwaitAccept {
                poll_after_ms: 2000
            }
        );
        assert_eq!(
            PollDirective::for_state(DuelStatus::Pending, None, true),
            PollDirective::PromptAccept
        );
    }
}

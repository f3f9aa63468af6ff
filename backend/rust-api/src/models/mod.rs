pub mod duel;
pub mod presence;
pub mod question;
pub mod seen;
pub mod skill;
pub mod solo;

pub use duel::{
    terminal_status_for, AnswerOutcome, CreateChallengeRequest, CreateChallengeResponse, Duel,
    DuelQuestion, DuelQuestionView, DuelStateView, DuelStatus, DuelSummaryView, DuelView,
    PendingChallengeResponse, PendingChallengeView, PollDirective, SubmitDuelAnswerRequest,
    SubmitDuelAnswerResponse, ACTIVITY_STALENESS_SECONDS, CHALLENGE_TTL_SECONDS, DUEL_LENGTH,
};
pub use question::{Difficulty, Question, QuestionPart};
pub use seen::SeenQuestion;
pub use skill::{next_score, SkillRecord, SkillResponse, SKILL_DEFAULT, SKILL_MAX, SKILL_MIN};
pub use solo::{SoloQuestionView, SoloSession};

use anyhow::Context;
use chrono::Utc;
use mongodb::Database;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics::SOLO_SESSIONS_TOTAL;
use crate::models::solo::{
    CompleteSoloResponse, CreateSoloResponse, SubmitSoloAnswerResponse, SOLO_DEFAULT_LENGTH,
    SOLO_MAX_LENGTH,
};
use crate::models::{Difficulty, SoloQuestionView, SoloSession};
use crate::services::question_provider::QuestionProvider;
use crate::services::seen_filter::SeenFilter;
use crate::services::skill_service::SkillService;

const SESSION_TTL_SECONDS: i64 = 3600;

fn session_key(session_id: &str) -> String {
    format!("solo:{}", session_id)
}

/// Solo practice sessions: the one flow that feeds the skill model. Session
/// state lives in Redis under a TTL; only the skill update and the seen-set
/// rows persist.
pub struct SoloService {
    mongo: Database,
    redis: ConnectionManager,
    provider: Arc<dyn QuestionProvider>,
}

impl SoloService {
    pub fn new(mongo: Database, redis: ConnectionManager, provider: Arc<dyn QuestionProvider>) -> Self {
        Self {
            mongo,
            redis,
            provider,
        }
    }

    pub async fn create_session(
        &self,
        user_id: &str,
        topic: &str,
        question_count: Option<usize>,
    ) -> Result<CreateSoloResponse, ApiError> {
        let count = question_count
            .unwrap_or(SOLO_DEFAULT_LENGTH)
            .clamp(1, SOLO_MAX_LENGTH);

        let skill = SkillService::new(self.mongo.clone());
        let band = Difficulty::band_for(skill.get_skill(user_id, topic).await?);

        let seen = SeenFilter::new(self.mongo.clone());
        let mut questions = Vec::with_capacity(count);
        for _ in 0..count {
            questions.push(
                seen.provision_unseen(self.provider.as_ref(), user_id, topic, band)
                    .await?,
            );
        }

        let now = Utc::now();
        let session = SoloSession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            topic: topic.to_string(),
            difficulty: band,
            questions,
            answered_count: 0,
            correct_count: 0,
            started_at: now,
            expires_at: now + chrono::Duration::seconds(SESSION_TTL_SECONDS),
        };
        self.save_session(&session).await?;

        SOLO_SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        tracing::info!(
            "Solo session created: {} for {} on {} at band {}",
            session.id,
            user_id,
            topic,
            band.as_str()
        );

        Ok(CreateSoloResponse {
            session_id: session.id.clone(),
            difficulty: band,
            question_count: session.questions.len(),
            question: SoloQuestionView::from_question(0, &session.questions[0]),
            expires_at: session.expires_at,
        })
    }

    pub async fn submit_answer(
        &self,
        session_id: &str,
        answer: &str,
    ) -> Result<SubmitSoloAnswerResponse, ApiError> {
        let mut session = self.get_session(session_id).await?;

        let index = session.answered_count as usize;
        let question = session
            .questions
            .get(index)
            .ok_or_else(|| ApiError::conflict("all questions already answered"))?
            .clone();

        let correct = question.check_answer(answer);
        session.answered_count += 1;
        if correct {
            session.correct_count += 1;
        }
        self.save_session(&session).await?;

        let next_index = session.answered_count as usize;
        Ok(SubmitSoloAnswerResponse {
            correct,
            explanation: question.explanation_text(),
            answered_count: session.answered_count,
            correct_count: session.correct_count,
            next_question: session
                .questions
                .get(next_index)
                .map(|q| SoloQuestionView::from_question(next_index as u32, q)),
        })
    }

    /// Finish the session and fold its accuracy into the skill score. An
    /// abandoned session with zero answers leaves the score unchanged.
    pub async fn complete_session(&self, session_id: &str) -> Result<CompleteSoloResponse, ApiError> {
        let session = self.get_session(session_id).await?;

        let skill = SkillService::new(self.mongo.clone());
        let new_score = skill
            .update_skill(
                &session.user_id,
                &session.topic,
                session.correct_count,
                session.answered_count,
            )
            .await?;

        let mut conn = self.redis.clone();
        redis::cmd("DEL")
            .arg(session_key(session_id))
            .query_async::<()>(&mut conn)
            .await?;

        SOLO_SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
        tracing::info!("Solo session completed: {}", session_id);

        let accuracy = if session.answered_count == 0 {
            0.0
        } else {
            100.0 * f64::from(session.correct_count) / f64::from(session.answered_count)
        };
        Ok(CompleteSoloResponse {
            correct_count: session.correct_count,
            answered_count: session.answered_count,
            accuracy_percent: accuracy,
            skill_score: new_score,
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<SoloSession, ApiError> {
        let mut conn = self.redis.clone();
        let json: Option<String> = redis::cmd("GET")
            .arg(session_key(session_id))
            .query_async(&mut conn)
            .await?;
        let json = json.ok_or_else(|| ApiError::not_found("solo session not found"))?;
        let session: SoloSession =
            serde_json::from_str(&json).context("Failed to deserialize solo session")?;
        Ok(session)
    }

    async fn save_session(&self, session: &SoloSession) -> Result<(), ApiError> {
        let mut conn = self.redis.clone();
        let json = serde_json::to_string(session).context("Failed to serialize solo session")?;
        redis::cmd("SETEX")
            .arg(session_key(&session.id))
            .arg(SESSION_TTL_SECONDS)
            .arg(json)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }
}
